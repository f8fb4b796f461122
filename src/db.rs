use bcrypt::{hash, DEFAULT_COST};
use chrono::{NaiveDateTime, Utc};
use log::info;
use sqlx::mysql::{MySqlConnection, MySqlPoolOptions};
use sqlx::MySqlPool;

use crate::config::{AdminSeed, AppConfig};
use crate::error::AppError;
use crate::models::user::Role;
use crate::services::ids::is_unique_violation;

pub async fn create_pool(config: &AppConfig) -> Result<MySqlPool, sqlx::Error> {
    MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
}

pub async fn run_migrations(pool: &MySqlPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Creates the configured admin account unless an admin already exists.
pub async fn seed_admin(pool: &MySqlPool, seed: &AdminSeed) -> Result<(), AppError> {
    let (admins,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM Admins_")
        .fetch_one(pool)
        .await?;
    if admins > 0 {
        return Ok(());
    }

    let email = crate::routes::validation::email(&seed.email)?;
    crate::routes::validation::password(&seed.password)?;
    let password_hash = hash(&seed.password, DEFAULT_COST)?;
    let now = Utc::now().naive_utc();

    let mut tx = pool.begin().await?;
    let user_id = insert_user(&mut tx, &email, &password_hash, &seed.full_name, Role::Admin, now).await?;
    sqlx::query("INSERT INTO Admins_ (user_id, title) VALUES (?, 'Administrator')")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Seeded admin account {}", email);
    Ok(())
}

/// Inserts a login account; a taken email is a 409.
pub async fn insert_user(
    conn: &mut MySqlConnection,
    email: &str,
    password_hash: &str,
    full_name: &str,
    role: Role,
    now: NaiveDateTime,
) -> Result<i64, AppError> {
    let result = sqlx::query(
        "INSERT INTO Users_ (user_email, password_hash, full_name, role, is_active, created_at, updated_at)
         VALUES (?, ?, ?, ?, true, ?, ?)",
    )
    .bind(email)
    .bind(password_hash)
    .bind(full_name)
    .bind(role.as_str())
    .bind(now)
    .bind(now)
    .execute(conn)
    .await
    .map_err(|e| email_conflict(e, email))?;
    Ok(result.last_insert_id() as i64)
}

pub async fn update_user_identity(
    conn: &mut MySqlConnection,
    user_id: i64,
    email: &str,
    full_name: &str,
    now: NaiveDateTime,
) -> Result<(), AppError> {
    sqlx::query("UPDATE Users_ SET user_email = ?, full_name = ?, updated_at = ? WHERE user_id = ?")
        .bind(email)
        .bind(full_name)
        .bind(now)
        .bind(user_id)
        .execute(conn)
        .await
        .map_err(|e| email_conflict(e, email))?;
    Ok(())
}

/// Deactivates the account and ends all of its sessions.
pub async fn deactivate_user(
    conn: &mut MySqlConnection,
    user_id: i64,
    now: NaiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE Users_ SET is_active = false, updated_at = ? WHERE user_id = ?")
        .bind(now)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM Sessions_ WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

fn email_conflict(error: sqlx::Error, email: &str) -> AppError {
    if is_unique_violation(&error) {
        AppError::conflict(format!("Email {email} is already registered"))
    } else {
        error.into()
    }
}
