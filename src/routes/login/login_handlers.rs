use actix_web::cookie::{time, Cookie};
use actix_web::{web, HttpResponse};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use log::{error, info};
use sqlx::MySqlPool;
use uuid::Uuid;

use super::login_models::{ChangePasswordRequest, LoginRequest, LoginResponse, MeResponse};
use crate::auth::{AuthUser, SESSION_COOKIE};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::admin::Admin;
use crate::models::client::{Client, CLIENT_SELECT};
use crate::models::employee::{Employee, EMPLOYEE_SELECT};
use crate::models::session::Session;
use crate::models::user::{Role, User, UserSummary};
use crate::routes::responses::{DataResponse, MessageResponse};
use crate::routes::validation;

/// Session cookie; remembered logins outlive the browser session.
pub fn session_cookie(session: &Session, remember_days: i64) -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, session.session_id.clone())
        .path("/")
        .http_only(true)
        .finish();
    if session.is_persistent {
        cookie.set_max_age(time::Duration::days(remember_days));
    }
    cookie
}

// login logic
pub async fn login(
    pool: web::Data<MySqlPool>,
    config: web::Data<AppConfig>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let email = validation::email(&req.email)?;
    info!("Received login request for user: {}", email);

    // 1. Get the user with this email
    let user: Option<User> = sqlx::query_as(
        "SELECT user_id, user_email, password_hash, full_name, role, is_active, created_at, updated_at
         FROM Users_ WHERE user_email = ?",
    )
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await?;

    let user = match user {
        Some(user) => user,
        None => {
            info!("Invalid email: {}", email);
            return Err(AppError::unauthorized("Invalid email or password"));
        }
    };

    // 2. Validate the password against the stored hash
    let valid = verify(&req.password, &user.password_hash).unwrap_or_else(|e| {
        error!("Error when checking password for user {}: {}", email, e);
        false
    });
    if !valid {
        info!("Invalid password for user: {}", email);
        return Err(AppError::unauthorized("Invalid email or password"));
    }
    if !user.is_active {
        info!("Deactivated user tried to log in: {}", email);
        return Err(AppError::forbidden("Account is deactivated"));
    }

    // 3. Drop this user's expired sessions and open a new one
    let now = Utc::now().naive_utc();
    sqlx::query("DELETE FROM Sessions_ WHERE user_id = ? AND expires_at <= ?")
        .bind(user.user_id)
        .bind(now)
        .execute(pool.get_ref())
        .await?;

    let session = Session {
        session_id: Uuid::new_v4().to_string(),
        user_id: user.user_id,
        expires_at: if req.remember_me {
            now + Duration::days(config.remember_days)
        } else {
            now + Duration::minutes(config.session_minutes)
        },
        is_persistent: req.remember_me,
        created_at: now,
    };

    sqlx::query(
        "INSERT INTO Sessions_ (session_id, user_id, expires_at, is_persistent, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&session.session_id)
    .bind(session.user_id)
    .bind(session.expires_at)
    .bind(session.is_persistent)
    .bind(session.created_at)
    .execute(pool.get_ref())
    .await?;

    // 4. Return the token in the body and as a cookie
    info!("User {} logged in successfully", email);
    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&session, config.remember_days))
        .json(LoginResponse {
            success: true,
            message: "Login successful".into(),
            token: session.session_id,
            expires_at: session.expires_at,
            user: UserSummary {
                user_id: user.user_id,
                full_name: user.full_name,
                user_email: user.user_email,
                role: user.role,
            },
        }))
}

pub async fn logout(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
) -> Result<HttpResponse, AppError> {
    info!("Received logout request for user {}", user.user_id);

    sqlx::query("DELETE FROM Sessions_ WHERE session_id = ?")
        .bind(&user.session_id)
        .execute(pool.get_ref())
        .await?;

    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();

    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(MessageResponse::new("Logout successful")))
}

pub async fn me(pool: web::Data<MySqlPool>, user: AuthUser) -> Result<HttpResponse, AppError> {
    let summary = UserSummary {
        user_id: user.user_id,
        full_name: user.full_name.clone(),
        user_email: user.user_email.clone(),
        role: user.role.to_string(),
    };
    let mut me = MeResponse {
        user: summary,
        admin: None,
        employee: None,
        client: None,
    };

    match user.role {
        Role::Admin => {
            me.admin = sqlx::query_as::<_, Admin>(
                "SELECT admin_id, user_id, title FROM Admins_ WHERE user_id = ?",
            )
            .bind(user.user_id)
            .fetch_optional(pool.get_ref())
            .await?;
        }
        Role::Employee => {
            me.employee = sqlx::query_as::<_, Employee>(&format!("{EMPLOYEE_SELECT} WHERE e.user_id = ?"))
                .bind(user.user_id)
                .fetch_optional(pool.get_ref())
                .await?;
        }
        Role::Client => {
            me.client = sqlx::query_as::<_, Client>(&format!("{CLIENT_SELECT} WHERE c.user_id = ?"))
                .bind(user.user_id)
                .fetch_optional(pool.get_ref())
                .await?;
        }
    }

    Ok(HttpResponse::Ok().json(DataResponse::new(me)))
}

pub async fn change_password(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
    req: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, AppError> {
    validation::password(&req.new_password)?;

    let (current_hash,): (String,) =
        sqlx::query_as("SELECT password_hash FROM Users_ WHERE user_id = ?")
            .bind(user.user_id)
            .fetch_one(pool.get_ref())
            .await?;

    if !verify(&req.current_password, &current_hash).unwrap_or(false) {
        return Err(AppError::validation("Current password is incorrect"));
    }

    let new_hash = hash(&req.new_password, DEFAULT_COST)?;
    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE Users_ SET password_hash = ?, updated_at = ? WHERE user_id = ?")
        .bind(&new_hash)
        .bind(Utc::now().naive_utc())
        .bind(user.user_id)
        .execute(&mut *tx)
        .await?;
    // Other devices have to log in again.
    sqlx::query("DELETE FROM Sessions_ WHERE user_id = ? AND session_id <> ?")
        .bind(user.user_id)
        .bind(&user.session_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("User {} changed their password", user.user_id);
    Ok(HttpResponse::Ok().json(MessageResponse::new("Password updated")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn session(is_persistent: bool) -> Session {
        let now: NaiveDateTime = Utc::now().naive_utc();
        Session {
            session_id: "abc-123".into(),
            user_id: 7,
            expires_at: now,
            is_persistent,
            created_at: now,
        }
    }

    #[test]
    fn remembered_login_cookie_lasts_the_session_lifetime() {
        let cookie = session_cookie(&session(true), 10);
        assert_eq!(cookie.value(), "abc-123");
        assert_eq!(cookie.max_age(), Some(time::Duration::days(10)));
        assert_eq!(cookie.http_only(), Some(true));
    }

    #[test]
    fn plain_login_cookie_ends_with_the_browser() {
        let cookie = session_cookie(&session(false), 10);
        assert_eq!(cookie.max_age(), None);
        assert_eq!(cookie.path(), Some("/"));
    }
}
