use actix_web::{web, HttpResponse};
use bcrypt::{hash, DEFAULT_COST};
use chrono::Utc;
use log::info;
use serde_json::json;
use sqlx::{MySql, MySqlPool, QueryBuilder};

use super::clients_models::{ClientDetail, CreateClientRequest, UpdateClientRequest};
use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::db;
use crate::error::AppError;
use crate::models::client::{Client, CLIENT_SELECT};
use crate::models::project::{ProjectListItem, PROJECT_LIST_SELECT};
use crate::models::user::Role;
use crate::routes::responses::{DataResponse, MessageResponse};
use crate::services::ids::CLIENT_IDS;
use crate::services::notifications::{EventKind, NotificationHub, Room};
use crate::services::pagination::{ListQuery, Paginated};

fn push_filters(builder: &mut QueryBuilder<'_, MySql>, query: &ListQuery) -> Result<(), AppError> {
    match query.status_filter() {
        Some("inactive") => builder.push(" WHERE c.is_active = false"),
        Some("active") | None => builder.push(" WHERE c.is_active = true"),
        Some(other) => {
            return Err(AppError::validation(format!(
                "Status '{other}' is not valid, use active or inactive"
            )))
        }
    };
    if let Some(pattern) = query.search_pattern() {
        builder.push(" AND (u.full_name LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR u.user_email LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR c.company_name LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR c.client_code LIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    Ok(())
}

pub async fn fetch_client(pool: &MySqlPool, client_id: i64) -> Result<Client, AppError> {
    sqlx::query_as::<_, Client>(&format!("{CLIENT_SELECT} WHERE c.client_id = ?"))
        .bind(client_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Client {client_id} not found")))
}

// Handler to list clients
pub async fn list_clients(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let pagination = query.pagination();

    let mut count =
        QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM Clients_ c JOIN Users_ u ON c.user_id = u.user_id");
    push_filters(&mut count, &query)?;
    let total: i64 = count.build_query_scalar().fetch_one(pool.get_ref()).await?;

    let mut rows = QueryBuilder::<MySql>::new(CLIENT_SELECT);
    push_filters(&mut rows, &query)?;
    rows.push(" ORDER BY c.client_code LIMIT ");
    rows.push_bind(pagination.limit());
    rows.push(" OFFSET ");
    rows.push_bind(pagination.offset());
    let clients: Vec<Client> = rows.build_query_as().fetch_all(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(Paginated::new(clients, total, pagination)))
}

// Handler to get one client with their projects
pub async fn get_client(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let client_id = path.into_inner();
    let client = fetch_client(pool.get_ref(), client_id).await?;

    let projects: Vec<ProjectListItem> = sqlx::query_as(&format!(
        "{PROJECT_LIST_SELECT} WHERE p.client_id = ? AND p.is_active = true ORDER BY p.created_at DESC"
    ))
    .bind(client_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(DataResponse::new(ClientDetail { client, projects })))
}

// Handler to add a client together with their login
pub async fn create_client(
    pool: web::Data<MySqlPool>,
    config: web::Data<AppConfig>,
    hub: web::Data<NotificationHub>,
    user: AuthUser,
    request: web::Json<CreateClientRequest>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let new = request.validate()?;
    info!("Received request to create client: {}", new.company_name);

    let password_hash = hash(&request.password, DEFAULT_COST)?;
    let now = Utc::now().naive_utc();

    let mut tx = pool.begin().await?;
    let user_id =
        db::insert_user(&mut tx, &new.email, &password_hash, &new.full_name, Role::Client, now).await?;
    let (code, client_id) = CLIENT_IDS
        .insert_with_code(
            &mut tx,
            config.id_retry_attempts,
            "INSERT INTO Clients_ (client_code, user_id, company_name, phone, industry, address,
                                   is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, true, ?, ?)",
            |q| {
                q.bind(user_id)
                    .bind(new.company_name.clone())
                    .bind(new.phone.clone())
                    .bind(new.industry.clone())
                    .bind(new.address.clone())
                    .bind(now)
                    .bind(now)
            },
        )
        .await?;
    tx.commit().await?;
    info!("Client {} created with code {}", new.company_name, code);

    let client = fetch_client(pool.get_ref(), client_id).await?;
    hub.notify(
        pool.get_ref(),
        &[Room::Admin],
        EventKind::ClientCreated,
        &format!("New client {} ({})", client.company_name, code),
        json!({ "client_id": client_id, "client_code": code }),
    )
    .await;

    Ok(HttpResponse::Created().json(MessageResponse::with_data("Client created", &client)))
}

// Handler to update a client
pub async fn update_client(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
    path: web::Path<i64>,
    request: web::Json<UpdateClientRequest>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let client_id = path.into_inner();
    let existing = fetch_client(pool.get_ref(), client_id).await?;
    if !existing.is_active {
        return Err(AppError::not_found(format!("Client {client_id} not found")));
    }
    let client = request.apply(existing)?;
    let now = Utc::now().naive_utc();

    let mut tx = pool.begin().await?;
    db::update_user_identity(&mut tx, client.user_id, &client.user_email, &client.full_name, now).await?;
    sqlx::query(
        "UPDATE Clients_ SET company_name = ?, phone = ?, industry = ?, address = ?, updated_at = ?
         WHERE client_id = ?",
    )
    .bind(&client.company_name)
    .bind(&client.phone)
    .bind(&client.industry)
    .bind(&client.address)
    .bind(now)
    .bind(client_id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!("Client {} updated", client.client_code);
    let client = fetch_client(pool.get_ref(), client_id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::with_data("Client updated", &client)))
}

// Handler to soft-delete a client
pub async fn delete_client(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let client_id = path.into_inner();
    let client = fetch_client(pool.get_ref(), client_id).await?;
    if !client.is_active {
        return Err(AppError::not_found(format!("Client {client_id} not found")));
    }

    let now = Utc::now().naive_utc();
    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE Clients_ SET is_active = false, updated_at = ? WHERE client_id = ?")
        .bind(now)
        .bind(client_id)
        .execute(&mut *tx)
        .await?;
    db::deactivate_user(&mut tx, client.user_id, now).await?;
    tx.commit().await?;

    info!("Client {} deactivated", client.client_code);
    Ok(HttpResponse::Ok().json(MessageResponse::new("Client deactivated")))
}
