use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use serde_json::json;
use sqlx::{MySql, MySqlPool, QueryBuilder};

use super::client_portal_models::{
    average_progress, ClientDashboard, FeedbackRequest, DASHBOARD_MEETINGS, RECENT_FEEDBACK,
    UPCOMING_MEETINGS,
};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::feedback::{Feedback, FEEDBACK_SELECT};
use crate::models::project::{Project, ProjectListItem, ProjectStatus, PROJECT_LIST_SELECT};
use crate::routes::clients::clients_handlers::fetch_client;
use crate::routes::meetings::meetings_handlers::upcoming_for_user;
use crate::routes::projects::projects_handlers::{fetch_project, project_detail, push_filters};
use crate::routes::responses::{DataResponse, MessageResponse};
use crate::services::dashboard::count_by;
use crate::services::notifications::{EventKind, NotificationHub, Room};
use crate::services::pagination::{ListQuery, Paginated};

/// The project, if it is active and belongs to `client_id`; 404 otherwise.
async fn own_project(pool: &MySqlPool, client_id: i64, project_id: i64) -> Result<Project, AppError> {
    let project = fetch_project(pool, project_id).await?;
    if project.client_id != client_id {
        return Err(AppError::not_found(format!("Project {project_id} not found")));
    }
    Ok(project)
}

async fn feedback_for(pool: &MySqlPool, client_id: i64, limit: Option<i64>) -> Result<Vec<Feedback>, AppError> {
    let mut query = QueryBuilder::<MySql>::new(FEEDBACK_SELECT);
    query.push(" WHERE f.client_id = ");
    query.push_bind(client_id);
    query.push(" ORDER BY f.created_at DESC, f.feedback_id DESC");
    if let Some(limit) = limit {
        query.push(" LIMIT ");
        query.push_bind(limit);
    }
    let feedback: Vec<Feedback> = query.build_query_as().fetch_all(pool).await?;
    Ok(feedback)
}

// Handler for the client dashboard
pub async fn dashboard(pool: web::Data<MySqlPool>, user: AuthUser) -> Result<HttpResponse, AppError> {
    let client_id = user.client_id(pool.get_ref()).await?;
    let pool = pool.get_ref();

    let projects: Vec<(String, i32)> = sqlx::query_as(
        "SELECT status, progress FROM Projects_ WHERE client_id = ? AND is_active = true",
    )
    .bind(client_id)
    .fetch_all(pool)
    .await?;
    let known: Vec<&'static str> = ProjectStatus::ALL.iter().map(|s| s.as_str()).collect();
    let projects_by_status = count_by(projects.iter().map(|(s, _)| (s.as_str(), 1)), &known);
    let progress: Vec<i32> = projects.iter().map(|(_, p)| *p).collect();

    let recent_feedback = feedback_for(pool, client_id, Some(RECENT_FEEDBACK)).await?;
    let upcoming_meetings =
        upcoming_for_user(pool, user.user_id, Utc::now().naive_utc(), DASHBOARD_MEETINGS).await?;

    Ok(HttpResponse::Ok().json(DataResponse::new(ClientDashboard {
        projects_by_status,
        total_projects: projects.len(),
        average_progress: average_progress(&progress),
        recent_feedback,
        upcoming_meetings,
    })))
}

// Handler for the caller's own profile
pub async fn profile(pool: web::Data<MySqlPool>, user: AuthUser) -> Result<HttpResponse, AppError> {
    let client_id = user.client_id(pool.get_ref()).await?;
    let client = fetch_client(pool.get_ref(), client_id).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(client)))
}

// Handler to list the caller's projects
pub async fn list_projects(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let client_id = user.client_id(pool.get_ref()).await?;
    let mut query = query.into_inner();
    query.client_id = Some(client_id);
    let pagination = query.pagination();

    let mut count = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM Projects_ p");
    push_filters(&mut count, &query)?;
    let total: i64 = count.build_query_scalar().fetch_one(pool.get_ref()).await?;

    let mut rows = QueryBuilder::<MySql>::new(PROJECT_LIST_SELECT);
    push_filters(&mut rows, &query)?;
    rows.push(" ORDER BY p.created_at DESC, p.project_id DESC LIMIT ");
    rows.push_bind(pagination.limit());
    rows.push(" OFFSET ");
    rows.push_bind(pagination.offset());
    let projects: Vec<ProjectListItem> = rows.build_query_as().fetch_all(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(Paginated::new(projects, total, pagination)))
}

// Handler for one of the caller's projects
pub async fn get_project(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let client_id = user.client_id(pool.get_ref()).await?;
    let project = own_project(pool.get_ref(), client_id, path.into_inner()).await?;
    let detail = project_detail(pool.get_ref(), project).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(detail)))
}

// Handler for a client leaving feedback on their project
pub async fn submit_feedback(
    pool: web::Data<MySqlPool>,
    hub: web::Data<NotificationHub>,
    user: AuthUser,
    path: web::Path<i64>,
    request: web::Json<FeedbackRequest>,
) -> Result<HttpResponse, AppError> {
    let client_id = user.client_id(pool.get_ref()).await?;
    let feedback = request.validate()?;
    let project = own_project(pool.get_ref(), client_id, path.into_inner()).await?;

    let result = sqlx::query(
        "INSERT INTO Feedback_ (project_id, client_id, rating, message, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(project.project_id)
    .bind(client_id)
    .bind(feedback.rating)
    .bind(&feedback.message)
    .bind(Utc::now().naive_utc())
    .execute(pool.get_ref())
    .await?;
    let feedback_id = result.last_insert_id() as i64;
    info!("Client {} rated project {} {}/5", client_id, project.project_id, feedback.rating);

    let stored: Feedback = sqlx::query_as(&format!("{FEEDBACK_SELECT} WHERE f.feedback_id = ?"))
        .bind(feedback_id)
        .fetch_one(pool.get_ref())
        .await?;

    let mut rooms = vec![Room::Admin];
    rooms.extend(project.manager_id.map(Room::Employee));
    hub.notify(
        pool.get_ref(),
        &rooms,
        EventKind::FeedbackReceived,
        &format!("{} rated \"{}\" {}/5", stored.company_name, project.name, stored.rating),
        json!({ "feedback_id": feedback_id, "project_id": project.project_id, "rating": stored.rating }),
    )
    .await;

    Ok(HttpResponse::Created().json(MessageResponse::with_data("Feedback submitted", &stored)))
}

// Handler to list the caller's feedback
pub async fn list_feedback(pool: web::Data<MySqlPool>, user: AuthUser) -> Result<HttpResponse, AppError> {
    let client_id = user.client_id(pool.get_ref()).await?;
    let feedback = feedback_for(pool.get_ref(), client_id, None).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(feedback)))
}

// Handler for upcoming meetings the caller attends
pub async fn list_meetings(pool: web::Data<MySqlPool>, user: AuthUser) -> Result<HttpResponse, AppError> {
    user.client_id(pool.get_ref()).await?;
    let meetings =
        upcoming_for_user(pool.get_ref(), user.user_id, Utc::now().naive_utc(), UPCOMING_MEETINGS).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(meetings)))
}
