use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use serde_json::json;
use sqlx::mysql::MySqlConnection;
use sqlx::{MySql, MySqlPool, QueryBuilder};

use super::projects_models::{
    normalize_team, CreateProjectRequest, ProjectDetail, UpdateProjectRequest,
};
use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::client::{ClientRef, CLIENT_REF_SELECT};
use crate::models::employee::{EmployeeRef, EMPLOYEE_REF_SELECT};
use crate::models::project::{Project, ProjectListItem, ProjectStatus, PROJECT_LIST_SELECT, PROJECT_SELECT};
use crate::models::task::TaskStatus;
use crate::models::user::Role;
use crate::routes::responses::{DataResponse, MessageResponse};
use crate::routes::validation;
use crate::services::dashboard::count_by;
use crate::services::ids::PROJECT_IDS;
use crate::services::notifications::{EventKind, NotificationHub, Room};
use crate::services::pagination::{ListQuery, Paginated};

pub fn push_filters(builder: &mut QueryBuilder<'_, MySql>, query: &ListQuery) -> Result<(), AppError> {
    builder.push(" WHERE p.is_active = true");
    if let Some(raw) = query.status_filter() {
        let status: ProjectStatus = validation::parse_enum("Status", raw)?;
        builder.push(" AND p.status = ");
        builder.push_bind(status.as_str());
    }
    if let Some(client_id) = query.client_id {
        builder.push(" AND p.client_id = ");
        builder.push_bind(client_id);
    }
    if let Some(pattern) = query.search_pattern() {
        builder.push(" AND (p.name LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR p.project_code LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR p.description LIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    Ok(())
}

pub async fn fetch_project(pool: &MySqlPool, project_id: i64) -> Result<Project, AppError> {
    sqlx::query_as::<_, Project>(&format!("{PROJECT_SELECT} WHERE p.project_id = ? AND p.is_active = true"))
        .bind(project_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Project {project_id} not found")))
}

pub async fn fetch_team(pool: &MySqlPool, project_id: i64) -> Result<Vec<EmployeeRef>, AppError> {
    let team = sqlx::query_as::<_, EmployeeRef>(&format!(
        "{EMPLOYEE_REF_SELECT}
         JOIN ProjectTeam_ pt ON pt.employee_id = e.employee_id
         WHERE pt.project_id = ?
         ORDER BY e.employee_code"
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    Ok(team)
}

/// Populates client, manager, team and task counts.
pub async fn project_detail(pool: &MySqlPool, project: Project) -> Result<ProjectDetail, AppError> {
    let client = sqlx::query_as::<_, ClientRef>(&format!("{CLIENT_REF_SELECT} WHERE c.client_id = ?"))
        .bind(project.client_id)
        .fetch_one(pool)
        .await?;
    let manager = match project.manager_id {
        Some(manager_id) => {
            sqlx::query_as::<_, EmployeeRef>(&format!("{EMPLOYEE_REF_SELECT} WHERE e.employee_id = ?"))
                .bind(manager_id)
                .fetch_optional(pool)
                .await?
        }
        None => None,
    };
    let team = fetch_team(pool, project.project_id).await?;

    let counts: Vec<(String, i64)> = sqlx::query_as(
        "SELECT status, COUNT(*) FROM Tasks_
         WHERE project_id = ? AND is_active = true
         GROUP BY status",
    )
    .bind(project.project_id)
    .fetch_all(pool)
    .await?;
    let known: Vec<&'static str> = TaskStatus::ALL.iter().map(|s| s.as_str()).collect();
    let tasks_by_status = count_by(counts.iter().map(|(s, n)| (s.as_str(), *n)), &known);

    Ok(ProjectDetail {
        project,
        client,
        manager,
        team,
        tasks_by_status,
    })
}

/// Rooms that hear about changes to a project.
pub fn project_rooms(project: &Project, team: &[i64]) -> Vec<Room> {
    let mut rooms = vec![
        Room::Admin,
        Room::Client(project.client_id),
        Room::Project(project.project_id),
    ];
    rooms.extend(project.manager_id.map(Room::Employee));
    rooms.extend(team.iter().copied().map(Room::Employee));
    rooms
}

async fn ensure_active_client(pool: &MySqlPool, client_id: i64) -> Result<(), AppError> {
    let found: Option<(i64,)> =
        sqlx::query_as("SELECT client_id FROM Clients_ WHERE client_id = ? AND is_active = true")
            .bind(client_id)
            .fetch_optional(pool)
            .await?;
    found
        .map(|_| ())
        .ok_or_else(|| AppError::validation(format!("Client {client_id} does not exist or is inactive")))
}

/// Every id must be an active employee.
pub async fn ensure_active_employees(pool: &MySqlPool, ids: &[i64]) -> Result<(), AppError> {
    let ids = normalize_team(ids);
    if ids.is_empty() {
        return Ok(());
    }
    let mut query = QueryBuilder::<MySql>::new(
        "SELECT COUNT(*) FROM Employees_ WHERE is_active = true AND employee_id IN (",
    );
    let mut separated = query.separated(", ");
    for id in &ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
    let found: i64 = query.build_query_scalar().fetch_one(pool).await?;
    if found as usize != ids.len() {
        return Err(AppError::validation("One or more employees do not exist or are inactive"));
    }
    Ok(())
}

async fn replace_team(conn: &mut MySqlConnection, project_id: i64, team: &[i64]) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM ProjectTeam_ WHERE project_id = ?")
        .bind(project_id)
        .execute(&mut *conn)
        .await?;
    if team.is_empty() {
        return Ok(());
    }
    let mut insert = QueryBuilder::<MySql>::new("INSERT INTO ProjectTeam_ (project_id, employee_id) ");
    insert.push_values(team, |mut row, employee_id| {
        row.push_bind(project_id).push_bind(*employee_id);
    });
    insert.build().execute(&mut *conn).await?;
    Ok(())
}

// Handler to list projects
pub async fn list_projects(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
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

// Handler to get project details
pub async fn get_project(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let project = fetch_project(pool.get_ref(), path.into_inner()).await?;
    let detail = project_detail(pool.get_ref(), project).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(detail)))
}

// Handler to add a project
pub async fn create_project(
    pool: web::Data<MySqlPool>,
    config: web::Data<AppConfig>,
    hub: web::Data<NotificationHub>,
    user: AuthUser,
    request: web::Json<CreateProjectRequest>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let new = request.validate()?;
    info!("Received request to create project: {}", new.name);

    ensure_active_client(pool.get_ref(), new.client_id).await?;
    let mut staff = new.team.clone();
    staff.extend(new.manager_id);
    ensure_active_employees(pool.get_ref(), &staff).await?;

    let now = Utc::now().naive_utc();
    let mut tx = pool.begin().await?;
    let (code, project_id) = PROJECT_IDS
        .insert_with_code(
            &mut tx,
            config.id_retry_attempts,
            "INSERT INTO Projects_ (project_code, name, description, client_id, manager_id, status,
                                    priority, start_date, deadline, progress, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, true, ?, ?)",
            |q| {
                q.bind(new.name.clone())
                    .bind(new.description.clone())
                    .bind(new.client_id)
                    .bind(new.manager_id)
                    .bind(new.status.as_str())
                    .bind(new.priority.as_str())
                    .bind(new.start_date)
                    .bind(new.deadline)
                    .bind(new.progress)
                    .bind(now)
                    .bind(now)
            },
        )
        .await?;
    replace_team(&mut tx, project_id, &new.team).await?;
    tx.commit().await?;
    info!("Project {} created with code {}", new.name, code);

    let project = fetch_project(pool.get_ref(), project_id).await?;
    hub.notify(
        pool.get_ref(),
        &project_rooms(&project, &new.team),
        EventKind::ProjectCreated,
        &format!("Project {} ({}) was created", project.name, code),
        json!({ "project_id": project_id, "project_code": code }),
    )
    .await;

    let detail = project_detail(pool.get_ref(), project).await?;
    Ok(HttpResponse::Created().json(MessageResponse::with_data("Project created", &detail)))
}

// Handler to update a project
pub async fn update_project(
    pool: web::Data<MySqlPool>,
    hub: web::Data<NotificationHub>,
    user: AuthUser,
    path: web::Path<i64>,
    request: web::Json<UpdateProjectRequest>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let project_id = path.into_inner();
    let existing = fetch_project(pool.get_ref(), project_id).await?;
    let previous_status = existing.status.clone();
    let project = request.apply(existing)?;

    if request.client_id.is_some() {
        ensure_active_client(pool.get_ref(), project.client_id).await?;
    }
    let team = request.team.as_deref().map(normalize_team);
    let mut staff = team.clone().unwrap_or_default();
    staff.extend(request.manager_id);
    ensure_active_employees(pool.get_ref(), &staff).await?;

    let now = Utc::now().naive_utc();
    let mut tx = pool.begin().await?;
    sqlx::query(
        "UPDATE Projects_
         SET name = ?, description = ?, client_id = ?, manager_id = ?, status = ?, priority = ?,
             start_date = ?, deadline = ?, progress = ?, updated_at = ?
         WHERE project_id = ?",
    )
    .bind(&project.name)
    .bind(&project.description)
    .bind(project.client_id)
    .bind(project.manager_id)
    .bind(&project.status)
    .bind(&project.priority)
    .bind(project.start_date)
    .bind(project.deadline)
    .bind(project.progress)
    .bind(now)
    .bind(project_id)
    .execute(&mut *tx)
    .await?;
    if let Some(team) = &team {
        replace_team(&mut tx, project_id, team).await?;
    }
    tx.commit().await?;
    info!("Project {} updated", project.project_code);

    let project = fetch_project(pool.get_ref(), project_id).await?;
    let detail = project_detail(pool.get_ref(), project).await?;
    let team_ids: Vec<i64> = detail.team.iter().map(|e| e.employee_id).collect();
    let message = if previous_status != detail.project.status {
        format!(
            "Project {} moved from {} to {}",
            detail.project.name, previous_status, detail.project.status
        )
    } else {
        format!("Project {} was updated", detail.project.name)
    };
    hub.notify(
        pool.get_ref(),
        &project_rooms(&detail.project, &team_ids),
        EventKind::ProjectUpdated,
        &message,
        json!({
            "project_id": project_id,
            "status": detail.project.status,
            "progress": detail.project.progress,
        }),
    )
    .await;

    Ok(HttpResponse::Ok().json(MessageResponse::with_data("Project updated", &detail)))
}

// Handler to soft-delete a project
pub async fn delete_project(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let project_id = path.into_inner();
    let project = fetch_project(pool.get_ref(), project_id).await?;

    sqlx::query("UPDATE Projects_ SET is_active = false, updated_at = ? WHERE project_id = ?")
        .bind(Utc::now().naive_utc())
        .bind(project_id)
        .execute(pool.get_ref())
        .await?;

    info!("Project {} deactivated", project.project_code);
    Ok(HttpResponse::Ok().json(MessageResponse::new("Project deactivated")))
}

#[cfg(test)]
mod tests {
    use super::*;
    fn project(manager_id: Option<i64>) -> Project {
        let now = Utc::now().naive_utc();
        Project {
            project_id: 7,
            project_code: "PRJ0007".into(),
            name: "Intranet".into(),
            description: None,
            client_id: 3,
            manager_id,
            status: "planning".into(),
            priority: "low".into(),
            start_date: None,
            deadline: None,
            progress: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn project_events_reach_admin_client_project_and_staff() {
        let rooms = project_rooms(&project(Some(11)), &[12, 13]);
        assert_eq!(
            rooms,
            vec![
                Room::Admin,
                Room::Client(3),
                Room::Project(7),
                Room::Employee(11),
                Room::Employee(12),
                Room::Employee(13),
            ]
        );
    }

    #[test]
    fn projects_without_manager_skip_that_room() {
        let rooms = project_rooms(&project(None), &[]);
        assert_eq!(rooms.len(), 3);
    }
}
