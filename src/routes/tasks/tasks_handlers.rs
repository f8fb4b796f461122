use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use serde_json::json;
use sqlx::{MySql, MySqlPool, QueryBuilder};

use super::tasks_models::{CreateTaskRequest, ProjectRef, TaskDetail, UpdateTaskRequest};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::employee::{EmployeeRef, EMPLOYEE_REF_SELECT};
use crate::models::task::{Task, TaskListItem, TaskStatus, TASK_LIST_SELECT, TASK_SELECT};
use crate::models::user::Role;
use crate::routes::attendance::attendance_handlers::office_today;
use crate::routes::projects::projects_handlers::{ensure_active_employees, fetch_project};
use crate::routes::responses::{DataResponse, MessageResponse};
use crate::routes::validation;
use crate::services::notifications::{EventKind, NotificationHub, Room};
use crate::services::pagination::{ListQuery, Paginated};

pub fn push_filters(builder: &mut QueryBuilder<'_, MySql>, query: &ListQuery) -> Result<(), AppError> {
    builder.push(" WHERE t.is_active = true");
    if let Some(raw) = query.status_filter() {
        let status: TaskStatus = validation::parse_enum("Status", raw)?;
        builder.push(" AND t.status = ");
        builder.push_bind(status.as_str());
    }
    if let Some(project_id) = query.project_id {
        builder.push(" AND t.project_id = ");
        builder.push_bind(project_id);
    }
    if let Some(assignee_id) = query.assignee_id {
        builder.push(" AND t.assignee_id = ");
        builder.push_bind(assignee_id);
    }
    if let Some(pattern) = query.search_pattern() {
        builder.push(" AND (t.title LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR t.description LIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    Ok(())
}

pub async fn fetch_task(pool: &MySqlPool, task_id: i64) -> Result<Task, AppError> {
    sqlx::query_as::<_, Task>(&format!("{TASK_SELECT} WHERE t.task_id = ? AND t.is_active = true"))
        .bind(task_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Task {task_id} not found")))
}

pub async fn task_detail(pool: &MySqlPool, task: Task) -> Result<TaskDetail, AppError> {
    let project = match task.project_id {
        Some(project_id) => {
            sqlx::query_as::<_, ProjectRef>(
                "SELECT project_id, project_code, name FROM Projects_ WHERE project_id = ?",
            )
            .bind(project_id)
            .fetch_optional(pool)
            .await?
        }
        None => None,
    };
    let assignee = sqlx::query_as::<_, EmployeeRef>(&format!("{EMPLOYEE_REF_SELECT} WHERE e.employee_id = ?"))
        .bind(task.assignee_id)
        .fetch_one(pool)
        .await?;
    Ok(TaskDetail {
        overdue: task.is_overdue(office_today()),
        task,
        project,
        assignee,
    })
}

/// Persists every editable column of `task`.
pub async fn save_task(pool: &MySqlPool, task: &Task) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE Tasks_
         SET title = ?, description = ?, project_id = ?, assignee_id = ?, status = ?, priority = ?,
             due_date = ?, completed_at = ?, updated_at = ?
         WHERE task_id = ?",
    )
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.project_id)
    .bind(task.assignee_id)
    .bind(&task.status)
    .bind(&task.priority)
    .bind(task.due_date)
    .bind(task.completed_at)
    .bind(Utc::now().naive_utc())
    .bind(task.task_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Tells the admin room and the task's project room that its status moved.
pub async fn announce_status_change(
    pool: &MySqlPool,
    hub: &NotificationHub,
    task: &Task,
    previous_status: &str,
    changed_by: &str,
) {
    let mut rooms = vec![Room::Admin];
    rooms.extend(task.project_id.map(Room::Project));
    hub.notify(
        pool,
        &rooms,
        EventKind::TaskUpdated,
        &format!(
            "{} moved \"{}\" from {} to {}",
            changed_by, task.title, previous_status, task.status
        ),
        json!({ "task_id": task.task_id, "status": task.status, "previous_status": previous_status }),
    )
    .await;
}

async fn announce_assignment(pool: &MySqlPool, hub: &NotificationHub, task: &Task) {
    hub.notify(
        pool,
        &[Room::Employee(task.assignee_id)],
        EventKind::TaskAssigned,
        &format!("You have been assigned \"{}\"", task.title),
        json!({ "task_id": task.task_id, "project_id": task.project_id, "due_date": task.due_date }),
    )
    .await;
}

// Handler to list tasks
pub async fn list_tasks(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let pagination = query.pagination();

    let mut count = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM Tasks_ t");
    push_filters(&mut count, &query)?;
    let total: i64 = count.build_query_scalar().fetch_one(pool.get_ref()).await?;

    let mut rows = QueryBuilder::<MySql>::new(TASK_LIST_SELECT);
    push_filters(&mut rows, &query)?;
    rows.push(" ORDER BY t.created_at DESC, t.task_id DESC LIMIT ");
    rows.push_bind(pagination.limit());
    rows.push(" OFFSET ");
    rows.push_bind(pagination.offset());
    let tasks: Vec<TaskListItem> = rows.build_query_as().fetch_all(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(Paginated::new(tasks, total, pagination)))
}

// Handler to get task details
pub async fn get_task(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let task = fetch_task(pool.get_ref(), path.into_inner()).await?;
    let detail = task_detail(pool.get_ref(), task).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(detail)))
}

// Handler to add a task
pub async fn create_task(
    pool: web::Data<MySqlPool>,
    hub: web::Data<NotificationHub>,
    user: AuthUser,
    request: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let new = request.validate()?;
    info!("Received request to create task: {}", new.title);

    ensure_active_employees(pool.get_ref(), &[new.assignee_id]).await?;
    if let Some(project_id) = new.project_id {
        fetch_project(pool.get_ref(), project_id)
            .await
            .map_err(|_| AppError::validation(format!("Project {project_id} does not exist")))?;
    }

    let now = Utc::now().naive_utc();
    let completed_at = (new.status == TaskStatus::Completed).then_some(now);
    let result = sqlx::query(
        "INSERT INTO Tasks_ (title, description, project_id, assignee_id, assigned_by, status, priority,
                             due_date, completed_at, is_active, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, true, ?, ?)",
    )
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.project_id)
    .bind(new.assignee_id)
    .bind(user.user_id)
    .bind(new.status.as_str())
    .bind(new.priority.as_str())
    .bind(new.due_date)
    .bind(completed_at)
    .bind(now)
    .bind(now)
    .execute(pool.get_ref())
    .await?;
    let task_id = result.last_insert_id() as i64;
    info!("Task {} created for employee {}", task_id, new.assignee_id);

    let task = fetch_task(pool.get_ref(), task_id).await?;
    announce_assignment(pool.get_ref(), &hub, &task).await;

    let detail = task_detail(pool.get_ref(), task).await?;
    Ok(HttpResponse::Created().json(MessageResponse::with_data("Task created", &detail)))
}

// Handler to update a task
pub async fn update_task(
    pool: web::Data<MySqlPool>,
    hub: web::Data<NotificationHub>,
    user: AuthUser,
    path: web::Path<i64>,
    request: web::Json<UpdateTaskRequest>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let existing = fetch_task(pool.get_ref(), path.into_inner()).await?;
    let previous_status = existing.status.clone();
    let previous_assignee = existing.assignee_id;
    let task = request.apply(existing, Utc::now().naive_utc())?;

    if task.assignee_id != previous_assignee {
        ensure_active_employees(pool.get_ref(), &[task.assignee_id]).await?;
    }
    if let (Some(project_id), Some(_)) = (task.project_id, request.project_id) {
        fetch_project(pool.get_ref(), project_id)
            .await
            .map_err(|_| AppError::validation(format!("Project {project_id} does not exist")))?;
    }

    save_task(pool.get_ref(), &task).await?;
    info!("Task {} updated", task.task_id);

    if task.assignee_id != previous_assignee {
        announce_assignment(pool.get_ref(), &hub, &task).await;
    }
    if task.status != previous_status {
        announce_status_change(pool.get_ref(), &hub, &task, &previous_status, &user.full_name).await;
    }

    let detail = task_detail(pool.get_ref(), task).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::with_data("Task updated", &detail)))
}

// Handler to soft-delete a task
pub async fn delete_task(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let task = fetch_task(pool.get_ref(), path.into_inner()).await?;

    sqlx::query("UPDATE Tasks_ SET is_active = false, updated_at = ? WHERE task_id = ?")
        .bind(Utc::now().naive_utc())
        .bind(task.task_id)
        .execute(pool.get_ref())
        .await?;

    info!("Task {} deactivated", task.task_id);
    Ok(HttpResponse::Ok().json(MessageResponse::new("Task deleted")))
}
