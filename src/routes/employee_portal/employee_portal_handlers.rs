use actix_web::{web, HttpResponse};
use chrono::{Local, Utc};
use log::info;
use serde_json::json;
use sqlx::{MySql, MySqlPool, QueryBuilder};

use super::employee_portal_models::{
    check_in, check_out, AttendanceNoteRequest, EmployeeDashboard, DASHBOARD_MEETINGS, UPCOMING_MEETINGS,
};
use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::project::{ProjectListItem, PROJECT_LIST_SELECT};
use crate::models::task::{TaskListItem, TaskStatus, TASK_LIST_SELECT};
use crate::routes::attendance::attendance_handlers::{fetch_record, history, office_today, record_for_day};
use crate::routes::attendance::attendance_models::{AttendanceEntry, AttendanceQuery};
use crate::routes::employees::employees_handlers::fetch_employee;
use crate::routes::meetings::meetings_handlers::upcoming_for_user;
use crate::routes::responses::{DataResponse, MessageResponse};
use crate::routes::tasks::tasks_handlers::{
    announce_status_change, fetch_task, push_filters, save_task, task_detail,
};
use crate::routes::tasks::tasks_models::{set_status, UpdateTaskStatusRequest};
use crate::routes::validation;
use crate::services::dashboard::count_by;
use crate::services::ids::is_unique_violation;
use crate::services::notifications::{EventKind, NotificationHub, Room};
use crate::services::pagination::{ListQuery, Paginated};

const OWN_PROJECTS: &str = " WHERE p.is_active = true
      AND (p.manager_id = ?
           OR EXISTS (SELECT 1 FROM ProjectTeam_ pt
                      WHERE pt.project_id = p.project_id AND pt.employee_id = ?))";

// Handler for the employee dashboard
pub async fn dashboard(
    pool: web::Data<MySqlPool>,
    config: web::Data<AppConfig>,
    user: AuthUser,
) -> Result<HttpResponse, AppError> {
    let employee_id = user.employee_id(pool.get_ref()).await?;
    let pool = pool.get_ref();
    let today = office_today();

    let counts: Vec<(String, i64)> = sqlx::query_as(
        "SELECT status, COUNT(*) FROM Tasks_
         WHERE assignee_id = ? AND is_active = true
         GROUP BY status",
    )
    .bind(employee_id)
    .fetch_all(pool)
    .await?;
    let known: Vec<&'static str> = TaskStatus::ALL.iter().map(|s| s.as_str()).collect();
    let tasks_by_status = count_by(counts.iter().map(|(s, n)| (s.as_str(), *n)), &known);

    let (overdue_tasks,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM Tasks_
         WHERE assignee_id = ? AND is_active = true AND status <> 'completed' AND due_date < ?",
    )
    .bind(employee_id)
    .bind(today)
    .fetch_one(pool)
    .await?;

    let (projects,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM Projects_ p{OWN_PROJECTS}"))
        .bind(employee_id)
        .bind(employee_id)
        .fetch_one(pool)
        .await?;

    let record = record_for_day(pool, employee_id, today).await?;
    let attendance_status = config.attendance.classify_record(record.as_ref()).to_string();
    let attendance_today = record.map(|r| AttendanceEntry::new(r, &config.attendance));

    let upcoming_meetings =
        upcoming_for_user(pool, user.user_id, Utc::now().naive_utc(), DASHBOARD_MEETINGS).await?;

    Ok(HttpResponse::Ok().json(DataResponse::new(EmployeeDashboard {
        tasks_by_status,
        overdue_tasks,
        projects,
        today,
        attendance_status,
        attendance_today,
        upcoming_meetings,
    })))
}

// Handler for the caller's own profile
pub async fn profile(pool: web::Data<MySqlPool>, user: AuthUser) -> Result<HttpResponse, AppError> {
    let employee_id = user.employee_id(pool.get_ref()).await?;
    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(employee)))
}

// Handler to list the caller's tasks
pub async fn list_tasks(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let employee_id = user.employee_id(pool.get_ref()).await?;
    let mut query = query.into_inner();
    query.assignee_id = Some(employee_id);
    let pagination = query.pagination();

    let mut count = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM Tasks_ t");
    push_filters(&mut count, &query)?;
    let total: i64 = count.build_query_scalar().fetch_one(pool.get_ref()).await?;

    let mut rows = QueryBuilder::<MySql>::new(TASK_LIST_SELECT);
    push_filters(&mut rows, &query)?;
    rows.push(" ORDER BY t.due_date IS NULL, t.due_date, t.task_id LIMIT ");
    rows.push_bind(pagination.limit());
    rows.push(" OFFSET ");
    rows.push_bind(pagination.offset());
    let tasks: Vec<TaskListItem> = rows.build_query_as().fetch_all(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(Paginated::new(tasks, total, pagination)))
}

// Handler for an employee moving their own task along
pub async fn update_task_status(
    pool: web::Data<MySqlPool>,
    hub: web::Data<NotificationHub>,
    user: AuthUser,
    path: web::Path<i64>,
    request: web::Json<UpdateTaskStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let employee_id = user.employee_id(pool.get_ref()).await?;
    let task_id = path.into_inner();
    let status: TaskStatus = validation::parse_enum("Status", &request.status)?;

    let mut task = fetch_task(pool.get_ref(), task_id).await?;
    if task.assignee_id != employee_id {
        return Err(AppError::not_found(format!("Task {task_id} not found")));
    }
    let previous_status = task.status.clone();
    set_status(&mut task, status, Utc::now().naive_utc());
    save_task(pool.get_ref(), &task).await?;
    info!("Employee {} moved task {} to {}", employee_id, task_id, task.status);

    if task.status != previous_status {
        announce_status_change(pool.get_ref(), &hub, &task, &previous_status, &user.full_name).await;
    }

    let detail = task_detail(pool.get_ref(), task).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::with_data("Task status updated", &detail)))
}

// Handler to list projects the caller manages or works on
pub async fn list_projects(pool: web::Data<MySqlPool>, user: AuthUser) -> Result<HttpResponse, AppError> {
    let employee_id = user.employee_id(pool.get_ref()).await?;
    let projects: Vec<ProjectListItem> =
        sqlx::query_as(&format!("{PROJECT_LIST_SELECT}{OWN_PROJECTS} ORDER BY p.deadline IS NULL, p.deadline"))
            .bind(employee_id)
            .bind(employee_id)
            .fetch_all(pool.get_ref())
            .await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(projects)))
}

// Handler for the morning check-in
pub async fn check_in_today(
    pool: web::Data<MySqlPool>,
    config: web::Data<AppConfig>,
    hub: web::Data<NotificationHub>,
    user: AuthUser,
    request: Option<web::Json<AttendanceNoteRequest>>,
) -> Result<HttpResponse, AppError> {
    let employee_id = user.employee_id(pool.get_ref()).await?;
    let now = Local::now().naive_local();
    let existing = record_for_day(pool.get_ref(), employee_id, now.date()).await?;
    let notes = request.as_ref().and_then(|r| r.notes.as_deref());
    let mark = check_in(existing.as_ref(), now, notes, &config.attendance)?;

    let result = sqlx::query(
        "INSERT INTO Attendance_ (employee_id, work_date, check_in, status, notes, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(employee_id)
    .bind(mark.work_date)
    .bind(mark.check_in)
    .bind(&mark.status)
    .bind(&mark.notes)
    .bind(Utc::now().naive_utc())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::conflict("You have already checked in today")
        } else {
            e.into()
        }
    })?;
    let record = fetch_record(pool.get_ref(), result.last_insert_id() as i64).await?;
    info!("Employee {} checked in at {} ({})", employee_id, mark.check_in, mark.status);

    hub.notify(
        pool.get_ref(),
        &[Room::Admin],
        EventKind::AttendanceMarked,
        &format!("{} checked in ({})", user.full_name, record.status),
        json!({ "employee_id": employee_id, "attendance_id": record.attendance_id, "status": record.status }),
    )
    .await;

    let entry = AttendanceEntry::new(record, &config.attendance);
    Ok(HttpResponse::Created().json(MessageResponse::with_data("Checked in", &entry)))
}

// Handler for the evening check-out
pub async fn check_out_today(
    pool: web::Data<MySqlPool>,
    config: web::Data<AppConfig>,
    hub: web::Data<NotificationHub>,
    user: AuthUser,
    request: Option<web::Json<AttendanceNoteRequest>>,
) -> Result<HttpResponse, AppError> {
    let employee_id = user.employee_id(pool.get_ref()).await?;
    let now = Local::now().naive_local();
    let existing = record_for_day(pool.get_ref(), employee_id, now.date()).await?;
    let notes = request.as_ref().and_then(|r| r.notes.as_deref());
    let record = check_out(existing, now, notes, &config.attendance)?;

    sqlx::query("UPDATE Attendance_ SET check_out = ?, status = ?, notes = ? WHERE attendance_id = ?")
        .bind(record.check_out)
        .bind(&record.status)
        .bind(&record.notes)
        .bind(record.attendance_id)
        .execute(pool.get_ref())
        .await?;
    info!("Employee {} checked out ({})", employee_id, record.status);

    hub.notify(
        pool.get_ref(),
        &[Room::Admin],
        EventKind::AttendanceMarked,
        &format!("{} checked out ({})", user.full_name, record.status),
        json!({ "employee_id": employee_id, "attendance_id": record.attendance_id, "status": record.status }),
    )
    .await;

    let entry = AttendanceEntry::new(record, &config.attendance);
    Ok(HttpResponse::Ok().json(MessageResponse::with_data("Checked out", &entry)))
}

// Handler for the caller's attendance history
pub async fn attendance_history(
    pool: web::Data<MySqlPool>,
    config: web::Data<AppConfig>,
    user: AuthUser,
    query: web::Query<AttendanceQuery>,
) -> Result<HttpResponse, AppError> {
    let employee_id = user.employee_id(pool.get_ref()).await?;
    let (from, to) = query.range(office_today())?;
    let history = history(pool.get_ref(), employee_id, from, to, &config.attendance).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(history)))
}

// Handler for upcoming meetings the caller attends
pub async fn list_meetings(pool: web::Data<MySqlPool>, user: AuthUser) -> Result<HttpResponse, AppError> {
    user.employee_id(pool.get_ref()).await?;
    let meetings =
        upcoming_for_user(pool.get_ref(), user.user_id, Utc::now().naive_utc(), UPCOMING_MEETINGS).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(meetings)))
}
