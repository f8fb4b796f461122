use actix_web::{web, HttpResponse};
use chrono::{Duration, Utc};
use sqlx::MySqlPool;

use super::admin_models::{
    activities, feedback_activity, ActivityRow, AdminDashboard, EntityCounts, RECENT_ACTIVITY_DAYS,
    RECENT_ACTIVITY_LIMIT,
};
use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::project::ProjectStatus;
use crate::models::task::TaskStatus;
use crate::models::user::Role;
use crate::routes::attendance::attendance_handlers::{office_today, report_for};
use crate::routes::responses::DataResponse;
use crate::services::dashboard::{count_by, recent_activity, Activity};

async fn count(pool: &MySqlPool, sql: &str) -> Result<i64, AppError> {
    let (total,): (i64,) = sqlx::query_as(sql).fetch_one(pool).await?;
    Ok(total)
}

async fn status_counts(pool: &MySqlPool, sql: &str) -> Result<Vec<(String, i64)>, AppError> {
    let rows: Vec<(String, i64)> = sqlx::query_as(sql).fetch_all(pool).await?;
    Ok(rows)
}

// Handler for the admin dashboard
pub async fn dashboard(
    pool: web::Data<MySqlPool>,
    config: web::Data<AppConfig>,
    user: AuthUser,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let pool = pool.get_ref();
    let now = Utc::now().naive_utc();
    let today = office_today();

    let counts = EntityCounts {
        employees: count(pool, "SELECT COUNT(*) FROM Employees_ WHERE is_active = true").await?,
        clients: count(pool, "SELECT COUNT(*) FROM Clients_ WHERE is_active = true").await?,
        projects: count(pool, "SELECT COUNT(*) FROM Projects_ WHERE is_active = true").await?,
        open_tasks: count(
            pool,
            "SELECT COUNT(*) FROM Tasks_ WHERE is_active = true AND status <> 'completed'",
        )
        .await?,
    };

    let projects = status_counts(
        pool,
        "SELECT status, COUNT(*) FROM Projects_ WHERE is_active = true GROUP BY status",
    )
    .await?;
    let project_statuses: Vec<&'static str> = ProjectStatus::ALL.iter().map(|s| s.as_str()).collect();
    let projects_by_status = count_by(projects.iter().map(|(s, n)| (s.as_str(), *n)), &project_statuses);

    let tasks = status_counts(
        pool,
        "SELECT status, COUNT(*) FROM Tasks_ WHERE is_active = true GROUP BY status",
    )
    .await?;
    let task_statuses: Vec<&'static str> = TaskStatus::ALL.iter().map(|s| s.as_str()).collect();
    let tasks_by_status = count_by(tasks.iter().map(|(s, n)| (s.as_str(), *n)), &task_statuses);

    let (overdue_tasks,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM Tasks_
         WHERE is_active = true AND status <> 'completed' AND due_date < ?",
    )
    .bind(today)
    .fetch_one(pool)
    .await?;

    let attendance_today = report_for(pool, today, None, &config.attendance).await?.summary;

    let since = now - Duration::days(RECENT_ACTIVITY_DAYS);
    let mut feed: Vec<Activity> = Vec::new();

    let projects: Vec<ActivityRow> = sqlx::query_as(
        "SELECT p.project_id, p.name, c.company_name, p.created_at
         FROM Projects_ p JOIN Clients_ c ON p.client_id = c.client_id
         WHERE p.is_active = true AND p.created_at >= ?",
    )
    .bind(since)
    .fetch_all(pool)
    .await?;
    feed.extend(activities("project", projects));

    let tasks: Vec<ActivityRow> = sqlx::query_as(
        "SELECT t.task_id, t.title, u.full_name, t.created_at
         FROM Tasks_ t
         JOIN Employees_ e ON t.assignee_id = e.employee_id
         JOIN Users_ u ON e.user_id = u.user_id
         WHERE t.is_active = true AND t.created_at >= ?",
    )
    .bind(since)
    .fetch_all(pool)
    .await?;
    feed.extend(activities("task", tasks));

    let feedback: Vec<(i64, String, String, i32, chrono::NaiveDateTime)> = sqlx::query_as(
        "SELECT f.feedback_id, p.name, c.company_name, f.rating, f.created_at
         FROM Feedback_ f
         JOIN Projects_ p ON f.project_id = p.project_id
         JOIN Clients_ c ON f.client_id = c.client_id
         WHERE f.created_at >= ?",
    )
    .bind(since)
    .fetch_all(pool)
    .await?;
    feed.extend(feedback_activity(feedback));

    let meetings: Vec<ActivityRow> = sqlx::query_as(
        "SELECT m.meeting_id, m.title, o.full_name, m.created_at
         FROM Meetings_ m JOIN Users_ o ON m.organizer_id = o.user_id
         WHERE m.is_active = true AND m.created_at >= ?",
    )
    .bind(since)
    .fetch_all(pool)
    .await?;
    feed.extend(activities("meeting", meetings));

    Ok(HttpResponse::Ok().json(DataResponse::new(AdminDashboard {
        counts,
        projects_by_status,
        tasks_by_status,
        overdue_tasks,
        attendance_today,
        recent_activity: recent_activity(feed, now, RECENT_ACTIVITY_LIMIT),
    })))
}
