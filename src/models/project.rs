use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

status_enum!(ProjectStatus {
    Planning => "planning",
    InProgress => "in-progress",
    OnHold => "on-hold",
    Completed => "completed",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub project_id: i64,
    pub project_code: String,
    pub name: String,
    pub description: Option<String>,
    pub client_id: i64,
    pub manager_id: Option<i64>,
    pub status: String,
    pub priority: String,
    pub start_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub progress: i32,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

pub const PROJECT_SELECT: &str = "
    SELECT p.project_id, p.project_code, p.name, p.description, p.client_id,
           p.manager_id, p.status, p.priority, p.start_date, p.deadline,
           p.progress, p.is_active, p.created_at, p.updated_at
    FROM Projects_ p
";

/// List row: a project with its client company and manager name resolved.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectListItem {
    pub project_id: i64,
    pub project_code: String,
    pub name: String,
    pub status: String,
    pub priority: String,
    pub progress: i32,
    pub start_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub client_id: i64,
    pub company_name: String,
    pub manager_id: Option<i64>,
    pub manager_name: Option<String>,
    pub team_size: i64,
    pub created_at: NaiveDateTime,
}

pub const PROJECT_LIST_SELECT: &str = "
    SELECT p.project_id, p.project_code, p.name, p.status, p.priority, p.progress,
           p.start_date, p.deadline, p.client_id, c.company_name,
           p.manager_id, mu.full_name AS manager_name,
           (SELECT COUNT(*) FROM ProjectTeam_ pt WHERE pt.project_id = p.project_id) AS team_size,
           p.created_at
    FROM Projects_ p
    JOIN Clients_ c ON p.client_id = c.client_id
    LEFT JOIN Employees_ m ON p.manager_id = m.employee_id
    LEFT JOIN Users_ mu ON m.user_id = mu.user_id
";
