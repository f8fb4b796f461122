use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

status_enum!(TaskStatus {
    Todo => "todo",
    InProgress => "in-progress",
    Review => "review",
    Completed => "completed",
});

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub task_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<i64>,
    pub assignee_id: i64,
    pub assigned_by: Option<i64>,
    pub status: String,
    pub priority: String,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<NaiveDateTime>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

pub const TASK_SELECT: &str = "
    SELECT t.task_id, t.title, t.description, t.project_id, t.assignee_id,
           t.assigned_by, t.status, t.priority, t.due_date, t.completed_at,
           t.is_active, t.created_at, t.updated_at
    FROM Tasks_ t
";

/// List row with the project name and assignee name resolved.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskListItem {
    pub task_id: i64,
    pub title: String,
    pub status: String,
    pub priority: String,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<NaiveDateTime>,
    pub project_id: Option<i64>,
    pub project_name: Option<String>,
    pub assignee_id: i64,
    pub assignee_name: String,
    pub created_at: NaiveDateTime,
}

pub const TASK_LIST_SELECT: &str = "
    SELECT t.task_id, t.title, t.status, t.priority, t.due_date, t.completed_at,
           t.project_id, p.name AS project_name,
           t.assignee_id, u.full_name AS assignee_name, t.created_at
    FROM Tasks_ t
    LEFT JOIN Projects_ p ON t.project_id = p.project_id
    JOIN Employees_ e ON t.assignee_id = e.employee_id
    JOIN Users_ u ON e.user_id = u.user_id
";

impl Task {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != TaskStatus::Completed.as_str()
            && self.due_date.map_or(false, |due| due < today)
    }
}
