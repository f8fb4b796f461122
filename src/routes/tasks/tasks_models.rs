use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;
use crate::models::employee::EmployeeRef;
use crate::models::task::{Task, TaskStatus};
use crate::models::Priority;
use crate::routes::validation;

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<i64>,
    pub assignee_id: i64,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<i64>,
    pub assignee_id: i64,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

impl CreateTaskRequest {
    pub fn validate(&self) -> Result<NewTask, AppError> {
        Ok(NewTask {
            title: validation::required("Title", &self.title)?,
            description: validation::optional(self.description.as_deref()),
            project_id: self.project_id,
            assignee_id: self.assignee_id,
            status: validation::parse_optional_enum("Status", self.status.as_deref())?
                .unwrap_or(TaskStatus::Todo),
            priority: validation::parse_optional_enum("Priority", self.priority.as_deref())?
                .unwrap_or(Priority::Medium),
            due_date: self.due_date,
        })
    }
}

#[derive(Deserialize, Default)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub project_id: Option<i64>,
    pub assignee_id: Option<i64>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl UpdateTaskRequest {
    pub fn apply(&self, mut task: Task, now: NaiveDateTime) -> Result<Task, AppError> {
        if let Some(title) = &self.title {
            task.title = validation::required("Title", title)?;
        }
        if self.description.is_some() {
            task.description = validation::optional(self.description.as_deref());
        }
        if self.project_id.is_some() {
            task.project_id = self.project_id;
        }
        if let Some(assignee_id) = self.assignee_id {
            task.assignee_id = assignee_id;
        }
        if let Some(priority) = &self.priority {
            let priority: Priority = validation::parse_enum("Priority", priority)?;
            task.priority = priority.to_string();
        }
        if self.due_date.is_some() {
            task.due_date = self.due_date;
        }
        if let Some(status) = &self.status {
            set_status(&mut task, validation::parse_enum("Status", status)?, now);
        }
        Ok(task)
    }
}

/// Moves the task to `status`, stamping or clearing `completed_at`.
pub fn set_status(task: &mut Task, status: TaskStatus, now: NaiveDateTime) {
    if status == TaskStatus::Completed {
        if task.status != TaskStatus::Completed.as_str() || task.completed_at.is_none() {
            task.completed_at = Some(now);
        }
    } else {
        task.completed_at = None;
    }
    task.status = status.to_string();
}

#[derive(Deserialize)]
pub struct UpdateTaskStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ProjectRef {
    pub project_id: i64,
    pub project_code: String,
    pub name: String,
}

#[derive(Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub overdue: bool,
    pub project: Option<ProjectRef>,
    pub assignee: EmployeeRef,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn task(status: &str) -> Task {
        let now = Utc::now().naive_utc();
        Task {
            task_id: 1,
            title: "Write report".into(),
            description: None,
            project_id: None,
            assignee_id: 4,
            assigned_by: Some(1),
            status: status.into(),
            priority: "medium".into(),
            due_date: None,
            completed_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn create_defaults_to_todo_and_medium() {
        let req = CreateTaskRequest {
            title: " Ship it ".into(),
            description: None,
            project_id: None,
            assignee_id: 2,
            status: None,
            priority: None,
            due_date: None,
        };
        let task = req.validate().unwrap();
        assert_eq!(task.title, "Ship it");
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, Priority::Medium);
    }

    #[test]
    fn completing_stamps_and_reopening_clears() {
        let now = Utc::now().naive_utc();
        let mut t = task("in-progress");
        set_status(&mut t, TaskStatus::Completed, now);
        assert_eq!(t.status, "completed");
        assert_eq!(t.completed_at, Some(now));

        let later = now + Duration::hours(1);
        set_status(&mut t, TaskStatus::Completed, later);
        assert_eq!(t.completed_at, Some(now));

        set_status(&mut t, TaskStatus::Review, later);
        assert_eq!(t.completed_at, None);
    }

    #[test]
    fn update_rejects_unknown_status() {
        let update = UpdateTaskRequest {
            status: Some("blocked".into()),
            ..Default::default()
        };
        assert!(update.apply(task("todo"), Utc::now().naive_utc()).is_err());
    }

    #[test]
    fn overdue_ignores_completed_tasks() {
        let today = Utc::now().date_naive();
        let mut open = task("todo");
        open.due_date = today.pred_opt();
        assert!(open.is_overdue(today));

        let mut done = task("completed");
        done.due_date = today.pred_opt();
        assert!(!done.is_overdue(today));
    }
}
