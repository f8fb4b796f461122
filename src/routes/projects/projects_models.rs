use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::client::ClientRef;
use crate::models::employee::EmployeeRef;
use crate::models::project::{Project, ProjectStatus};
use crate::models::Priority;
use crate::routes::validation;

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    pub client_id: i64,
    pub manager_id: Option<i64>,
    #[serde(default)]
    pub team: Vec<i64>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub progress: Option<i32>,
}

#[derive(Debug, PartialEq)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub client_id: i64,
    pub manager_id: Option<i64>,
    pub team: Vec<i64>,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub start_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub progress: i32,
}

fn check_progress(progress: i32) -> Result<i32, AppError> {
    if (0..=100).contains(&progress) {
        Ok(progress)
    } else {
        Err(AppError::validation("Progress must be between 0 and 100"))
    }
}

/// Sorted, duplicate-free team member ids.
pub fn normalize_team(team: &[i64]) -> Vec<i64> {
    let mut team = team.to_vec();
    team.sort_unstable();
    team.dedup();
    team
}

impl CreateProjectRequest {
    pub fn validate(&self) -> Result<NewProject, AppError> {
        let name = validation::required("Project name", &self.name)?;
        validation::date_order(self.start_date, self.deadline, "Deadline")?;
        let status = validation::parse_optional_enum("Status", self.status.as_deref())?
            .unwrap_or(ProjectStatus::Planning);
        let priority = validation::parse_optional_enum("Priority", self.priority.as_deref())?
            .unwrap_or(Priority::Medium);
        let progress = match status {
            ProjectStatus::Completed => 100,
            _ => check_progress(self.progress.unwrap_or(0))?,
        };
        Ok(NewProject {
            name,
            description: validation::optional(self.description.as_deref()),
            client_id: self.client_id,
            manager_id: self.manager_id,
            team: normalize_team(&self.team),
            status,
            priority,
            start_date: self.start_date,
            deadline: self.deadline,
            progress,
        })
    }
}

#[derive(Deserialize, Default)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub client_id: Option<i64>,
    pub manager_id: Option<i64>,
    pub team: Option<Vec<i64>>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub progress: Option<i32>,
}

impl UpdateProjectRequest {
    pub fn apply(&self, mut project: Project) -> Result<Project, AppError> {
        if let Some(name) = &self.name {
            project.name = validation::required("Project name", name)?;
        }
        if self.description.is_some() {
            project.description = validation::optional(self.description.as_deref());
        }
        if let Some(client_id) = self.client_id {
            project.client_id = client_id;
        }
        if self.manager_id.is_some() {
            project.manager_id = self.manager_id;
        }
        if let Some(priority) = &self.priority {
            let priority: Priority = validation::parse_enum("Priority", priority)?;
            project.priority = priority.to_string();
        }
        if self.start_date.is_some() {
            project.start_date = self.start_date;
        }
        if self.deadline.is_some() {
            project.deadline = self.deadline;
        }
        validation::date_order(project.start_date, project.deadline, "Deadline")?;
        if let Some(progress) = self.progress {
            project.progress = check_progress(progress)?;
        }
        if let Some(status) = &self.status {
            let status: ProjectStatus = validation::parse_enum("Status", status)?;
            project.status = status.to_string();
            if status == ProjectStatus::Completed {
                project.progress = 100;
            }
        }
        Ok(project)
    }
}

#[derive(Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub client: ClientRef,
    pub manager: Option<EmployeeRef>,
    pub team: Vec<EmployeeRef>,
    pub tasks_by_status: BTreeMap<String, i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn create() -> CreateProjectRequest {
        CreateProjectRequest {
            name: "Website".into(),
            description: None,
            client_id: 1,
            manager_id: Some(2),
            team: vec![5, 3, 5],
            status: None,
            priority: Some("HIGH".into()),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 10),
            deadline: NaiveDate::from_ymd_opt(2024, 3, 1),
            progress: None,
        }
    }

    fn stored() -> Project {
        let now = Utc::now().naive_utc();
        Project {
            project_id: 1,
            project_code: "PRJ0001".into(),
            name: "Website".into(),
            description: None,
            client_id: 1,
            manager_id: None,
            status: "in-progress".into(),
            priority: "medium".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 10),
            deadline: None,
            progress: 40,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn create_applies_defaults_and_dedups_team() {
        let project = create().validate().unwrap();
        assert_eq!(project.status, ProjectStatus::Planning);
        assert_eq!(project.priority, Priority::High);
        assert_eq!(project.team, vec![3, 5]);
        assert_eq!(project.progress, 0);
    }

    #[test]
    fn deadline_before_start_is_rejected() {
        let mut req = create();
        req.deadline = NaiveDate::from_ymd_opt(2023, 12, 31);
        assert!(req.validate().is_err());
    }

    #[test]
    fn progress_out_of_range_is_rejected() {
        let mut req = create();
        req.progress = Some(101);
        assert!(req.validate().is_err());
    }

    #[test]
    fn completing_a_project_sets_full_progress() {
        let update = UpdateProjectRequest {
            status: Some("completed".into()),
            ..Default::default()
        };
        let project = update.apply(stored()).unwrap();
        assert_eq!(project.status, "completed");
        assert_eq!(project.progress, 100);
    }

    #[test]
    fn update_checks_deadline_against_stored_start() {
        let update = UpdateProjectRequest {
            deadline: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..Default::default()
        };
        assert!(update.apply(stored()).is_err());
    }
}
