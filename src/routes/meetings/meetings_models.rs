use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;
use crate::models::meeting::{Meeting, MeetingStatus};
use crate::models::user::{Role, UserSummary};
use crate::routes::projects::projects_models::normalize_team;
use crate::routes::validation;
use crate::services::notifications::Room;

pub const DEFAULT_DURATION_MINUTES: i32 = 30;
pub const MAX_DURATION_MINUTES: i32 = 24 * 60;

#[derive(Deserialize)]
pub struct CreateMeetingRequest {
    pub title: String,
    pub agenda: Option<String>,
    pub scheduled_at: Option<NaiveDateTime>,
    pub duration_minutes: Option<i32>,
    pub location: Option<String>,
    #[serde(default)]
    pub participants: Vec<i64>,
}

#[derive(Debug, PartialEq)]
pub struct NewMeeting {
    pub title: String,
    pub agenda: Option<String>,
    pub scheduled_at: NaiveDateTime,
    pub duration_minutes: i32,
    pub location: Option<String>,
    pub participants: Vec<i64>,
}

fn duration(minutes: i32) -> Result<i32, AppError> {
    if (1..=MAX_DURATION_MINUTES).contains(&minutes) {
        Ok(minutes)
    } else {
        Err(AppError::validation(format!(
            "Duration must be between 1 and {MAX_DURATION_MINUTES} minutes"
        )))
    }
}

impl CreateMeetingRequest {
    pub fn validate(&self) -> Result<NewMeeting, AppError> {
        let scheduled_at = self
            .scheduled_at
            .ok_or_else(|| AppError::validation("Scheduled time is required"))?;
        Ok(NewMeeting {
            title: validation::required("Title", &self.title)?,
            agenda: validation::optional(self.agenda.as_deref()),
            scheduled_at,
            duration_minutes: duration(self.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES))?,
            location: validation::optional(self.location.as_deref()),
            participants: normalize_team(&self.participants),
        })
    }
}

#[derive(Deserialize, Default)]
pub struct UpdateMeetingRequest {
    pub title: Option<String>,
    pub agenda: Option<String>,
    pub scheduled_at: Option<NaiveDateTime>,
    pub duration_minutes: Option<i32>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub participants: Option<Vec<i64>>,
}

impl UpdateMeetingRequest {
    pub fn apply(&self, mut meeting: Meeting) -> Result<Meeting, AppError> {
        if let Some(title) = &self.title {
            meeting.title = validation::required("Title", title)?;
        }
        if self.agenda.is_some() {
            meeting.agenda = validation::optional(self.agenda.as_deref());
        }
        if let Some(scheduled_at) = self.scheduled_at {
            meeting.scheduled_at = scheduled_at;
        }
        if let Some(minutes) = self.duration_minutes {
            meeting.duration_minutes = duration(minutes)?;
        }
        if self.location.is_some() {
            meeting.location = validation::optional(self.location.as_deref());
        }
        if let Some(status) = &self.status {
            let status: MeetingStatus = validation::parse_enum("Status", status)?;
            meeting.status = status.to_string();
        }
        Ok(meeting)
    }

    pub fn participants(&self) -> Option<Vec<i64>> {
        self.participants.as_deref().map(normalize_team)
    }
}

#[derive(Serialize)]
pub struct MeetingDetail {
    #[serde(flatten)]
    pub meeting: Meeting,
    pub participants: Vec<UserSummary>,
}

/// A participant's account with the profile ids needed to address them.
#[derive(Debug, FromRow)]
pub struct ParticipantProfile {
    pub role: String,
    pub employee_id: Option<i64>,
    pub client_id: Option<i64>,
}

impl ParticipantProfile {
    pub fn room(&self) -> Option<Room> {
        match self.role.parse::<Role>().ok()? {
            Role::Admin => Some(Room::Admin),
            Role::Employee => self.employee_id.map(Room::Employee),
            Role::Client => self.client_id.map(Room::Client),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn request() -> CreateMeetingRequest {
        CreateMeetingRequest {
            title: "Kickoff".into(),
            agenda: Some("  ".into()),
            scheduled_at: Some(Utc::now().naive_utc()),
            duration_minutes: None,
            location: None,
            participants: vec![5, 3, 5],
        }
    }

    fn profile(role: &str, employee_id: Option<i64>, client_id: Option<i64>) -> ParticipantProfile {
        ParticipantProfile {
            role: role.into(),
            employee_id,
            client_id,
        }
    }

    #[test]
    fn create_fills_defaults_and_dedups_participants() {
        let meeting = request().validate().unwrap();
        assert_eq!(meeting.duration_minutes, DEFAULT_DURATION_MINUTES);
        assert_eq!(meeting.agenda, None);
        assert_eq!(meeting.participants, vec![3, 5]);
    }

    #[test]
    fn create_requires_a_time() {
        let mut req = request();
        req.scheduled_at = None;
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn create_rejects_zero_duration() {
        let mut req = request();
        req.duration_minutes = Some(0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn participants_are_addressed_by_role() {
        assert_eq!(profile("admin", None, None).room(), Some(Room::Admin));
        assert_eq!(profile("employee", Some(4), None).room(), Some(Room::Employee(4)));
        assert_eq!(profile("client", None, Some(9)).room(), Some(Room::Client(9)));
        assert_eq!(profile("employee", None, None).room(), None);
    }
}
