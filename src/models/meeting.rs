use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

status_enum!(MeetingStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Meeting {
    pub meeting_id: i64,
    pub title: String,
    pub agenda: Option<String>,
    pub scheduled_at: NaiveDateTime,
    pub duration_minutes: i32,
    pub location: Option<String>,
    pub organizer_id: i64,
    pub organizer_name: String,
    pub status: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

pub const MEETING_SELECT: &str = "
    SELECT m.meeting_id, m.title, m.agenda, m.scheduled_at, m.duration_minutes,
           m.location, m.organizer_id, o.full_name AS organizer_name, m.status,
           m.is_active, m.created_at, m.updated_at
    FROM Meetings_ m
    JOIN Users_ o ON m.organizer_id = o.user_id
";
