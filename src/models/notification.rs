use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub notification_id: i64,
    pub room: String,
    pub event: String,
    pub message: String,
    pub payload: String,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}
