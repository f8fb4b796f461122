use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub session_id: String,
    pub user_id: i64,
    pub expires_at: NaiveDateTime,
    pub is_persistent: bool,
    pub created_at: NaiveDateTime,
}
