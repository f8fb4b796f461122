use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Admin {
    pub admin_id: i64,
    pub user_id: i64,
    pub title: String,
}
