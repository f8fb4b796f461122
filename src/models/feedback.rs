use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Feedback {
    pub feedback_id: i64,
    pub project_id: i64,
    pub project_name: String,
    pub client_id: i64,
    pub company_name: String,
    pub rating: i32,
    pub message: String,
    pub created_at: NaiveDateTime,
}

pub const FEEDBACK_SELECT: &str = "
    SELECT f.feedback_id, f.project_id, p.name AS project_name, f.client_id,
           c.company_name, f.rating, f.message, f.created_at
    FROM Feedback_ f
    JOIN Projects_ p ON f.project_id = p.project_id
    JOIN Clients_ c ON f.client_id = c.client_id
";
