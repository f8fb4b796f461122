use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Client profile joined with its user account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub client_id: i64,
    pub client_code: String,
    pub user_id: i64,
    pub full_name: String,
    pub user_email: String,
    pub company_name: String,
    pub phone: Option<String>,
    pub industry: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

pub const CLIENT_SELECT: &str = "
    SELECT c.client_id, c.client_code, c.user_id, u.full_name, u.user_email,
           c.company_name, c.phone, c.industry, c.address,
           c.is_active, c.created_at, c.updated_at
    FROM Clients_ c
    JOIN Users_ u ON c.user_id = u.user_id
";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClientRef {
    pub client_id: i64,
    pub client_code: String,
    pub company_name: String,
    pub full_name: String,
    pub user_email: String,
}

pub const CLIENT_REF_SELECT: &str = "
    SELECT c.client_id, c.client_code, c.company_name, u.full_name, u.user_email
    FROM Clients_ c
    JOIN Users_ u ON c.user_id = u.user_id
";
