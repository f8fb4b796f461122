use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::admin::Admin;
use crate::models::client::Client;
use crate::models::employee::Employee;
use crate::models::user::UserSummary;

// Login request and response
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub expires_at: NaiveDateTime,
    pub user: UserSummary,
}

// Current user
#[derive(Serialize)]
pub struct MeResponse {
    pub user: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<Admin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee: Option<Employee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<Client>,
}

// Password change
#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}
