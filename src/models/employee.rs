use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

status_enum!(EmployeeStatus {
    Active => "active",
    OnLeave => "on-leave",
    Terminated => "terminated",
});

/// Employee profile joined with its user account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Employee {
    pub employee_id: i64,
    pub employee_code: String,
    pub user_id: i64,
    pub full_name: String,
    pub user_email: String,
    pub department: String,
    pub designation: Option<String>,
    pub phone: Option<String>,
    pub joining_date: Option<NaiveDate>,
    pub status: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

pub const EMPLOYEE_SELECT: &str = "
    SELECT e.employee_id, e.employee_code, e.user_id, u.full_name, u.user_email,
           e.department, e.designation, e.phone, e.joining_date, e.status,
           e.is_active, e.created_at, e.updated_at
    FROM Employees_ e
    JOIN Users_ u ON e.user_id = u.user_id
";

/// Minimal employee reference used when populating projects and tasks.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmployeeRef {
    pub employee_id: i64,
    pub employee_code: String,
    pub full_name: String,
    pub user_email: String,
    pub department: String,
}

pub const EMPLOYEE_REF_SELECT: &str = "
    SELECT e.employee_id, e.employee_code, u.full_name, u.user_email, e.department
    FROM Employees_ e
    JOIN Users_ u ON e.user_id = u.user_id
";
