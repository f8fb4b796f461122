use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;
use crate::models::employee::{Employee, EmployeeStatus};
use crate::routes::validation;

#[derive(Deserialize)]
pub struct CreateEmployeeRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub department: String,
    pub designation: Option<String>,
    pub phone: Option<String>,
    pub joining_date: Option<NaiveDate>,
    pub status: Option<String>,
}

/// A create request after trimming and checking.
#[derive(Debug, PartialEq)]
pub struct NewEmployee {
    pub full_name: String,
    pub email: String,
    pub department: String,
    pub designation: Option<String>,
    pub phone: Option<String>,
    pub joining_date: Option<NaiveDate>,
    pub status: EmployeeStatus,
}

impl CreateEmployeeRequest {
    pub fn validate(&self) -> Result<NewEmployee, AppError> {
        let full_name = validation::required("Full name", &self.full_name)?;
        let email = validation::email(&self.email)?;
        validation::password(&self.password)?;
        let department = validation::required("Department", &self.department)?;
        let status = validation::parse_optional_enum("Status", self.status.as_deref())?
            .unwrap_or(EmployeeStatus::Active);
        Ok(NewEmployee {
            full_name,
            email,
            department,
            designation: validation::optional(self.designation.as_deref()),
            phone: validation::optional(self.phone.as_deref()),
            joining_date: self.joining_date,
            status,
        })
    }
}

#[derive(Deserialize, Default)]
pub struct UpdateEmployeeRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub phone: Option<String>,
    pub joining_date: Option<NaiveDate>,
    pub status: Option<String>,
}

impl UpdateEmployeeRequest {
    /// Applies the given fields on top of the stored employee.
    pub fn apply(&self, mut employee: Employee) -> Result<Employee, AppError> {
        if let Some(name) = &self.full_name {
            employee.full_name = validation::required("Full name", name)?;
        }
        if let Some(email) = &self.email {
            employee.user_email = validation::email(email)?;
        }
        if let Some(department) = &self.department {
            employee.department = validation::required("Department", department)?;
        }
        if self.designation.is_some() {
            employee.designation = validation::optional(self.designation.as_deref());
        }
        if self.phone.is_some() {
            employee.phone = validation::optional(self.phone.as_deref());
        }
        if self.joining_date.is_some() {
            employee.joining_date = self.joining_date;
        }
        if let Some(status) = &self.status {
            let status: EmployeeStatus = validation::parse_enum("Status", status)?;
            employee.status = status.to_string();
        }
        Ok(employee)
    }
}

/// A project the employee manages or works on.
#[derive(Debug, Serialize, FromRow)]
pub struct EmployeeProject {
    pub project_id: i64,
    pub project_code: String,
    pub name: String,
    pub status: String,
    pub role: String,
}

#[derive(Serialize)]
pub struct EmployeeDetail {
    #[serde(flatten)]
    pub employee: Employee,
    pub projects: Vec<EmployeeProject>,
    pub open_tasks: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn request() -> CreateEmployeeRequest {
        CreateEmployeeRequest {
            full_name: " Grace Hopper ".into(),
            email: "Grace@Office.test".into(),
            password: "cobol1959".into(),
            department: "Engineering".into(),
            designation: Some("  ".into()),
            phone: Some("555-0100".into()),
            joining_date: None,
            status: None,
        }
    }

    fn stored() -> Employee {
        let now = Utc::now().naive_utc();
        Employee {
            employee_id: 3,
            employee_code: "EMP0003".into(),
            user_id: 8,
            full_name: "Grace Hopper".into(),
            user_email: "grace@office.test".into(),
            department: "Engineering".into(),
            designation: Some("Engineer".into()),
            phone: None,
            joining_date: None,
            status: "active".into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn create_normalizes_fields() {
        let valid = request().validate().unwrap();
        assert_eq!(valid.full_name, "Grace Hopper");
        assert_eq!(valid.email, "grace@office.test");
        assert_eq!(valid.designation, None);
        assert_eq!(valid.status, EmployeeStatus::Active);
    }

    #[test]
    fn create_requires_department_and_password() {
        let mut missing_department = request();
        missing_department.department = " ".into();
        assert_eq!(
            missing_department.validate().unwrap_err().to_string(),
            "Department is required"
        );

        let mut short_password = request();
        short_password.password = "abc".into();
        assert!(short_password.validate().is_err());
    }

    #[test]
    fn create_rejects_unknown_status() {
        let mut req = request();
        req.status = Some("retired".into());
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_only_touches_given_fields() {
        let update = UpdateEmployeeRequest {
            status: Some("On Leave".into()),
            designation: Some(String::new()),
            ..Default::default()
        };
        let merged = update.apply(stored()).unwrap();
        assert_eq!(merged.status, "on-leave");
        assert_eq!(merged.designation, None);
        assert_eq!(merged.department, "Engineering");
        assert_eq!(merged.full_name, "Grace Hopper");
    }

    #[test]
    fn update_rejects_blank_name() {
        let update = UpdateEmployeeRequest {
            full_name: Some("   ".into()),
            ..Default::default()
        };
        assert!(update.apply(stored()).is_err());
    }
}
