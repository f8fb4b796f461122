use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::client::Client;
use crate::models::project::ProjectListItem;
use crate::routes::validation;

#[derive(Deserialize)]
pub struct CreateClientRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub company_name: String,
    pub phone: Option<String>,
    pub industry: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, PartialEq)]
pub struct NewClient {
    pub full_name: String,
    pub email: String,
    pub company_name: String,
    pub phone: Option<String>,
    pub industry: Option<String>,
    pub address: Option<String>,
}

impl CreateClientRequest {
    pub fn validate(&self) -> Result<NewClient, AppError> {
        let full_name = validation::required("Contact name", &self.full_name)?;
        let email = validation::email(&self.email)?;
        validation::password(&self.password)?;
        let company_name = validation::required("Company name", &self.company_name)?;
        Ok(NewClient {
            full_name,
            email,
            company_name,
            phone: validation::optional(self.phone.as_deref()),
            industry: validation::optional(self.industry.as_deref()),
            address: validation::optional(self.address.as_deref()),
        })
    }
}

#[derive(Deserialize, Default)]
pub struct UpdateClientRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub company_name: Option<String>,
    pub phone: Option<String>,
    pub industry: Option<String>,
    pub address: Option<String>,
}

impl UpdateClientRequest {
    pub fn apply(&self, mut client: Client) -> Result<Client, AppError> {
        if let Some(name) = &self.full_name {
            client.full_name = validation::required("Contact name", name)?;
        }
        if let Some(email) = &self.email {
            client.user_email = validation::email(email)?;
        }
        if let Some(company) = &self.company_name {
            client.company_name = validation::required("Company name", company)?;
        }
        if self.phone.is_some() {
            client.phone = validation::optional(self.phone.as_deref());
        }
        if self.industry.is_some() {
            client.industry = validation::optional(self.industry.as_deref());
        }
        if self.address.is_some() {
            client.address = validation::optional(self.address.as_deref());
        }
        Ok(client)
    }
}

#[derive(Serialize)]
pub struct ClientDetail {
    #[serde(flatten)]
    pub client: Client,
    pub projects: Vec<ProjectListItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn company_name_is_required() {
        let req = CreateClientRequest {
            full_name: "Ken".into(),
            email: "ken@acme.test".into(),
            password: "hunter22".into(),
            company_name: "".into(),
            phone: None,
            industry: Some(" Retail ".into()),
            address: None,
        };
        assert_eq!(req.validate().unwrap_err().to_string(), "Company name is required");
    }

    #[test]
    fn update_clears_optional_fields_with_blank_strings() {
        let now = Utc::now().naive_utc();
        let client = Client {
            client_id: 1,
            client_code: "CLI0001".into(),
            user_id: 2,
            full_name: "Ken".into(),
            user_email: "ken@acme.test".into(),
            company_name: "Acme".into(),
            phone: Some("555".into()),
            industry: Some("Retail".into()),
            address: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let update = UpdateClientRequest {
            phone: Some(" ".into()),
            company_name: Some("Acme Corp".into()),
            ..Default::default()
        };
        let merged = update.apply(client).unwrap();
        assert_eq!(merged.phone, None);
        assert_eq!(merged.company_name, "Acme Corp");
        assert_eq!(merged.industry.as_deref(), Some("Retail"));
    }
}
