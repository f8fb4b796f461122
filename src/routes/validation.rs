//! Request-body checks shared by the create/update handlers.

use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Trimmed value of a required text field.
pub fn required(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Trimmed value of an optional text field; blank becomes `None`.
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn email(value: &str) -> Result<String, AppError> {
    let value = required("Email", value)?.to_ascii_lowercase();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && domain.contains('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AppError::validation("Email is not valid"));
    }
    Ok(value)
}

pub fn password(value: &str) -> Result<(), AppError> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Parses a status-like field, naming the field in the error.
pub fn parse_enum<T>(field: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>()
        .map_err(|e| AppError::validation(format!("{field} '{}' is not valid, {e}", raw.trim())))
}

pub fn parse_optional_enum<T>(field: &str, raw: Option<&str>) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match optional(raw) {
        Some(value) => parse_enum(field, &value).map(Some),
        None => Ok(None),
    }
}

pub fn date_order(start: Option<NaiveDate>, end: Option<NaiveDate>, end_field: &str) -> Result<(), AppError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(AppError::validation(format!(
            "{end_field} cannot be before the start date"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::TaskStatus;
    use rstest::rstest;

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("Name", "  Ada ").unwrap(), "Ada");
        let err = required("Name", "   ").unwrap_err();
        assert_eq!(err.to_string(), "Name is required");
    }

    #[rstest]
    #[case("Ada@Example.com", true)]
    #[case("a.b@mail.co.uk", true)]
    #[case("no-at-sign.com", false)]
    #[case("@example.com", false)]
    #[case("ada@localhost", false)]
    #[case("ada@.com", false)]
    #[case("ada lovelace@example.com", false)]
    fn validates_emails(#[case] raw: &str, #[case] ok: bool) {
        assert_eq!(email(raw).is_ok(), ok);
    }

    #[test]
    fn emails_are_lowercased() {
        assert_eq!(email(" Ada@Example.COM ").unwrap(), "ada@example.com");
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(password("12345").is_err());
        assert!(password("123456").is_ok());
    }

    #[test]
    fn enum_fields_name_the_offending_value() {
        let parsed: TaskStatus = parse_enum("Status", "In Progress").unwrap();
        assert_eq!(parsed, TaskStatus::InProgress);
        let err = parse_enum::<TaskStatus>("Status", "blocked").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Status 'blocked' is not valid, expected one of todo, in-progress, review, completed"
        );
        assert_eq!(parse_optional_enum::<TaskStatus>("Status", Some("  ")).unwrap(), None);
    }

    #[test]
    fn end_dates_cannot_precede_start() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        assert!(date_order(Some(d(5)), Some(d(4)), "Deadline").is_err());
        assert!(date_order(Some(d(5)), Some(d(5)), "Deadline").is_ok());
        assert!(date_order(None, Some(d(1)), "Deadline").is_ok());
    }
}
