use std::env;

use chrono::{Duration, NaiveTime};
use thiserror::Error;

use crate::services::attendance::AttendancePolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
    #[error("WORK_START plus LATE_GRACE_MINUTES must stay within the same day")]
    LateCutoffPastMidnight,
}

const MINUTES_PER_DAY: i64 = 24 * 60;
const MAX_REMEMBER_DAYS: i64 = 3650;

/// First admin account, created at startup when no admin exists yet.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    pub max_connections: u32,
    pub session_minutes: i64,
    pub remember_days: i64,
    pub attendance: AttendancePolicy,
    pub id_retry_attempts: u32,
    pub admin_seed: Option<AdminSeed>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let work_start = match lookup("WORK_START") {
            Some(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|_| {
                ConfigError::Invalid {
                    key: "WORK_START",
                    value: raw.clone(),
                }
            })?,
            None => AttendancePolicy::default().work_start,
        };

        let admin_seed = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed {
                email,
                password,
                full_name: lookup("ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
            }),
            _ => None,
        };

        let late_grace_minutes = parse_within(&lookup, "LATE_GRACE_MINUTES", 15, 0, MINUTES_PER_DAY)?;
        let (_, wrapped) = work_start.overflowing_add_signed(Duration::minutes(late_grace_minutes));
        if wrapped != 0 {
            return Err(ConfigError::LateCutoffPastMidnight);
        }

        Ok(Self {
            database_url,
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            session_minutes: parse_within(&lookup, "SESSION_MINUTES", 30, 1, MINUTES_PER_DAY * 30)?,
            remember_days: parse_within(&lookup, "REMEMBER_DAYS", 10, 1, MAX_REMEMBER_DAYS)?,
            attendance: AttendancePolicy {
                work_start,
                late_grace_minutes,
                half_day_minutes: parse_within(&lookup, "HALF_DAY_MINUTES", 240, 0, MINUTES_PER_DAY)?,
            },
            id_retry_attempts: parse_or(&lookup, "ID_RETRY_ATTEMPTS", 5)?,
            admin_seed,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

fn parse_within<F>(lookup: &F, key: &'static str, default: i64, min: i64, max: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, default)?;
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "mysql://x")])).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.session_minutes, 30);
        assert_eq!(config.remember_days, 10);
        assert_eq!(config.id_retry_attempts, 5);
        assert_eq!(config.attendance.work_start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert!(config.admin_seed.is_none());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn invalid_numbers_are_reported_with_their_key() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "mysql://x"),
            ("LATE_GRACE_MINUTES", "soon"),
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "LATE_GRACE_MINUTES has an invalid value: soon");
    }

    #[test]
    fn work_start_and_admin_seed_are_read() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "mysql://x"),
            ("WORK_START", "08:30"),
            ("ADMIN_EMAIL", "root@office.test"),
            ("ADMIN_PASSWORD", "secret1"),
        ]))
        .unwrap();
        assert_eq!(config.attendance.work_start, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        let seed = config.admin_seed.unwrap();
        assert_eq!(seed.email, "root@office.test");
        assert_eq!(seed.full_name, "Administrator");
    }

    #[rstest]
    #[case("23:50", "15")]
    #[case("00:00", "1440")]
    fn late_cutoff_may_not_wrap_past_midnight(#[case] start: &str, #[case] grace: &str) {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "mysql://x"),
            ("WORK_START", start),
            ("LATE_GRACE_MINUTES", grace),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::LateCutoffPastMidnight));
    }

    #[test]
    fn late_cutoff_may_end_just_before_midnight() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "mysql://x"),
            ("WORK_START", "23:30"),
            ("LATE_GRACE_MINUTES", "29"),
        ]))
        .unwrap();
        assert_eq!(config.attendance.late_cutoff(), NaiveTime::from_hms_opt(23, 59, 0).unwrap());
    }

    #[rstest]
    #[case("LATE_GRACE_MINUTES", "-5")]
    #[case("HALF_DAY_MINUTES", "5000")]
    #[case("SESSION_MINUTES", "0")]
    #[case("REMEMBER_DAYS", "9223372036854775807")]
    fn out_of_range_durations_are_rejected(#[case] key: &str, #[case] value: &str) {
        let err = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "mysql://x"), (key, value)]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }), "{key}");
    }
}
