use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::attendance::Attendance;
use crate::models::meeting::Meeting;
use crate::routes::attendance::attendance_models::AttendanceEntry;
use crate::routes::validation;
use crate::services::attendance::AttendancePolicy;

pub const DASHBOARD_MEETINGS: i64 = 5;
pub const UPCOMING_MEETINGS: i64 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct AttendanceNoteRequest {
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct EmployeeDashboard {
    pub tasks_by_status: BTreeMap<String, i64>,
    pub overdue_tasks: i64,
    pub projects: i64,
    pub today: NaiveDate,
    pub attendance_status: String,
    pub attendance_today: Option<AttendanceEntry>,
    pub upcoming_meetings: Vec<Meeting>,
}

/// First mark of the day. A record for `now`'s date already existing is a 409.
pub fn check_in(
    existing: Option<&Attendance>,
    now: NaiveDateTime,
    notes: Option<&str>,
    policy: &AttendancePolicy,
) -> Result<NewCheckIn, AppError> {
    if existing.is_some() {
        return Err(AppError::conflict("You have already checked in today"));
    }
    Ok(NewCheckIn {
        work_date: now.date(),
        check_in: now,
        status: policy.classify(Some(now), None, None).to_string(),
        notes: validation::optional(notes),
    })
}

#[derive(Debug, PartialEq)]
pub struct NewCheckIn {
    pub work_date: NaiveDate,
    pub check_in: NaiveDateTime,
    pub status: String,
    pub notes: Option<String>,
}

/// Closes today's record and recomputes its status.
pub fn check_out(
    existing: Option<Attendance>,
    now: NaiveDateTime,
    notes: Option<&str>,
    policy: &AttendancePolicy,
) -> Result<Attendance, AppError> {
    let mut record = existing
        .filter(|r| r.check_in.is_some())
        .ok_or_else(|| AppError::validation("You have not checked in today"))?;
    if record.check_out.is_some() {
        return Err(AppError::validation("You have already checked out today"));
    }
    record.check_out = Some(now);
    if let Some(notes) = validation::optional(notes) {
        record.notes = Some(notes);
    }
    record.status = policy
        .classify(record.check_in, record.check_out, Some(&record.status))
        .to_string();
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn checked_in(h: u32, m: u32) -> Attendance {
        Attendance {
            attendance_id: 8,
            employee_id: 3,
            work_date: at(0, 0).date(),
            check_in: Some(at(h, m)),
            check_out: None,
            status: "present".into(),
            notes: None,
            created_at: at(h, m),
        }
    }

    #[test]
    fn second_check_in_is_a_conflict() {
        let policy = AttendancePolicy::default();
        let existing = checked_in(9, 0);
        let err = check_in(Some(&existing), at(9, 5), None, &policy).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn late_check_in_is_marked_late() {
        let policy = AttendancePolicy::default();
        let mark = check_in(None, at(9, 30), Some(" traffic "), &policy).unwrap();
        assert_eq!(mark.status, "late");
        assert_eq!(mark.work_date, at(0, 0).date());
        assert_eq!(mark.notes.as_deref(), Some("traffic"));
    }

    #[test]
    fn check_out_needs_a_check_in() {
        let policy = AttendancePolicy::default();
        assert!(matches!(
            check_out(None, at(17, 0), None, &policy),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn check_out_only_once() {
        let policy = AttendancePolicy::default();
        let mut done = checked_in(9, 0);
        done.check_out = Some(at(17, 0));
        assert!(check_out(Some(done), at(18, 0), None, &policy).is_err());
    }

    #[test]
    fn short_day_becomes_half_day() {
        let policy = AttendancePolicy::default();
        let record = check_out(Some(checked_in(9, 0)), at(12, 0), None, &policy).unwrap();
        assert_eq!(record.check_out, Some(at(12, 0)));
        assert_eq!(record.status, "half-day");

        let record = check_out(Some(checked_in(9, 0)), at(17, 0), None, &policy).unwrap();
        assert_eq!(record.status, "present");
    }
}
