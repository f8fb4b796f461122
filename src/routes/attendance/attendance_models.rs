use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::attendance::{Attendance, AttendanceStatus};
use crate::models::employee::EmployeeRef;
use crate::routes::validation;
use crate::services::attendance::{worked_minutes, AttendancePolicy, AttendanceSummary};

pub const DEFAULT_HISTORY_DAYS: i64 = 30;

#[derive(Debug, Default, Deserialize)]
pub struct AttendanceQuery {
    pub date: Option<NaiveDate>,
    pub department: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl AttendanceQuery {
    /// Inclusive date range, defaulting to the last 30 days up to `today`.
    pub fn range(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), AppError> {
        let to = self.to.unwrap_or(today);
        let from = match self.from {
            Some(from) => from,
            None => to
                .checked_sub_signed(Duration::days(DEFAULT_HISTORY_DAYS - 1))
                .ok_or_else(|| AppError::validation(format!("to is out of range: {to}")))?,
        };
        validation::date_order(Some(from), Some(to), "to")?;
        Ok((from, to))
    }

    pub fn department_filter(&self) -> Option<&str> {
        self.department
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// A stored record with its status re-derived and the worked time filled in.
#[derive(Debug, Serialize)]
pub struct AttendanceEntry {
    #[serde(flatten)]
    pub record: Attendance,
    pub worked_minutes: Option<i64>,
}

impl AttendanceEntry {
    pub fn new(mut record: Attendance, policy: &AttendancePolicy) -> Self {
        record.status = policy.classify_record(Some(&record)).to_string();
        Self {
            worked_minutes: worked_minutes(record.check_in, record.check_out),
            record,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttendanceHistory {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub summary: AttendanceSummary,
    pub records: Vec<AttendanceEntry>,
}

impl AttendanceHistory {
    pub fn new(
        from: NaiveDate,
        to: NaiveDate,
        records: Vec<Attendance>,
        policy: &AttendancePolicy,
    ) -> Self {
        let records: Vec<AttendanceEntry> = records
            .into_iter()
            .map(|record| AttendanceEntry::new(record, policy))
            .collect();
        let summary = records
            .iter()
            .filter_map(|entry| AttendanceStatus::normalize(&entry.record.status))
            .collect();
        Self {
            from,
            to,
            summary,
            records,
        }
    }
}

#[derive(Serialize)]
pub struct EmployeeAttendance {
    pub employee: EmployeeRef,
    #[serde(flatten)]
    pub history: AttendanceHistory,
}

#[derive(Debug, Default, Deserialize)]
pub struct CorrectAttendanceRequest {
    pub check_in: Option<NaiveDateTime>,
    pub check_out: Option<NaiveDateTime>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

impl CorrectAttendanceRequest {
    /// Applies the correction and recomputes the stored status.
    pub fn apply(
        &self,
        mut record: Attendance,
        policy: &AttendancePolicy,
    ) -> Result<Attendance, AppError> {
        if let Some(check_in) = self.check_in {
            if check_in.date() != record.work_date {
                return Err(AppError::validation(format!(
                    "Check-in must fall on {}",
                    record.work_date
                )));
            }
            record.check_in = Some(check_in);
        }
        if self.check_out.is_some() {
            record.check_out = self.check_out;
        }
        if let (Some(check_in), Some(check_out)) = (record.check_in, record.check_out) {
            if check_out < check_in {
                return Err(AppError::validation("Check-out cannot be before check-in"));
            }
        }
        if record.check_out.is_some() && record.check_in.is_none() {
            return Err(AppError::validation("Check-out requires a check-in"));
        }
        if let Some(raw) = &self.status {
            let status = AttendanceStatus::normalize(raw)
                .ok_or_else(|| AppError::validation(format!("Invalid attendance status '{}'", raw.trim())))?;
            record.status = status.to_string();
        }
        if self.notes.is_some() {
            record.notes = validation::optional(self.notes.as_deref());
        }
        record.status = policy
            .classify(record.check_in, record.check_out, Some(&record.status))
            .to_string();
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::web;
    use rstest::rstest;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    fn record(check_in: Option<NaiveDateTime>, status: &str) -> Attendance {
        Attendance {
            attendance_id: 1,
            employee_id: 2,
            work_date: day(),
            check_in,
            check_out: None,
            status: status.into(),
            notes: None,
            created_at: at(8, 0),
        }
    }

    #[test]
    fn range_defaults_to_thirty_days() {
        let (from, to) = AttendanceQuery::default().range(day()).unwrap();
        assert_eq!(to, day());
        assert_eq!((to - from).num_days(), 29);
    }

    #[rstest]
    #[case("to=-262143-01-05")]
    #[case("to=-262143-01-01")]
    fn range_rejects_dates_at_the_calendar_edge(#[case] query: &str) {
        let query = web::Query::<AttendanceQuery>::from_query(query).unwrap();
        assert!(query.to.is_some());
        assert!(matches!(query.range(day()), Err(AppError::Validation(_))));
    }

    #[test]
    fn explicit_from_skips_the_default_window() {
        let query = AttendanceQuery {
            from: NaiveDate::from_ymd_opt(-262143, 1, 1),
            to: NaiveDate::from_ymd_opt(-262143, 1, 5),
            ..Default::default()
        };
        let (from, to) = query.range(day()).unwrap();
        assert_eq!((to - from).num_days(), 4);
    }

    #[test]
    fn range_rejects_reversed_dates() {
        let query = AttendanceQuery {
            from: Some(day()),
            to: day().pred_opt(),
            ..Default::default()
        };
        assert!(query.range(day()).is_err());
    }

    #[test]
    fn correction_recomputes_status() {
        let policy = AttendancePolicy::default();
        let fix = CorrectAttendanceRequest {
            check_in: Some(at(8, 45)),
            check_out: Some(at(17, 30)),
            ..Default::default()
        };
        let corrected = fix.apply(record(Some(at(10, 0)), "late"), &policy).unwrap();
        assert_eq!(corrected.status, "present");

        let leave = CorrectAttendanceRequest {
            status: Some("Half Day".into()),
            ..Default::default()
        };
        let corrected = leave.apply(record(None, "absent"), &policy).unwrap();
        assert_eq!(corrected.status, "half-day");
    }

    #[test]
    fn correction_rejects_inverted_times() {
        let fix = CorrectAttendanceRequest {
            check_out: Some(at(8, 0)),
            ..Default::default()
        };
        assert!(fix
            .apply(record(Some(at(9, 0)), "present"), &AttendancePolicy::default())
            .is_err());
    }

    #[test]
    fn correction_keeps_check_in_on_the_work_date() {
        let fix = CorrectAttendanceRequest {
            check_in: day().succ_opt().and_then(|d| d.and_hms_opt(9, 0, 0)),
            ..Default::default()
        };
        assert!(fix
            .apply(record(None, "absent"), &AttendancePolicy::default())
            .is_err());
    }

    #[test]
    fn history_summarizes_reclassified_records() {
        let policy = AttendancePolicy::default();
        let mut late = record(Some(at(9, 40)), "present");
        late.attendance_id = 2;
        let history = AttendanceHistory::new(
            day(),
            day(),
            vec![record(Some(at(8, 50)), "present"), late, record(None, "leave")],
            &policy,
        );
        assert_eq!(history.summary.total, 3);
        assert_eq!(history.summary.present, 1);
        assert_eq!(history.summary.late, 1);
        assert_eq!(history.summary.absent, 1);
        assert_eq!(history.records[2].record.status, "absent");
    }
}
