//! Present/late/half-day/absent classification and the daily roll-up.
//!
//! Attendance timestamps are office-local wall-clock times, the same clock
//! `work_start` is expressed in.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::models::attendance::{Attendance, AttendanceStatus};
use crate::models::employee::EmployeeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendancePolicy {
    pub work_start: NaiveTime,
    pub late_grace_minutes: i64,
    pub half_day_minutes: i64,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            work_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            late_grace_minutes: 15,
            half_day_minutes: 240,
        }
    }
}

impl AttendancePolicy {
    /// Latest check-in that still counts as on time.
    pub fn late_cutoff(&self) -> NaiveTime {
        self.work_start + Duration::minutes(self.late_grace_minutes)
    }

    pub fn classify(
        &self,
        check_in: Option<NaiveDateTime>,
        check_out: Option<NaiveDateTime>,
        stored: Option<&str>,
    ) -> AttendanceStatus {
        let Some(check_in) = check_in else {
            return stored
                .and_then(AttendanceStatus::normalize)
                .unwrap_or(AttendanceStatus::Absent);
        };
        if check_in.time() > self.late_cutoff() {
            return AttendanceStatus::Late;
        }
        match worked_minutes(Some(check_in), check_out) {
            Some(minutes) if minutes < self.half_day_minutes => AttendanceStatus::HalfDay,
            _ => AttendanceStatus::Present,
        }
    }

    pub fn classify_record(&self, record: Option<&Attendance>) -> AttendanceStatus {
        match record {
            Some(r) => self.classify(r.check_in, r.check_out, Some(&r.status)),
            None => AttendanceStatus::Absent,
        }
    }
}

pub fn worked_minutes(
    check_in: Option<NaiveDateTime>,
    check_out: Option<NaiveDateTime>,
) -> Option<i64> {
    let minutes = (check_out? - check_in?).num_minutes();
    Some(minutes.max(0))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceSummary {
    pub total: usize,
    pub present: usize,
    pub late: usize,
    pub half_day: usize,
    pub absent: usize,
}

impl AttendanceSummary {
    pub fn add(&mut self, status: AttendanceStatus) {
        self.total += 1;
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::HalfDay => self.half_day += 1,
            AttendanceStatus::Absent => self.absent += 1,
        }
    }
}

impl FromIterator<AttendanceStatus> for AttendanceSummary {
    fn from_iter<I: IntoIterator<Item = AttendanceStatus>>(iter: I) -> Self {
        let mut summary = Self::default();
        for status in iter {
            summary.add(status);
        }
        summary
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyAttendanceRow {
    pub employee_id: i64,
    pub employee_code: String,
    pub full_name: String,
    pub department: String,
    pub attendance_id: Option<i64>,
    pub status: AttendanceStatus,
    pub check_in: Option<NaiveDateTime>,
    pub check_out: Option<NaiveDateTime>,
    pub worked_minutes: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub summary: AttendanceSummary,
    pub records: Vec<DailyAttendanceRow>,
}

/// Joins the roster against one day's records. Employees without a record
/// are absent. Rows come back ordered by status, then check-in time.
pub fn daily_report(
    date: NaiveDate,
    employees: Vec<EmployeeRef>,
    records: Vec<Attendance>,
    policy: &AttendancePolicy,
) -> DailyReport {
    let mut by_employee: HashMap<i64, Attendance> = records
        .into_iter()
        .filter(|r| r.work_date == date)
        .map(|r| (r.employee_id, r))
        .collect();

    let mut rows: Vec<DailyAttendanceRow> = employees
        .into_iter()
        .map(|employee| {
            let record = by_employee.remove(&employee.employee_id);
            let status = policy.classify_record(record.as_ref());
            DailyAttendanceRow {
                employee_id: employee.employee_id,
                employee_code: employee.employee_code,
                full_name: employee.full_name,
                department: employee.department,
                attendance_id: record.as_ref().map(|r| r.attendance_id),
                status,
                check_in: record.as_ref().and_then(|r| r.check_in),
                check_out: record.as_ref().and_then(|r| r.check_out),
                worked_minutes: record
                    .as_ref()
                    .and_then(|r| worked_minutes(r.check_in, r.check_out)),
                notes: record.and_then(|r| r.notes),
            }
        })
        .collect();

    rows.sort_by(report_order);
    let summary = rows.iter().map(|row| row.status).collect();

    DailyReport {
        date,
        summary,
        records: rows,
    }
}

fn report_order(a: &DailyAttendanceRow, b: &DailyAttendanceRow) -> Ordering {
    a.status
        .rank()
        .cmp(&b.status.rank())
        .then_with(|| match (a.check_in, b.check_in) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.employee_code.cmp(&b.employee_code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    fn employee(id: i64, code: &str) -> EmployeeRef {
        EmployeeRef {
            employee_id: id,
            employee_code: code.to_string(),
            full_name: format!("Employee {id}"),
            user_email: format!("e{id}@office.test"),
            department: "Engineering".to_string(),
        }
    }

    fn record(
        id: i64,
        employee_id: i64,
        check_in: Option<NaiveDateTime>,
        check_out: Option<NaiveDateTime>,
    ) -> Attendance {
        Attendance {
            attendance_id: id,
            employee_id,
            work_date: day(),
            check_in,
            check_out,
            status: String::new(),
            notes: None,
            created_at: at(8, 0),
        }
    }

    #[rstest]
    #[case(Some((8, 55)), Some((17, 0)), AttendanceStatus::Present)]
    #[case(Some((9, 15)), None, AttendanceStatus::Present)]
    #[case(Some((9, 16)), Some((18, 0)), AttendanceStatus::Late)]
    #[case(Some((9, 0)), Some((12, 59)), AttendanceStatus::HalfDay)]
    #[case(Some((9, 0)), Some((13, 0)), AttendanceStatus::Present)]
    #[case(None, None, AttendanceStatus::Absent)]
    fn classifies_against_thresholds(
        #[case] check_in: Option<(u32, u32)>,
        #[case] check_out: Option<(u32, u32)>,
        #[case] expected: AttendanceStatus,
    ) {
        let policy = AttendancePolicy::default();
        let status = policy.classify(
            check_in.map(|(h, m)| at(h, m)),
            check_out.map(|(h, m)| at(h, m)),
            None,
        );
        assert_eq!(status, expected);
    }

    #[test]
    fn stored_status_is_used_only_without_check_in() {
        let policy = AttendancePolicy::default();
        assert_eq!(
            policy.classify(None, None, Some("Half Day")),
            AttendanceStatus::HalfDay
        );
        assert_eq!(policy.classify(None, None, Some("???")), AttendanceStatus::Absent);
        assert_eq!(
            policy.classify(Some(at(10, 0)), None, Some("present")),
            AttendanceStatus::Late
        );
    }

    #[test]
    fn worked_minutes_never_goes_negative() {
        assert_eq!(worked_minutes(Some(at(9, 0)), Some(at(17, 30))), Some(510));
        assert_eq!(worked_minutes(Some(at(9, 0)), Some(at(8, 0))), Some(0));
        assert_eq!(worked_minutes(Some(at(9, 0)), None), None);
    }

    #[test]
    fn report_orders_by_status_then_check_in() {
        let employees = vec![
            employee(1, "EMP0001"),
            employee(2, "EMP0002"),
            employee(3, "EMP0003"),
            employee(4, "EMP0004"),
            employee(5, "EMP0005"),
        ];
        let records = vec![
            record(10, 1, Some(at(9, 40)), None),
            record(11, 2, Some(at(8, 50)), Some(at(17, 0))),
            record(12, 3, Some(at(8, 30)), Some(at(17, 0))),
            record(13, 5, Some(at(9, 0)), Some(at(11, 0))),
        ];

        let report = daily_report(day(), employees, records, &AttendancePolicy::default());

        let order: Vec<(&str, AttendanceStatus)> = report
            .records
            .iter()
            .map(|r| (r.employee_code.as_str(), r.status))
            .collect();
        assert_eq!(
            order,
            vec![
                ("EMP0003", AttendanceStatus::Present),
                ("EMP0002", AttendanceStatus::Present),
                ("EMP0001", AttendanceStatus::Late),
                ("EMP0005", AttendanceStatus::HalfDay),
                ("EMP0004", AttendanceStatus::Absent),
            ]
        );
        assert_eq!(
            report.summary,
            AttendanceSummary {
                total: 5,
                present: 2,
                late: 1,
                half_day: 1,
                absent: 1,
            }
        );
        assert_eq!(report.records[3].worked_minutes, Some(120));
        assert_eq!(report.records[4].attendance_id, None);
    }

    #[test]
    fn records_from_other_days_are_ignored() {
        let mut stray = record(20, 1, Some(at(8, 0)), None);
        stray.work_date = day().pred_opt().unwrap();
        let report = daily_report(
            day(),
            vec![employee(1, "EMP0001")],
            vec![stray],
            &AttendancePolicy::default(),
        );
        assert_eq!(report.records[0].status, AttendanceStatus::Absent);
    }
}
