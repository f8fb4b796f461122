use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::normalize_token;

status_enum!(AttendanceStatus {
    Present => "present",
    Late => "late",
    HalfDay => "half-day",
    Absent => "absent",
});

impl AttendanceStatus {
    /// Reads a stored or user-supplied status, accepting the spellings
    /// that show up in older records.
    pub fn normalize(raw: &str) -> Option<Self> {
        match normalize_token(raw).as_str() {
            "present" | "on-time" | "ontime" => Some(Self::Present),
            "late" | "tardy" => Some(Self::Late),
            "half-day" | "halfday" | "half" => Some(Self::HalfDay),
            "absent" | "leave" | "on-leave" => Some(Self::Absent),
            _ => None,
        }
    }

    /// Position in the daily report.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Present => 0,
            Self::Late => 1,
            Self::HalfDay => 2,
            Self::Absent => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attendance {
    pub attendance_id: i64,
    pub employee_id: i64,
    pub work_date: NaiveDate,
    pub check_in: Option<NaiveDateTime>,
    pub check_out: Option<NaiveDateTime>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

pub const ATTENDANCE_SELECT: &str = "
    SELECT a.attendance_id, a.employee_id, a.work_date, a.check_in, a.check_out,
           a.status, a.notes, a.created_at
    FROM Attendance_ a
";

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Present", Some(AttendanceStatus::Present))]
    #[case(" on time ", Some(AttendanceStatus::Present))]
    #[case("LATE", Some(AttendanceStatus::Late))]
    #[case("Half Day", Some(AttendanceStatus::HalfDay))]
    #[case("half_day", Some(AttendanceStatus::HalfDay))]
    #[case("halfday", Some(AttendanceStatus::HalfDay))]
    #[case("leave", Some(AttendanceStatus::Absent))]
    #[case("", None)]
    #[case("remote", None)]
    fn normalizes_stored_statuses(#[case] raw: &str, #[case] expected: Option<AttendanceStatus>) {
        assert_eq!(AttendanceStatus::normalize(raw), expected);
    }
}
