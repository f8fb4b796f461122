use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::services::attendance::AttendanceSummary;
use crate::services::dashboard::{Activity, ActivityItem};

pub const RECENT_ACTIVITY_DAYS: i64 = 7;
pub const RECENT_ACTIVITY_LIMIT: usize = 10;

#[derive(Debug, Default, Serialize)]
pub struct EntityCounts {
    pub employees: i64,
    pub clients: i64,
    pub projects: i64,
    pub open_tasks: i64,
}

#[derive(Serialize)]
pub struct AdminDashboard {
    pub counts: EntityCounts,
    pub projects_by_status: BTreeMap<String, i64>,
    pub tasks_by_status: BTreeMap<String, i64>,
    pub overdue_tasks: i64,
    pub attendance_today: AttendanceSummary,
    pub recent_activity: Vec<ActivityItem>,
}

/// `(id, title, detail, created_at)` as read for the activity feed.
pub type ActivityRow = (i64, String, String, NaiveDateTime);

pub fn activities(kind: &'static str, rows: Vec<ActivityRow>) -> impl Iterator<Item = Activity> {
    rows.into_iter().map(move |(entity_id, title, detail, at)| Activity {
        kind,
        entity_id,
        title,
        detail,
        at,
    })
}

pub fn feedback_activity(
    rows: Vec<(i64, String, String, i32, NaiveDateTime)>,
) -> impl Iterator<Item = Activity> {
    rows.into_iter()
        .map(|(feedback_id, project_name, company_name, rating, at)| Activity {
            kind: "feedback",
            entity_id: feedback_id,
            title: project_name,
            detail: format!("{company_name} rated {rating}/5"),
            at,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn feedback_rows_describe_the_rating() {
        let at = Utc::now().naive_utc();
        let items: Vec<Activity> =
            feedback_activity(vec![(3, "Portal".into(), "Acme".into(), 4, at)]).collect();
        assert_eq!(items[0].kind, "feedback");
        assert_eq!(items[0].title, "Portal");
        assert_eq!(items[0].detail, "Acme rated 4/5");
    }

    #[test]
    fn rows_keep_their_kind() {
        let at = Utc::now().naive_utc();
        let items: Vec<Activity> = activities(
            "task",
            vec![(1, "Draft".into(), "Dana".into(), at), (2, "Review".into(), "Lee".into(), at)],
        )
        .collect();
        assert!(items.iter().all(|a| a.kind == "task"));
        assert_eq!(items[1].entity_id, 2);
    }
}
