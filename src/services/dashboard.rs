use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityBucket {
    Today,
    Yesterday,
    ThisWeek,
    Earlier,
}

impl ActivityBucket {
    pub fn of(now: NaiveDateTime, at: NaiveDateTime) -> Self {
        let days = (now.date() - at.date()).num_days();
        match days {
            d if d <= 0 => Self::Today,
            1 => Self::Yesterday,
            d if d < 7 => Self::ThisWeek,
            _ => Self::Earlier,
        }
    }
}

pub fn time_ago(now: NaiveDateTime, at: NaiveDateTime) -> String {
    let elapsed = now - at;
    if elapsed < Duration::minutes(1) {
        return "just now".to_string();
    }
    let (amount, unit) = if elapsed < Duration::hours(1) {
        (elapsed.num_minutes(), "minute")
    } else if elapsed < Duration::days(1) {
        (elapsed.num_hours(), "hour")
    } else {
        (elapsed.num_days(), "day")
    };
    if amount == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{amount} {unit}s ago")
    }
}

/// Something that happened, before it is labelled for the feed.
#[derive(Debug, Clone)]
pub struct Activity {
    pub kind: &'static str,
    pub entity_id: i64,
    pub title: String,
    pub detail: String,
    pub at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityItem {
    pub kind: &'static str,
    pub entity_id: i64,
    pub title: String,
    pub detail: String,
    pub at: NaiveDateTime,
    pub bucket: ActivityBucket,
    pub time_ago: String,
}

/// Newest-first feed of at most `limit` entries.
pub fn recent_activity(
    mut activities: Vec<Activity>,
    now: NaiveDateTime,
    limit: usize,
) -> Vec<ActivityItem> {
    activities.sort_by(|a, b| b.at.cmp(&a.at).then_with(|| a.kind.cmp(b.kind)));
    activities
        .into_iter()
        .take(limit)
        .map(|a| ActivityItem {
            bucket: ActivityBucket::of(now, a.at),
            time_ago: time_ago(now, a.at),
            kind: a.kind,
            entity_id: a.entity_id,
            title: a.title,
            detail: a.detail,
            at: a.at,
        })
        .collect()
}

/// Counts per status, with every known status present (zero if unused).
pub fn count_by<'a, I>(statuses: I, known: &[&'static str]) -> BTreeMap<String, i64>
where
    I: IntoIterator<Item = (&'a str, i64)>,
{
    let mut counts: BTreeMap<String, i64> = known.iter().map(|s| (s.to_string(), 0)).collect();
    for (status, count) in statuses {
        *counts.entry(status.to_string()).or_insert(0) += count;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[rstest]
    #[case(Duration::seconds(30), "just now")]
    #[case(Duration::minutes(1), "1 minute ago")]
    #[case(Duration::minutes(59), "59 minutes ago")]
    #[case(Duration::hours(1), "1 hour ago")]
    #[case(Duration::hours(23), "23 hours ago")]
    #[case(Duration::days(1), "1 day ago")]
    #[case(Duration::days(12), "12 days ago")]
    fn relative_labels(#[case] elapsed: Duration, #[case] expected: &str) {
        assert_eq!(time_ago(now(), now() - elapsed), expected);
    }

    #[rstest]
    #[case(Duration::hours(11), ActivityBucket::Today)]
    #[case(Duration::hours(13), ActivityBucket::Yesterday)]
    #[case(Duration::days(3), ActivityBucket::ThisWeek)]
    #[case(Duration::days(7), ActivityBucket::Earlier)]
    fn buckets_by_calendar_day(#[case] elapsed: Duration, #[case] expected: ActivityBucket) {
        assert_eq!(ActivityBucket::of(now(), now() - elapsed), expected);
    }

    #[test]
    fn feed_is_newest_first_and_truncated() {
        let make = |kind: &'static str, id: i64, hours: i64| Activity {
            kind,
            entity_id: id,
            title: format!("{kind} {id}"),
            detail: String::new(),
            at: now() - Duration::hours(hours),
        };
        let feed = recent_activity(
            vec![make("task", 1, 30), make("project", 2, 1), make("feedback", 3, 5)],
            now(),
            2,
        );
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].entity_id, 2);
        assert_eq!(feed[0].time_ago, "1 hour ago");
        assert_eq!(feed[1].entity_id, 3);
        assert_eq!(feed[1].bucket, ActivityBucket::Today);
    }

    #[test]
    fn counts_include_unused_statuses() {
        let counts = count_by(
            vec![("todo", 3), ("completed", 2), ("todo", 1)],
            &["todo", "in-progress", "completed"],
        );
        assert_eq!(counts["todo"], 4);
        assert_eq!(counts["in-progress"], 0);
        assert_eq!(counts["completed"], 2);
    }
}
