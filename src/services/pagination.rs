use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Query string shared by the list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub department: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub project_id: Option<i64>,
    pub assignee_id: Option<i64>,
    pub client_id: Option<i64>,
}

impl ListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.limit)
    }

    /// `%term%` for a LIKE clause, with LIKE wildcards in the term escaped.
    pub fn search_pattern(&self) -> Option<String> {
        like_pattern(self.search.as_deref()?)
    }

    pub fn status_filter(&self) -> Option<&str> {
        non_empty(self.status.as_deref())
    }

    pub fn department_filter(&self) -> Option<&str> {
        non_empty(self.department.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn like_pattern(term: &str) -> Option<String> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    Some(escaped)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }

    pub fn pages(&self, total: i64) -> i64 {
        if total <= 0 {
            return 0;
        }
        (total + self.limit() - 1) / self.limit()
    }
}

/// `{success, data, total, page, pages}` list envelope.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, pagination: Pagination) -> Self {
        Self {
            success: true,
            data,
            total,
            page: pagination.page,
            pages: pagination.pages(total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, None, 1, 10)]
    #[case(Some(0), Some(0), 1, 1)]
    #[case(Some(3), Some(25), 3, 25)]
    #[case(Some(2), Some(1000), 2, 100)]
    fn clamps_page_and_limit(
        #[case] page: Option<u32>,
        #[case] limit: Option<u32>,
        #[case] expected_page: u32,
        #[case] expected_limit: u32,
    ) {
        let p = Pagination::new(page, limit);
        assert_eq!((p.page, p.limit), (expected_page, expected_limit));
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(10, 1)]
    #[case(11, 2)]
    #[case(95, 10)]
    fn pages_round_up(#[case] total: i64, #[case] expected: i64) {
        assert_eq!(Pagination::new(None, Some(10)).pages(total), expected);
    }

    #[test]
    fn offset_skips_previous_pages() {
        assert_eq!(Pagination::new(Some(1), Some(20)).offset(), 0);
        assert_eq!(Pagination::new(Some(4), Some(20)).offset(), 60);
    }

    #[test]
    fn envelope_reports_page_and_page_count() {
        let body = Paginated::new(vec!["a", "b"], 12, Pagination::new(Some(2), Some(5)));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["total"], 12);
        assert_eq!(json["page"], 2);
        assert_eq!(json["pages"], 3);
        assert_eq!(json["data"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn search_patterns_escape_wildcards() {
        assert_eq!(like_pattern("  ann "), Some("%ann%".to_string()));
        assert_eq!(like_pattern("50%_off"), Some("%50\\%\\_off%".to_string()));
        assert_eq!(like_pattern("   "), None);
    }

    #[test]
    fn blank_filters_are_ignored() {
        let query = ListQuery {
            status: Some("  ".into()),
            department: Some(" Sales ".into()),
            ..Default::default()
        };
        assert_eq!(query.status_filter(), None);
        assert_eq!(query.department_filter(), Some("Sales"));
        assert_eq!(query.search_pattern(), None);
    }
}
