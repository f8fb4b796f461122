use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::feedback::Feedback;
use crate::models::meeting::Meeting;
use crate::routes::validation;

pub const RECENT_FEEDBACK: i64 = 5;
pub const DASHBOARD_MEETINGS: i64 = 5;
pub const UPCOMING_MEETINGS: i64 = 50;

#[derive(Deserialize)]
pub struct FeedbackRequest {
    pub rating: i32,
    pub message: String,
}

#[derive(Debug, PartialEq)]
pub struct NewFeedback {
    pub rating: i32,
    pub message: String,
}

impl FeedbackRequest {
    pub fn validate(&self) -> Result<NewFeedback, AppError> {
        if !(1..=5).contains(&self.rating) {
            return Err(AppError::validation("Rating must be between 1 and 5"));
        }
        Ok(NewFeedback {
            rating: self.rating,
            message: validation::required("Message", &self.message)?,
        })
    }
}

#[derive(Serialize)]
pub struct ClientDashboard {
    pub projects_by_status: BTreeMap<String, i64>,
    pub total_projects: usize,
    pub average_progress: f64,
    pub recent_feedback: Vec<Feedback>,
    pub upcoming_meetings: Vec<Meeting>,
}

/// Mean progress rounded to one decimal, 0 with no projects.
pub fn average_progress(progress: &[i32]) -> f64 {
    if progress.is_empty() {
        return 0.0;
    }
    let sum: i64 = progress.iter().map(|p| i64::from(*p)).sum();
    let mean = sum as f64 / progress.len() as f64;
    (mean * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0)]
    #[case(6)]
    #[case(-1)]
    fn rating_outside_one_to_five_is_rejected(#[case] rating: i32) {
        let req = FeedbackRequest {
            rating,
            message: "Fine".into(),
        };
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn message_is_required() {
        let req = FeedbackRequest {
            rating: 4,
            message: "   ".into(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn valid_feedback_is_trimmed() {
        let req = FeedbackRequest {
            rating: 5,
            message: " Great work ".into(),
        };
        assert_eq!(
            req.validate().unwrap(),
            NewFeedback {
                rating: 5,
                message: "Great work".into()
            }
        );
    }

    #[test]
    fn average_progress_rounds_to_one_decimal() {
        assert_eq!(average_progress(&[]), 0.0);
        assert_eq!(average_progress(&[100, 50]), 75.0);
        assert_eq!(average_progress(&[10, 20, 20]), 16.7);
    }
}
