//! Interview application form submissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    Draft,
    Submitted,
    InReview,
    Accepted,
    Rejected,
    #[serde(other)]
    Unknown,
}

impl SubmissionStatus {
    pub fn display_name(self) -> &'static str {
        match self {
            SubmissionStatus::Draft => "Draft",
            SubmissionStatus::Submitted => "Submitted",
            SubmissionStatus::InReview => "In review",
            SubmissionStatus::Accepted => "Accepted",
            SubmissionStatus::Rejected => "Rejected",
            SubmissionStatus::Unknown => "Unknown",
        }
    }
}

/// A stored form submission. `form_data` is free-form JSON owned by the
/// application form.
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmission {
    pub id: i64,
    #[serde(alias = "user_id", default)]
    pub user_id: Option<i64>,
    #[serde(alias = "form_data")]
    #[cfg_attr(feature = "ts", ts(type = "Record<string, unknown>"))]
    pub form_data: serde_json::Value,
    #[serde(default)]
    pub status: SubmissionStatus,
    #[serde(alias = "submitted_at", default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Body for a new submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
    pub form_data: serde_json::Value,
    pub status: SubmissionStatus,
}
