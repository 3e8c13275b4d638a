//! Interview models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of interview being scheduled.
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewType {
    Technical,
    Behavioral,
    SystemDesign,
    /// A kind this client does not know about.
    #[serde(other)]
    Other,
}

impl InterviewType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "technical" => Some(InterviewType::Technical),
            "behavioral" | "behavioural" => Some(InterviewType::Behavioral),
            "system_design" => Some(InterviewType::SystemDesign),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            InterviewType::Technical => "Technical",
            InterviewType::Behavioral => "Behavioral",
            InterviewType::SystemDesign => "System Design",
            InterviewType::Other => "Other",
        }
    }
}

#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    #[default]
    Scheduled,
    Pending,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl InterviewStatus {
    pub fn display_name(self) -> &'static str {
        match self {
            InterviewStatus::Scheduled => "Scheduled",
            InterviewStatus::Pending => "Pending",
            InterviewStatus::Completed => "Completed",
            InterviewStatus::Cancelled => "Cancelled",
            InterviewStatus::Unknown => "Unknown",
        }
    }
}

/// An interview as stored by the backend.
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interview {
    pub id: i64,
    #[serde(alias = "user_id", default)]
    pub user_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    /// Length in minutes.
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(rename = "type", default)]
    pub interview_type: Option<InterviewType>,
    #[serde(default)]
    pub status: InterviewStatus,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(alias = "video_url", default)]
    pub video_url: Option<String>,
}

impl Interview {
    pub fn is_upcoming(&self) -> bool {
        self.status == InterviewStatus::Scheduled && self.date > Utc::now()
    }

    /// One-line summary for listings.
    pub fn summary(&self) -> String {
        let kind = self
            .interview_type
            .map(|t| t.display_name())
            .unwrap_or("Interview");
        let length = self
            .duration
            .map(|d| format!(" ({} min)", d))
            .unwrap_or_default();
        format!(
            "#{} {} - {} on {}{} [{}]",
            self.id,
            self.title,
            kind,
            self.date.format("%b %d, %Y %H:%M"),
            length,
            self.status.display_name()
        )
    }
}

/// Body for creating or updating an interview. Built from a validated
/// [`crate::forms::InterviewForm`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterviewDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub duration: u32,
    #[serde(rename = "type")]
    pub interview_type: InterviewType,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_interview_type_parse() {
        assert_eq!(InterviewType::parse("technical"), Some(InterviewType::Technical));
        assert_eq!(InterviewType::parse("System Design"), Some(InterviewType::SystemDesign));
        assert_eq!(InterviewType::parse("system-design"), Some(InterviewType::SystemDesign));
        assert_eq!(InterviewType::parse("behavioural"), Some(InterviewType::Behavioral));
        assert_eq!(InterviewType::parse("panel"), None);
    }

    #[test]
    fn test_parse_interview_response() {
        let json = r#"{
            "id": 12,
            "user_id": 3,
            "title": "Backend screen",
            "description": null,
            "date": "2026-03-01T14:00:00Z",
            "duration": 45,
            "type": "system_design",
            "status": "scheduled",
            "video_url": "https://video.example.com/room/12"
        }"#;

        let interview: Interview = serde_json::from_str(json).unwrap();
        assert_eq!(interview.id, 12);
        assert_eq!(interview.user_id, Some(3));
        assert_eq!(interview.interview_type, Some(InterviewType::SystemDesign));
        assert_eq!(interview.duration, Some(45));
        assert_eq!(interview.video_url.as_deref(), Some("https://video.example.com/room/12"));
        assert_eq!(
            interview.summary(),
            "#12 Backend screen - System Design on Mar 01, 2026 14:00 (45 min) [Scheduled]"
        );
    }

    #[test]
    fn test_minimal_interview_defaults() {
        // Older rows only carry title and date
        let json = r#"{"id": 1, "title": "Intro", "date": "2026-01-05T09:30:00Z"}"#;
        let interview: Interview = serde_json::from_str(json).unwrap();
        assert_eq!(interview.status, InterviewStatus::Scheduled);
        assert!(interview.interview_type.is_none());
        assert_eq!(interview.summary(), "#1 Intro - Interview on Jan 05, 2026 09:30 [Scheduled]");
    }

    #[test]
    fn test_draft_serializes_type_field() {
        let draft = InterviewDraft {
            title: "Mock".to_string(),
            description: None,
            date: Utc.with_ymd_and_hms(2026, 2, 1, 10, 0, 0).unwrap(),
            duration: 30,
            interview_type: InterviewType::Behavioral,
        };
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["type"], "behavioral");
        assert_eq!(value["duration"], 30);
        assert!(value.get("description").is_none());
    }

    #[test]
    fn test_unknown_values_do_not_fail_the_list() {
        let json = r#"[
            {"id": 1, "title": "Screen", "date": "2026-03-01T14:00:00Z", "type": "technical", "status": "completed"},
            {"id": 2, "title": "Mock", "date": "2026-03-02T14:00:00Z", "type": "mock", "status": "rescheduled"}
        ]"#;

        let interviews: Vec<Interview> = serde_json::from_str(json).unwrap();
        assert_eq!(interviews[0].interview_type, Some(InterviewType::Technical));
        assert_eq!(interviews[0].status, InterviewStatus::Completed);
        assert_eq!(interviews[1].interview_type, Some(InterviewType::Other));
        assert_eq!(interviews[1].status, InterviewStatus::Unknown);
        assert_eq!(
            interviews[1].summary(),
            "#2 Mock - Other on Mar 02, 2026 14:00 [Unknown]"
        );
    }
}
