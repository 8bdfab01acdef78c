use serde::{Deserialize, Serialize};

use super::paper::PaperId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    ViewStart,
    Scroll,
    Click,
    ClickPdf,
    ClickUrl,
    Bookmark,
    ExplicitLike,
    ExplicitDislike,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewStart => "view_start",
            Self::Scroll => "scroll",
            Self::Click => "click",
            Self::ClickPdf => "click_pdf",
            Self::ClickUrl => "click_url",
            Self::Bookmark => "bookmark",
            Self::ExplicitLike => "explicit_like",
            Self::ExplicitDislike => "explicit_dislike",
        }
    }
}

/// A single behavioural signal, sent to `POST /interactions/track`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub paper_id: PaperId,
    pub session_id: String,
    pub interaction_type: InteractionType,
    pub duration_seconds: u64,
    pub scroll_depth_percent: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_count: Option<u32>,
}

/// Duration/depth summary, sent to `POST /interactions/view` by both the
/// stop path and the periodic analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewReport {
    pub paper_id: PaperId,
    pub duration_seconds: u64,
    pub scroll_depth_percent: u8,
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestType {
    Like,
    Dislike,
}

/// Explicit like/dislike, sent to `POST /interactions/interest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestMark {
    pub paper_id: PaperId,
    pub interest_type: InterestType,
    pub session_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_serializes_snake_case_and_omits_missing_click_count() {
        let record = InteractionRecord {
            paper_id: PaperId::from(42u64),
            session_id: "session_1_abc".to_string(),
            interaction_type: InteractionType::ClickPdf,
            duration_seconds: 7,
            scroll_depth_percent: 35,
            click_count: None,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "paper_id": "42",
                "session_id": "session_1_abc",
                "interaction_type": "click_pdf",
                "duration_seconds": 7,
                "scroll_depth_percent": 35
            })
        );
    }

    #[test]
    fn test_interest_mark_wire_shape() {
        let mark = InterestMark {
            paper_id: PaperId::from("P7"),
            interest_type: InterestType::Dislike,
            session_id: "session_1_abc".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&mark).unwrap(),
            json!({
                "paper_id": "P7",
                "interest_type": "dislike",
                "session_id": "session_1_abc"
            })
        );
    }
}
