use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl InterestLevel {
    /// Bucket a 0-100 score into a level, 20 points per bucket.
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s < 20.0 => Self::VeryLow,
            s if s < 40.0 => Self::Low,
            s if s < 60.0 => Self::Medium,
            s if s < 80.0 => Self::High,
            _ => Self::VeryHigh,
        }
    }
}

/// Interest estimate returned by the backend (or synthesized locally when
/// `degraded` is set).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub interest_level: InterestLevel,
    pub interest_score: f64,
    #[serde(default)]
    pub signals: Vec<String>,
    #[serde(default)]
    pub is_real_time: bool,
    #[serde(default)]
    pub degraded: bool,
}
