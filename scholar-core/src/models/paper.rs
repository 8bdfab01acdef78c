use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque paper identifier. The backend accepts string or numeric ids; both
/// travel as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperId(String);

impl PaperId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PaperId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PaperId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for PaperId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// The paper currently under observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedPaper {
    pub id: PaperId,
    pub title: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl TrackedPaper {
    pub fn new(id: PaperId, title: Option<String>) -> Self {
        Self {
            id,
            title,
            started_at: Utc::now(),
        }
    }
}
