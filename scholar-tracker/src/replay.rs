//! Replay driver. Feeds a scripted reading session through a tracker
//!
//! A script is a JSON document of timed steps:
//!
//! ```json
//! { "steps": [
//!     { "at_ms": 0,     "action": { "type": "open", "paper_id": "P1", "title": "X" } },
//!     { "at_ms": 3000,  "action": { "type": "scroll", "percent": 40 } },
//!     { "at_ms": 12000, "action": { "type": "close" } }
//! ] }
//! ```
//!
//! Scroll, click and unload steps go through the page event bus, exactly as
//! a UI shell would publish them.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use scholar_core::InterestType;
use serde::Deserialize;
use tokio::time::{sleep_until, Instant};

use crate::events::{ClickTarget, PageEvent, ScrollMetrics};
use crate::subsystems::session::InteractionTracker;

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayScript {
    pub steps: Vec<ReplayStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayStep {
    /// Offset from the start of the replay.
    pub at_ms: u64,
    pub action: ReplayAction,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayAction {
    Open {
        paper_id: String,
        #[serde(default)]
        title: Option<String>,
    },
    Scroll {
        percent: f64,
    },
    Click {
        #[serde(default)]
        href: Option<String>,
        #[serde(default)]
        classes: Vec<String>,
        #[serde(default)]
        data_action: Option<String>,
    },
    Like {
        #[serde(default)]
        paper_id: Option<String>,
    },
    Dislike {
        #[serde(default)]
        paper_id: Option<String>,
    },
    Close,
    Unload,
    Wait,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub steps_run: usize,
    pub interest_failures: usize,
}

impl ReplayScript {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read replay script {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse replay script {}", path.display()))
    }
}

/// Run every step at its offset. Explicit interest failures are counted,
/// not fatal.
pub async fn run_script(tracker: &InteractionTracker, script: &ReplayScript) -> Result<ReplaySummary> {
    let mut steps = script.steps.clone();
    steps.sort_by_key(|s| s.at_ms);

    let start = Instant::now();
    let mut summary = ReplaySummary::default();

    for step in steps {
        sleep_until(start + Duration::from_millis(step.at_ms)).await;

        match step.action {
            ReplayAction::Open { paper_id, title } => {
                tracker.start_tracking_paper(paper_id, title.as_deref()).await;
            }
            ReplayAction::Scroll { percent } => {
                publish(tracker, PageEvent::Scroll(ScrollMetrics::at_percent(percent))).await;
            }
            ReplayAction::Click {
                href,
                classes,
                data_action,
            } => {
                let target = ClickTarget {
                    href,
                    classes,
                    data_action,
                };
                publish(tracker, PageEvent::Click(target)).await;
            }
            ReplayAction::Like { paper_id } => {
                if !mark(tracker, paper_id, InterestType::Like).await {
                    summary.interest_failures += 1;
                }
            }
            ReplayAction::Dislike { paper_id } => {
                if !mark(tracker, paper_id, InterestType::Dislike).await {
                    summary.interest_failures += 1;
                }
            }
            ReplayAction::Close => {
                tracker.stop_tracking_paper().await;
            }
            ReplayAction::Unload => {
                publish(tracker, PageEvent::Unload).await;
            }
            ReplayAction::Wait => {}
        }

        summary.steps_run += 1;
    }

    Ok(summary)
}

async fn publish(tracker: &InteractionTracker, event: PageEvent) {
    if tracker.events().publish(event) == 0 {
        tracing::debug!("Page event published with no listener attached");
    }
    // Let the listener pick the event up before the next step.
    tokio::task::yield_now().await;
}

async fn mark(tracker: &InteractionTracker, paper_id: Option<String>, interest: InterestType) -> bool {
    let paper_id = match paper_id {
        Some(id) => id,
        None => match tracker.status().await.current_paper {
            Some(paper) => paper.id.to_string(),
            None => {
                tracing::warn!("Interest step with no paper open, skipping");
                return false;
            }
        },
    };

    tracker.mark_interest(paper_id, interest).await.is_ok()
}
