//! Periodic analyzer: live interest estimates while a paper is open
//!
//! Every `realtime_analysis_interval_ms` the analyzer submits a view report
//! for the active paper and hands the backend's analysis to the registered
//! callback, flagged `is_real_time`. Ticks are skipped while the paper has
//! been open for less than `min_analysis_duration_secs`.
//!
//! When the backend fails or answers with something unrecognizable the tick
//! still produces a result: a degraded-mode estimate derived from reading
//! time alone (see `degraded_estimate`).

use std::time::Duration;

use scholar_core::{AnalysisResult, InterestLevel, PaperId};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::queue::{Delivery, Submission};
use super::session::{LiveTick, WeakTracker};

/// Reading time at which the degraded estimate saturates at 100.
const DEGRADED_SATURATION_SECS: u64 = 600;

/// Local stand-in for a backend analysis.
///
/// `interest_score = min(100, duration_seconds / 6)`, i.e. linear up to ten
/// minutes of reading. The level is bucketed from the score.
pub fn degraded_estimate(duration_seconds: u64) -> AnalysisResult {
    let score = (duration_seconds.min(DEGRADED_SATURATION_SECS) as f64) * 100.0
        / DEGRADED_SATURATION_SECS as f64;

    AnalysisResult {
        interest_level: InterestLevel::from_score(score),
        interest_score: score,
        signals: vec![format!(
            "Estimated locally from {}s of reading time",
            duration_seconds
        )],
        is_real_time: true,
        degraded: true,
    }
}

/// Owns the cancellation token of the single running analysis loop.
#[derive(Debug, Default)]
pub struct PeriodicAnalyzer {
    token: Option<CancellationToken>,
}

impl PeriodicAnalyzer {
    /// Cancel any running loop and spawn a new one for `paper_id`.
    pub(crate) fn start(
        &mut self,
        tracker: WeakTracker,
        paper_id: PaperId,
        epoch: u64,
        interval: Duration,
        parent: &CancellationToken,
    ) {
        self.stop();

        let token = parent.child_token();
        self.token = Some(token.clone());
        tokio::spawn(run_analysis_loop(tracker, paper_id, epoch, interval, token));
    }

    pub fn stop(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.token.as_ref().is_some_and(|t| !t.is_cancelled())
    }
}

async fn run_analysis_loop(
    handle: WeakTracker,
    paper_id: PaperId,
    epoch: u64,
    interval: Duration,
    token: CancellationToken,
) {
    let interval = interval.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(tracker) = handle.upgrade() else {
            break;
        };
        let report = match tracker.live_report(epoch).await {
            LiveTick::Stopped => break,
            LiveTick::TooFresh(duration) => {
                tracing::trace!(paper_id = %paper_id, duration, "Analysis tick skipped: session too fresh");
                continue;
            }
            LiveTick::Ready(report) => report,
        };

        let duration = report.duration_seconds;
        let result = match tracker.queue().submit(Submission::View(report)).await {
            Some(Delivery::Analyzed(Some(mut analysis))) => {
                analysis.is_real_time = true;
                analysis
            }
            _ => {
                tracing::debug!(paper_id = %paper_id, duration, "Live analysis unavailable, using degraded estimate");
                degraded_estimate(duration)
            }
        };

        if token.is_cancelled() {
            break;
        }
        tracker.surface_if_active(epoch, &paper_id, &result).await;
    }

    tracing::trace!(paper_id = %paper_id, "Analysis loop stopped");
}
