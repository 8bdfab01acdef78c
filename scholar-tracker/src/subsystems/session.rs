//! Session manager — the `InteractionTracker` handle
//!
//! Owns the currently observed paper, the session id, and every background
//! task the tracker starts (page event listener, periodic analyzer, retry
//! worker). The public mutation surface is:
//! - `start_tracking_paper` / `stop_tracking_paper`
//! - `mark_interest`
//! - `status`, `reset_session`, `shutdown`
//!
//! State lives behind one async mutex that is never held across a network
//! call; the only suspension points inside an operation are submissions.

use std::sync::{Arc, Weak};

use chrono::Utc;
use scholar_core::{
    AnalysisResult, ApiError, InteractionApi, InteractionRecord, InteractionType, InterestMark,
    InterestType, PaperId, TrackedPaper, TrackerConfig, ViewReport,
};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::analyzer::PeriodicAnalyzer;
use super::queue::{self, Delivery, Submission, SubmissionQueue};
use super::signals::{classify_click, SignalState};
use crate::events::{ClickTarget, PageEvent, PageEvents, ScrollMetrics};
use crate::rate_limit::RateLimiter;

/// Receives every analysis the tracker surfaces, live or final.
pub type AnalysisCallback = Arc<dyn Fn(&PaperId, &AnalysisResult) + Send + Sync>;

/// Snapshot returned by `InteractionTracker::status`.
#[derive(Debug, Clone, Serialize)]
pub struct TrackerStatus {
    pub session_id: String,
    pub current_paper: Option<TrackedPaper>,
    pub duration_seconds: u64,
    pub max_scroll_depth: u8,
    pub click_count: u32,
    pub pending_retries: usize,
    pub dropped_submissions: u64,
    pub analyzer_running: bool,
}

/// Outcome of the analyzer asking for a live report.
#[derive(Debug)]
pub(crate) enum LiveTick {
    Stopped,
    TooFresh(u64),
    Ready(ViewReport),
}

struct ActivePaper {
    paper: TrackedPaper,
    epoch: u64,
    started: Instant,
    signals: SignalState,
    scroll_throttle: RateLimiter,
    listener: CancellationToken,
}

impl ActivePaper {
    fn duration_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    fn record(&self, session_id: &str, interaction_type: InteractionType) -> InteractionRecord {
        InteractionRecord {
            paper_id: self.paper.id.clone(),
            session_id: session_id.to_string(),
            interaction_type,
            duration_seconds: self.duration_seconds(),
            scroll_depth_percent: self.signals.max_scroll_depth(),
            click_count: None,
        }
    }
}

struct TrackerState {
    session_id: String,
    active: Option<ActivePaper>,
    analyzer: PeriodicAnalyzer,
    next_epoch: u64,
}

struct TrackerInner {
    config: TrackerConfig,
    queue: Arc<SubmissionQueue>,
    events: PageEvents,
    state: Mutex<TrackerState>,
    callback: Mutex<Option<AnalysisCallback>>,
    shutdown: CancellationToken,
}

impl Drop for TrackerInner {
    fn drop(&mut self) {
        // Last handle gone: stop the retry worker, listener and analyzer.
        // The open paper is not finalized; call `shutdown` for that.
        self.shutdown.cancel();
    }
}

#[derive(Clone)]
pub struct InteractionTracker {
    inner: Arc<TrackerInner>,
}

/// Non-owning handle held by background tasks, so they never keep a
/// dropped tracker alive.
#[derive(Clone)]
pub(crate) struct WeakTracker(Weak<TrackerInner>);

impl WeakTracker {
    pub(crate) fn upgrade(&self) -> Option<InteractionTracker> {
        self.0.upgrade().map(|inner| InteractionTracker { inner })
    }
}

pub fn generate_session_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("session_{}_{}", Utc::now().timestamp_millis(), &suffix[..9])
}

impl InteractionTracker {
    /// Create a tracker and spawn its retry worker. Must be called from
    /// within a tokio runtime.
    pub fn new(config: TrackerConfig, api: Arc<dyn InteractionApi>, events: PageEvents) -> Self {
        let queue = Arc::new(SubmissionQueue::new(api, &config));
        let shutdown = CancellationToken::new();

        tokio::spawn(queue::run_retry_worker(
            queue.clone(),
            config.clone(),
            shutdown.child_token(),
        ));

        let session_id = generate_session_id();
        if config.debug {
            tracing::debug!(session_id = %session_id, backend = queue.api().name(), "Interaction tracker created");
        }

        Self {
            inner: Arc::new(TrackerInner {
                config,
                queue,
                events,
                state: Mutex::new(TrackerState {
                    session_id,
                    active: None,
                    analyzer: PeriodicAnalyzer::default(),
                    next_epoch: 0,
                }),
                callback: Mutex::new(None),
                shutdown,
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakTracker {
        WeakTracker(Arc::downgrade(&self.inner))
    }

    pub fn events(&self) -> &PageEvents {
        &self.inner.events
    }

    pub(crate) fn queue(&self) -> &SubmissionQueue {
        &self.inner.queue
    }

    /// Register the analysis callback, replacing any earlier one.
    pub async fn on_interest_analyzed<F>(&self, callback: F)
    where
        F: Fn(&PaperId, &AnalysisResult) + Send + Sync + 'static,
    {
        *self.inner.callback.lock().await = Some(Arc::new(callback));
    }

    pub async fn session_id(&self) -> String {
        self.inner.state.lock().await.session_id.clone()
    }

    // ========================================================================
    // Start / stop
    // ========================================================================

    /// Begin observing `paper_id`. Tracking the same paper again is a no-op;
    /// a different paper is finalized first. Returns the session id.
    pub async fn start_tracking_paper(
        &self,
        paper_id: impl Into<PaperId>,
        title: Option<&str>,
    ) -> String {
        let paper_id = paper_id.into();

        let (session_id, epoch, previous) = {
            let mut state = self.inner.state.lock().await;
            if let Some(active) = &state.active {
                if active.paper.id == paper_id {
                    return state.session_id.clone();
                }
            }

            let previous = Self::detach(&mut state);
            let epoch = state.next_epoch;
            state.next_epoch += 1;
            state.active = Some(ActivePaper {
                paper: TrackedPaper::new(paper_id.clone(), title.map(str::to_string)),
                epoch,
                started: Instant::now(),
                signals: SignalState::default(),
                scroll_throttle: RateLimiter::new(self.inner.config.scroll_throttle()),
                listener: self.inner.shutdown.child_token(),
            });
            (state.session_id.clone(), epoch, previous)
        };

        if let Some(previous) = previous {
            self.finalize(previous, &session_id).await;
        }

        let view_start = InteractionRecord {
            paper_id: paper_id.clone(),
            session_id: session_id.clone(),
            interaction_type: InteractionType::ViewStart,
            duration_seconds: 0,
            scroll_depth_percent: 0,
            click_count: None,
        };
        self.inner.queue.submit(Submission::Interaction(view_start)).await;

        self.attach(epoch).await;

        tracing::info!(paper_id = %paper_id, session_id = %session_id, "Started tracking paper");
        session_id
    }

    /// Finalize the current paper. Returns the backend's final analysis, if
    /// one was produced. No-op when nothing is tracked.
    pub async fn stop_tracking_paper(&self) -> Option<AnalysisResult> {
        let (session_id, previous) = {
            let mut state = self.inner.state.lock().await;
            let previous = Self::detach(&mut state)?;
            (state.session_id.clone(), previous)
        };

        self.finalize(previous, &session_id).await
    }

    /// Finalize the current paper, then start a fresh session id.
    pub async fn reset_session(&self) -> String {
        self.stop_tracking_paper().await;

        let mut state = self.inner.state.lock().await;
        state.session_id = generate_session_id();
        tracing::info!(session_id = %state.session_id, "Session reset");
        state.session_id.clone()
    }

    /// Finalize the current paper and cancel every background task.
    pub async fn shutdown(&self) {
        self.stop_tracking_paper().await;
        self.inner.shutdown.cancel();
        tracing::debug!("Interaction tracker shut down");
    }

    /// Take the active paper out of the state and cancel its listener and
    /// analyzer. The single teardown path for every transition.
    fn detach(state: &mut TrackerState) -> Option<ActivePaper> {
        state.analyzer.stop();
        let previous = state.active.take()?;
        previous.listener.cancel();
        Some(previous)
    }

    /// Subscribe the page listener and start the analyzer, unless the paper
    /// was replaced or stopped while `view_start` was in flight.
    async fn attach(&self, epoch: u64) {
        let mut state = self.inner.state.lock().await;
        let (paper_id, listener) = match &state.active {
            Some(active) if active.epoch == epoch => (active.paper.id.clone(), active.listener.clone()),
            _ => return,
        };

        let rx = self.inner.events.subscribe();
        tokio::spawn(run_page_listener(self.downgrade(), rx, listener));

        state.analyzer.start(
            self.downgrade(),
            paper_id,
            epoch,
            self.inner.config.realtime_analysis_interval(),
            &self.inner.shutdown,
        );
    }

    async fn finalize(&self, previous: ActivePaper, session_id: &str) -> Option<AnalysisResult> {
        let duration = previous.duration_seconds();
        let paper_id = previous.paper.id.clone();

        if duration < self.inner.config.min_summary_duration_secs {
            tracing::debug!(paper_id = %paper_id, duration, "Stopped tracking paper; session too short for analysis");
            return None;
        }

        let report = ViewReport {
            paper_id: paper_id.clone(),
            duration_seconds: duration,
            scroll_depth_percent: previous.signals.max_scroll_depth(),
            session_id: session_id.to_string(),
        };

        tracing::info!(
            paper_id = %paper_id,
            duration,
            scroll_depth = report.scroll_depth_percent,
            clicks = previous.signals.click_count(),
            "Stopped tracking paper"
        );

        match self.inner.queue.submit(Submission::View(report)).await {
            Some(Delivery::Analyzed(Some(mut analysis))) => {
                analysis.is_real_time = false;
                self.emit(&paper_id, &analysis).await;
                Some(analysis)
            }
            _ => None,
        }
    }

    // ========================================================================
    // Signal collection
    // ========================================================================

    /// Fold a scroll event into the active paper. Throttled, then emitted
    /// only past the depth threshold and the emission debounce.
    pub async fn handle_scroll(&self, metrics: ScrollMetrics) {
        if !self.inner.config.track_scroll {
            return;
        }

        let now = Instant::now();
        let depth = metrics.depth_percent();
        let emission_ready = self.inner.queue.emission_ready(now).await;

        let record = {
            let mut state = self.inner.state.lock().await;
            let session_id = state.session_id.clone();
            let Some(active) = state.active.as_mut() else {
                return;
            };
            if !active.scroll_throttle.try_acquire(now) {
                return;
            }
            let emitted = active.signals.observe_scroll(
                depth,
                self.inner.config.scroll_threshold_percent,
                emission_ready,
            );
            if self.inner.config.debug {
                tracing::debug!(
                    paper_id = %active.paper.id,
                    depth,
                    max_depth = active.signals.max_scroll_depth(),
                    emitted = emitted.is_some(),
                    "Scroll observed"
                );
            }
            match emitted {
                Some(_) => active.record(&session_id, InteractionType::Scroll),
                None => return,
            }
        };

        self.inner.queue.submit(Submission::Interaction(record)).await;
    }

    /// Count and classify a click on the active paper and emit it.
    pub async fn handle_click(&self, target: ClickTarget) {
        if !self.inner.config.track_clicks {
            return;
        }

        let record = {
            let mut state = self.inner.state.lock().await;
            let session_id = state.session_id.clone();
            let Some(active) = state.active.as_mut() else {
                return;
            };
            let click_count = active.signals.register_click();
            let interaction_type = classify_click(&target);
            if self.inner.config.debug {
                tracing::debug!(
                    paper_id = %active.paper.id,
                    kind = interaction_type.as_str(),
                    click_count,
                    "Click observed"
                );
            }
            InteractionRecord {
                click_count: Some(click_count),
                ..active.record(&session_id, interaction_type)
            }
        };

        self.inner.queue.submit(Submission::Interaction(record)).await;
    }

    // ========================================================================
    // Explicit interest
    // ========================================================================

    /// Record an explicit like/dislike. Unlike passive telemetry, failures
    /// are returned to the caller.
    pub async fn mark_interest(
        &self,
        paper_id: impl Into<PaperId>,
        interest_type: InterestType,
    ) -> Result<(), ApiError> {
        let mark = InterestMark {
            paper_id: paper_id.into(),
            interest_type,
            session_id: self.session_id().await,
        };

        match self.inner.queue.api().mark_interest(&mark).await {
            Ok(()) => {
                tracing::info!(paper_id = %mark.paper_id, interest = ?interest_type, "Marked interest");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(paper_id = %mark.paper_id, error = %e, "Failed to mark interest");
                Err(e)
            }
        }
    }

    // ========================================================================
    // Status
    // ========================================================================

    pub async fn status(&self) -> TrackerStatus {
        let pending_retries = self.inner.queue.pending_len().await;
        let dropped_submissions = self.inner.queue.dropped().await;

        let state = self.inner.state.lock().await;
        let active = state.active.as_ref();
        TrackerStatus {
            session_id: state.session_id.clone(),
            current_paper: active.map(|a| a.paper.clone()),
            duration_seconds: active.map(ActivePaper::duration_seconds).unwrap_or(0),
            max_scroll_depth: active.map(|a| a.signals.max_scroll_depth()).unwrap_or(0),
            click_count: active.map(|a| a.signals.click_count()).unwrap_or(0),
            pending_retries,
            dropped_submissions,
            analyzer_running: state.analyzer.is_running(),
        }
    }

    pub async fn is_tracking(&self) -> bool {
        self.inner.state.lock().await.active.is_some()
    }

    // ========================================================================
    // Analyzer hooks
    // ========================================================================

    pub(crate) async fn live_report(&self, epoch: u64) -> LiveTick {
        let state = self.inner.state.lock().await;
        let active = match &state.active {
            Some(active) if active.epoch == epoch => active,
            _ => return LiveTick::Stopped,
        };

        let duration = active.duration_seconds();
        if duration < self.inner.config.min_analysis_duration_secs {
            return LiveTick::TooFresh(duration);
        }

        LiveTick::Ready(ViewReport {
            paper_id: active.paper.id.clone(),
            duration_seconds: duration,
            scroll_depth_percent: active.signals.max_scroll_depth(),
            session_id: state.session_id.clone(),
        })
    }

    /// Hand `result` to the callback only if `epoch` is still the active paper.
    pub(crate) async fn surface_if_active(&self, epoch: u64, paper_id: &PaperId, result: &AnalysisResult) {
        let still_active = self
            .inner
            .state
            .lock()
            .await
            .active
            .as_ref()
            .is_some_and(|a| a.epoch == epoch);

        if still_active {
            self.emit(paper_id, result).await;
        }
    }

    async fn emit(&self, paper_id: &PaperId, result: &AnalysisResult) {
        let callback = self.inner.callback.lock().await.clone();
        if let Some(callback) = callback {
            callback(paper_id, result);
        }
        if self.inner.config.debug {
            tracing::debug!(
                paper_id = %paper_id,
                level = ?result.interest_level,
                score = result.interest_score,
                real_time = result.is_real_time,
                degraded = result.degraded,
                "Interest analyzed"
            );
        }
    }
}

/// Forward page events to the tracker until `token` is cancelled.
async fn run_page_listener(
    handle: WeakTracker,
    mut rx: broadcast::Receiver<PageEvent>,
    token: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            event = rx.recv() => event,
        };
        let Some(tracker) = handle.upgrade() else {
            break;
        };

        match event {
            Ok(PageEvent::Scroll(metrics)) => tracker.handle_scroll(metrics).await,
            Ok(PageEvent::Click(target)) => tracker.handle_click(target).await,
            Ok(PageEvent::Unload) => {
                tracing::debug!("Page unload, finalizing tracked paper");
                tracker.stop_tracking_paper().await;
                break;
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Page listener lagged, events dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_format() {
        let id = generate_session_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "session");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert_ne!(id, generate_session_id());
    }
}
