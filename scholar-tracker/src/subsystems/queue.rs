//! Submission queue — fire-and-forget delivery with a bounded retry buffer
//!
//! Every outbound report goes through `SubmissionQueue::submit`. A failed call
//! never reaches the caller: the submission is parked in an in-memory queue
//! and retried by `retry_failed` (driven by `run_retry_worker`) until it is
//! delivered or has used up `max_retries` retries.
//!
//! The queue is memory-only and does not survive a restart.

use std::sync::Arc;
use std::time::Duration;

use scholar_core::{AnalysisResult, ApiError, InteractionApi, InteractionRecord, TrackerConfig, ViewReport};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_util::sync::CancellationToken;

use crate::rate_limit::RateLimiter;

// ============================================================================
// PUBLIC API
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Interaction(InteractionRecord),
    View(ViewReport),
}

impl Submission {
    fn kind(&self) -> &'static str {
        match self {
            Submission::Interaction(record) => record.interaction_type.as_str(),
            Submission::View(_) => "view",
        }
    }
}

/// What the backend returned for a delivered submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Accepted,
    Analyzed(Option<AnalysisResult>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryQueueEntry {
    pub submission: Submission,
    pub retry_count: u32,
}

/// Report from one `retry_failed` pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryReport {
    pub attempted: usize,
    pub delivered: usize,
    pub requeued: usize,
    pub discarded: usize,
}

#[derive(Debug)]
struct QueueState {
    pending: Vec<RetryQueueEntry>,
    emission: RateLimiter,
    dropped: u64,
}

pub struct SubmissionQueue {
    api: Arc<dyn InteractionApi>,
    max_retries: u32,
    state: Mutex<QueueState>,
}

impl SubmissionQueue {
    pub fn new(api: Arc<dyn InteractionApi>, config: &TrackerConfig) -> Self {
        Self {
            api,
            max_retries: config.max_retries,
            state: Mutex::new(QueueState {
                pending: Vec::new(),
                emission: RateLimiter::new(config.min_tracking_interval()),
                dropped: 0,
            }),
        }
    }

    pub fn api(&self) -> &dyn InteractionApi {
        self.api.as_ref()
    }

    /// Attempt delivery now. On failure the submission is queued for retry
    /// and `None` is returned; this never errors.
    pub async fn submit(&self, submission: Submission) -> Option<Delivery> {
        match self.send(&submission).await {
            Ok(delivery) => {
                if matches!(submission, Submission::Interaction(_)) {
                    self.state.lock().await.emission.mark(Instant::now());
                }
                Some(delivery)
            }
            Err(e) => {
                tracing::warn!(
                    kind = submission.kind(),
                    backend = self.api.name(),
                    error = %e,
                    "Submission failed, queued for retry"
                );
                self.state.lock().await.pending.push(RetryQueueEntry {
                    submission,
                    retry_count: 0,
                });
                None
            }
        }
    }

    /// Retry everything queued so far. Entries queued while the pass runs are
    /// left for the next pass.
    pub async fn retry_failed(&self) -> RetryReport {
        let snapshot = std::mem::take(&mut self.state.lock().await.pending);
        let mut report = RetryReport {
            attempted: snapshot.len(),
            ..RetryReport::default()
        };

        for entry in snapshot {
            match self.send(&entry.submission).await {
                Ok(_) => report.delivered += 1,
                Err(e) => {
                    let retry_count = entry.retry_count + 1;
                    let mut state = self.state.lock().await;
                    if retry_count >= self.max_retries {
                        tracing::warn!(
                            kind = entry.submission.kind(),
                            attempts = retry_count + 1,
                            error = %e,
                            "Dropping submission after exhausting retries"
                        );
                        state.dropped += 1;
                        report.discarded += 1;
                    } else {
                        state.pending.push(RetryQueueEntry {
                            submission: entry.submission,
                            retry_count,
                        });
                        report.requeued += 1;
                    }
                }
            }
        }

        if report.attempted > 0 {
            tracing::debug!(
                attempted = report.attempted,
                delivered = report.delivered,
                requeued = report.requeued,
                discarded = report.discarded,
                "Retry pass complete"
            );
        }

        report
    }

    /// Whether the cross-type emission debounce allows a record at `now`.
    pub async fn emission_ready(&self, now: Instant) -> bool {
        self.state.lock().await.emission.is_ready(now)
    }

    pub async fn last_emitted_at(&self) -> Option<Instant> {
        self.state.lock().await.emission.last()
    }

    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn pending(&self) -> Vec<RetryQueueEntry> {
        self.state.lock().await.pending.clone()
    }

    /// Number of submissions permanently discarded.
    pub async fn dropped(&self) -> u64 {
        self.state.lock().await.dropped
    }

    async fn send(&self, submission: &Submission) -> Result<Delivery, ApiError> {
        match submission {
            Submission::Interaction(record) => self
                .api
                .track_interaction(record)
                .await
                .map(|_| Delivery::Accepted),
            Submission::View(report) => self.api.track_view(report).await.map(Delivery::Analyzed),
        }
    }
}

// ============================================================================
// Retry worker
// ============================================================================

/// Run the background retry loop until `shutdown` is cancelled.
///
/// While the queue holds entries, passes are spaced by an exponential backoff
/// (`retry_base_delay_ms` doubling up to `retry_max_delay_ms`). The schedule
/// resets once the queue drains.
pub async fn run_retry_worker(
    queue: Arc<SubmissionQueue>,
    config: TrackerConfig,
    shutdown: CancellationToken,
) {
    if !config.retry_worker_enabled {
        tracing::info!("Retry worker disabled via config");
        return;
    }

    let idle_delay = Duration::from_millis(config.retry_base_delay_ms.max(1));
    let mut backoff = backoff_schedule(&config);

    tracing::debug!(
        base_ms = config.retry_base_delay_ms,
        max_ms = config.retry_max_delay_ms,
        "Retry worker started"
    );

    loop {
        let delay = if queue.pending_len().await == 0 {
            backoff = backoff_schedule(&config);
            idle_delay
        } else {
            backoff
                .next()
                .unwrap_or(Duration::from_millis(config.retry_max_delay_ms))
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.cancelled() => {
                tracing::debug!("Retry worker shutting down");
                break;
            }
        }

        if queue.pending_len().await > 0 {
            queue.retry_failed().await;
        }
    }
}

fn backoff_schedule(config: &TrackerConfig) -> Box<dyn Iterator<Item = Duration> + Send> {
    // from_millis(2) doubles each step; the factor scales the first delay to the base.
    Box::new(
        ExponentialBackoff::from_millis(2)
            .factor((config.retry_base_delay_ms / 2).max(1))
            .max_delay(Duration::from_millis(config.retry_max_delay_ms))
            .map(jitter),
    )
}

// ============================================================================
// TESTS
// ============================================================================
