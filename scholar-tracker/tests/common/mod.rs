#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use scholar_core::{
    AnalysisResult, ApiError, InteractionApi, InteractionRecord, InteractionType, InterestLevel,
    InterestMark, PaperId, TrackerConfig, ViewReport,
};
use scholar_tracker::{InteractionTracker, PageEvents};
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub enum Call {
    Interaction(InteractionRecord),
    View(ViewReport),
    Interest(InterestMark),
}

/// In-memory backend that records every call with the (paused) clock time.
pub struct RecordingApi {
    calls: Mutex<Vec<(Instant, Call)>>,
    failing: AtomicBool,
    analysis: Mutex<Option<AnalysisResult>>,
}

impl RecordingApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            analysis: Mutex::new(Some(sample_analysis())),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_analysis(&self, analysis: Option<AnalysisResult>) {
        *self.analysis.lock().unwrap() = analysis;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn interactions(&self) -> Vec<InteractionRecord> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Interaction(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn interactions_of(&self, kind: InteractionType) -> Vec<InteractionRecord> {
        self.interactions()
            .into_iter()
            .filter(|r| r.interaction_type == kind)
            .collect()
    }

    pub fn views(&self) -> Vec<ViewReport> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::View(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn interests(&self) -> Vec<InterestMark> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Interest(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push((Instant::now(), call));
        if self.failing.load(Ordering::SeqCst) {
            Err(ApiError::Api {
                code: 503,
                message: "backend unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl InteractionApi for RecordingApi {
    async fn track_interaction(&self, record: &InteractionRecord) -> Result<(), ApiError> {
        self.record(Call::Interaction(record.clone()))
    }

    async fn track_view(&self, report: &ViewReport) -> Result<Option<AnalysisResult>, ApiError> {
        self.record(Call::View(report.clone()))?;
        Ok(self.analysis.lock().unwrap().clone())
    }

    async fn mark_interest(&self, mark: &InterestMark) -> Result<(), ApiError> {
        self.record(Call::Interest(mark.clone()))
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub fn sample_analysis() -> AnalysisResult {
    AnalysisResult {
        interest_level: InterestLevel::High,
        interest_score: 72.0,
        signals: vec!["Long reading time".to_string()],
        is_real_time: false,
        degraded: false,
    }
}

/// Shared sink for analyses surfaced through the callback.
pub type Surfaced = Arc<Mutex<Vec<(PaperId, AnalysisResult)>>>;

pub async fn tracker_with(config: TrackerConfig) -> (InteractionTracker, Arc<RecordingApi>, Surfaced) {
    tracker_with_events(config, PageEvents::new(16)).await
}

pub async fn tracker_with_events(
    config: TrackerConfig,
    events: PageEvents,
) -> (InteractionTracker, Arc<RecordingApi>, Surfaced) {
    let api = RecordingApi::new();
    let tracker = InteractionTracker::new(config, api.clone(), events);

    let surfaced: Surfaced = Arc::new(Mutex::new(Vec::new()));
    let sink = surfaced.clone();
    tracker
        .on_interest_analyzed(move |paper_id, result| {
            sink.lock().unwrap().push((paper_id.clone(), result.clone()));
        })
        .await;

    (tracker, api, surfaced)
}

pub async fn tracker() -> (InteractionTracker, Arc<RecordingApi>, Surfaced) {
    tracker_with(TrackerConfig::default()).await
}

/// Default config with the periodic analyzer pushed out of the way.
pub fn quiet_config() -> TrackerConfig {
    TrackerConfig {
        realtime_analysis_interval_ms: 3_600_000,
        ..TrackerConfig::default()
    }
}
