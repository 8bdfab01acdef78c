use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::ScholarError;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ScholarConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token sent with every request, if set.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrackerConfig {
    pub debug: bool,
    pub track_scroll: bool,
    pub track_clicks: bool,
    /// A scroll record needs to beat the last emitted depth by more than this.
    pub scroll_threshold_percent: u8,
    pub scroll_throttle_ms: u64,
    /// Minimum gap between a scroll record and the previous emitted record.
    pub min_tracking_interval_ms: u64,
    pub realtime_analysis_interval_ms: u64,
    pub min_analysis_duration_secs: u64,
    pub min_summary_duration_secs: u64,
    pub max_retries: u32,
    pub retry_worker_enabled: bool,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub event_buffer: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            debug: false,
            track_scroll: true,
            track_clicks: true,
            scroll_threshold_percent: 10,
            scroll_throttle_ms: 2000,
            min_tracking_interval_ms: 5000,
            realtime_analysis_interval_ms: 5000,
            min_analysis_duration_secs: 3,
            min_summary_duration_secs: 2,
            max_retries: 3,
            retry_worker_enabled: true,
            retry_base_delay_ms: 2000,
            retry_max_delay_ms: 60_000,
            event_buffer: 64,
        }
    }
}

impl TrackerConfig {
    pub fn scroll_throttle(&self) -> Duration {
        Duration::from_millis(self.scroll_throttle_ms)
    }

    pub fn min_tracking_interval(&self) -> Duration {
        Duration::from_millis(self.min_tracking_interval_ms)
    }

    pub fn realtime_analysis_interval(&self) -> Duration {
        Duration::from_millis(self.realtime_analysis_interval_ms)
    }

    fn validate(&self) -> Result<(), ScholarError> {
        if self.scroll_threshold_percent > 100 {
            return Err(ScholarError::InvalidConfig(format!(
                "tracker.scroll_threshold_percent must be at most 100, got {}",
                self.scroll_threshold_percent
            )));
        }
        if self.realtime_analysis_interval_ms == 0 {
            return Err(ScholarError::InvalidConfig(
                "tracker.realtime_analysis_interval_ms must be positive".to_string(),
            ));
        }
        if self.retry_base_delay_ms > self.retry_max_delay_ms {
            return Err(ScholarError::InvalidConfig(format!(
                "tracker.retry_base_delay_ms ({}) exceeds retry_max_delay_ms ({})",
                self.retry_base_delay_ms, self.retry_max_delay_ms
            )));
        }
        Ok(())
    }
}

impl ScholarConfig {
    /// Load from a TOML file, then apply `SCHOLAR__SECTION__KEY` environment overrides.
    pub fn load(path: &str) -> Result<Self, ScholarError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("SCHOLAR").separator("__"))
            .build()?;
        let config: Self = s.try_deserialize()?;
        config.tracker.validate()?;
        Ok(config)
    }
}
