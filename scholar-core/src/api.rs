//! Backend interaction API
//!
//! Provides an `InteractionApi` trait with one implementation:
//! - **HttpInteractionApi** — JSON over HTTP via reqwest
//!
//! The tracker never talks to reqwest directly, so tests can substitute an
//! in-memory implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::ApiConfig;
use crate::models::{AnalysisResult, InteractionRecord, InterestMark, ViewReport};

// ============================================================================
// InteractionApi trait
// ============================================================================

/// Abstraction over the reading-analytics backend.
#[async_trait]
pub trait InteractionApi: Send + Sync {
    /// Fire a single interaction record.
    async fn track_interaction(&self, record: &InteractionRecord) -> Result<(), ApiError>;

    /// Submit a duration/depth summary. Returns `None` when the backend
    /// accepted the report but sent no recognizable analysis.
    async fn track_view(&self, report: &ViewReport) -> Result<Option<AnalysisResult>, ApiError>;

    /// Record an explicit like/dislike.
    async fn mark_interest(&self, mark: &InterestMark) -> Result<(), ApiError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Backend rejected request: {0}")]
    Rejected(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Missing API base URL")]
    MissingBaseUrl,
}

// ============================================================================
// Wire structs (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct Envelope {
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

// ============================================================================
// HttpInteractionApi
// ============================================================================

#[derive(Debug, Clone)]
pub struct HttpInteractionApi {
    client: Client,
    token: Option<String>,
    base_url: String,
}

impl HttpInteractionApi {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        Self::with_base_url(config, config.base_url.clone())
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(config: &ApiConfig, base_url: String) -> Result<Self, ApiError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ApiError::MissingBaseUrl);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            token: config.token.clone().filter(|t| !t.is_empty()),
            base_url,
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Envelope, ApiError> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&error_body)
                .ok()
                .and_then(|e| e.message.or(e.error))
                .unwrap_or(error_body);

            tracing::debug!(code = status.as_u16(), message = %message, url = %url, "Interaction API error");

            return Err(ApiError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| ApiError::MalformedResponse(e.to_string()))?;

        match envelope.success {
            Some(true) => Ok(envelope),
            Some(false) => Err(ApiError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "success: false".to_string()),
            )),
            None => Err(ApiError::MalformedResponse(
                "missing `success` field".to_string(),
            )),
        }
    }
}

#[async_trait]
impl InteractionApi for HttpInteractionApi {
    async fn track_interaction(&self, record: &InteractionRecord) -> Result<(), ApiError> {
        self.post("/interactions/track", record).await.map(|_| ())
    }

    async fn track_view(&self, report: &ViewReport) -> Result<Option<AnalysisResult>, ApiError> {
        let envelope = self.post("/interactions/view", report).await?;

        let analysis = envelope
            .data
            .and_then(|data| serde_json::from_value::<AnalysisResult>(data).ok());

        if analysis.is_none() {
            tracing::debug!(paper_id = %report.paper_id, "View accepted without a recognizable analysis");
        }

        Ok(analysis)
    }

    async fn mark_interest(&self, mark: &InterestMark) -> Result<(), ApiError> {
        self.post("/interactions/interest", mark).await.map(|_| ())
    }

    fn name(&self) -> &str {
        "http"
    }
}

// ============================================================================
// TESTS
// ============================================================================
