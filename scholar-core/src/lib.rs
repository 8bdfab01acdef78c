pub mod api;
pub mod config;
pub mod error;
pub mod models;

pub use api::{ApiError, HttpInteractionApi, InteractionApi};
pub use config::{ApiConfig, ScholarConfig, TrackerConfig};
pub use error::ScholarError;
pub use models::{
    AnalysisResult, InteractionRecord, InteractionType, InterestLevel, InterestMark,
    InterestType, PaperId, TrackedPaper, ViewReport,
};
