pub mod events;
pub mod rate_limit;
pub mod replay;
pub mod subsystems;

pub use events::{ClickTarget, PageEvent, PageEvents, ScrollMetrics};
pub use rate_limit::RateLimiter;
pub use subsystems::analyzer::degraded_estimate;
pub use subsystems::queue::{Delivery, RetryQueueEntry, RetryReport, Submission, SubmissionQueue};
pub use subsystems::session::{AnalysisCallback, InteractionTracker, TrackerStatus};
