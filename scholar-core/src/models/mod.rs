pub mod analysis;
pub mod interaction;
pub mod paper;

pub use analysis::{AnalysisResult, InterestLevel};
pub use interaction::{InteractionRecord, InteractionType, InterestMark, InterestType, ViewReport};
pub use paper::{PaperId, TrackedPaper};
