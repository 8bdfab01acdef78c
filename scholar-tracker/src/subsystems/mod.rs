pub mod analyzer;
pub mod queue;
pub mod session;
pub mod signals;
