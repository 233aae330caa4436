//! Report models for trace-replay experiments
//!
//! Serializable summaries emitted by the replay harness.

pub mod report;

// Re-export commonly used types
pub use report::{ExperimentReport, ReplaySummary};
