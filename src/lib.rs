//! Hypercache - Bounded in-memory key caches with pluggable eviction
//!
//! Provides FIFO, LRU, LFU and sampled hyperbolic eviction behind one
//! [`Cache`] contract, plus a trace-replay harness for comparing hit ratios.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;
pub mod trace;

pub use cache::{Cache, CacheStats, PolicyKind, SharedCache, Timestamp};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::run_experiment;
pub use trace::CapacityMode;
