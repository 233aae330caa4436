//! Report DTOs for trace-replay experiments
//!
//! Defines the structure printed once per (capacity, policy) run.

use std::fmt;

use serde::Serialize;

use crate::cache::{CacheStats, PolicyKind};
use crate::trace::CapacityMode;

/// Counts of trace events handled by a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    /// Events read from the trace
    pub events: u64,
    /// Events whose operation replay does not handle
    pub skipped: u64,
    /// Admissions heavier than the whole cache
    pub rejected: u64,
}

/// Outcome of replaying one trace against one policy.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    /// Policy under test
    pub policy: PolicyKind,
    /// Capacity the cache was built with
    pub max_capacity: usize,
    /// Unit `max_capacity` is measured in
    pub capacity_mode: CapacityMode,
    /// Sample size, only for the hyperbolic policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_size: Option<usize>,
    /// Events read from the trace
    pub events: u64,
    /// Events skipped by replay
    pub skipped: u64,
    /// Admissions refused as too large
    pub rejected: u64,
    /// Final cache counters
    pub stats: CacheStats,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl ExperimentReport {
    /// Creates a new ExperimentReport from a finished replay
    pub fn new(
        policy: PolicyKind,
        max_capacity: usize,
        sample_size: usize,
        capacity_mode: CapacityMode,
        summary: ReplaySummary,
        stats: CacheStats,
    ) -> Self {
        let sample_size = (policy == PolicyKind::Hyperbolic).then_some(sample_size);
        Self {
            policy,
            max_capacity,
            capacity_mode,
            sample_size,
            events: summary.events,
            skipped: summary.skipped,
            rejected: summary.rejected,
            stats,
            hit_rate: stats.hit_rate(),
        }
    }
}

impl fmt::Display for ExperimentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hit Ratio: {:.4} (capacity {} {}, hits {}, misses {}, evictions {})",
            self.policy,
            self.hit_rate,
            self.max_capacity,
            self.capacity_mode,
            self.stats.hits,
            self.stats.misses,
            self.stats.evictions
        )
    }
}
