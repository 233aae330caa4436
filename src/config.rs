//! Configuration Module
//!
//! Handles loading and managing harness configuration from environment variables.

use std::env;
use std::path::PathBuf;

use crate::cache::PolicyKind;
use crate::error::{CacheError, Result};
use crate::trace::CapacityMode;

/// Harness configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Trace file to replay
    pub trace_file: PathBuf,
    /// Comma-separated policy names, validated by [`Config::policies`]
    pub policies: String,
    /// Capacities to run every policy at
    pub max_capacities: Vec<usize>,
    /// Whether capacities count entries or bytes
    pub capacity_mode: CapacityMode,
    /// Keys sampled per hyperbolic eviction
    pub sample_size: usize,
    /// Seed for reproducible hyperbolic sampling
    pub seed: Option<u64>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `TRACE_FILE` - Trace to replay (default: traces/cluster052)
    /// - `CACHE_POLICIES` - Policies to compare (default: fifo,lru,lfu,hyperbolic)
    /// - `MAX_CAPACITIES` - Comma-separated capacities (default: 10000)
    /// - `CAPACITY_MODE` - `entries` or `bytes` (default: entries)
    /// - `SAMPLE_SIZE` - Hyperbolic sample size (default: 64)
    /// - `RNG_SEED` - Hyperbolic sampling seed (default: unset, OS-seeded)
    ///
    /// Fails when `CAPACITY_MODE` or `RNG_SEED` is set but unparseable.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            trace_file: env::var("TRACE_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.trace_file),
            policies: env::var("CACHE_POLICIES").unwrap_or(defaults.policies),
            max_capacities: env::var("MAX_CAPACITIES")
                .ok()
                .and_then(|v| parse_list(&v))
                .unwrap_or(defaults.max_capacities),
            capacity_mode: match env::var("CAPACITY_MODE") {
                Ok(v) => v.parse()?,
                Err(_) => defaults.capacity_mode,
            },
            sample_size: env::var("SAMPLE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sample_size),
            seed: env::var("RNG_SEED").ok().map(|v| parse_seed(&v)).transpose()?,
        })
    }

    /// Parses the configured policy names.
    pub fn policies(&self) -> Result<Vec<PolicyKind>> {
        self.policies
            .split(',')
            .filter(|name| !name.trim().is_empty())
            .map(str::parse)
            .collect()
    }
}

fn parse_seed(raw: &str) -> Result<u64> {
    raw.trim().parse().map_err(|_| CacheError::InvalidConfig {
        name: "RNG_SEED",
        value: raw.to_string(),
    })
}

/// Parses a comma-separated list of capacities; None if any entry is invalid.
fn parse_list(raw: &str) -> Option<Vec<usize>> {
    let values: Option<Vec<usize>> = raw
        .split(',')
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.trim().parse().ok())
        .collect();
    values.filter(|v| !v.is_empty())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trace_file: PathBuf::from("traces/cluster052"),
            policies: "fifo,lru,lfu,hyperbolic".to_string(),
            max_capacities: vec![10_000],
            capacity_mode: CapacityMode::Entries,
            sample_size: 64,
            seed: None,
        }
    }
}
