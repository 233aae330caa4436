//! Trace Module
//!
//! Parses cache access traces in the Twitter cache-trace CSV layout:
//!
//! ```text
//! timestamp,key,key_size,value_size,client_id,operation,ttl
//! 0,nz:u:eeW511W3dcH3de3d15ec,32,52,1,get,0
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use crate::cache::Timestamp;
use crate::error::{CacheError, Result};

/// Number of comma-separated fields in a trace record.
const FIELD_COUNT: usize = 7;

// == Trace Operation ==
/// Operation recorded in a trace line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceOp {
    Get,
    Set,
    /// Any other memcached command; replay skips these
    Other(String),
}

impl TraceOp {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "get" => TraceOp::Get,
            "set" => TraceOp::Set,
            other => TraceOp::Other(other.to_string()),
        }
    }
}

// == Capacity Mode ==
/// How replay charges admissions against cache capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityMode {
    /// Every entry weighs 1; capacity is an entry count
    #[default]
    Entries,
    /// Entries weigh `key_size + value_size`; capacity is a byte budget
    Bytes,
}

impl CapacityMode {
    pub fn name(self) -> &'static str {
        match self {
            CapacityMode::Entries => "entries",
            CapacityMode::Bytes => "bytes",
        }
    }
}

impl fmt::Display for CapacityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CapacityMode {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "entries" => Ok(CapacityMode::Entries),
            "bytes" => Ok(CapacityMode::Bytes),
            _ => Err(CacheError::UnknownCapacityMode(s.trim().to_string())),
        }
    }
}

// == Trace Event ==
/// One parsed trace record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub timestamp: Timestamp,
    pub key: String,
    pub key_size: u32,
    pub value_size: u32,
    pub client_id: String,
    pub op: TraceOp,
    pub ttl: u64,
}

impl TraceEvent {
    /// Parses a single record. `line` is 1-based and only used for errors.
    pub fn parse(line: usize, record: &str) -> Result<Self> {
        let fields: Vec<&str> = record.trim().split(',').map(str::trim).collect();
        if fields.len() != FIELD_COUNT {
            return Err(malformed(
                line,
                format!("expected {} fields, found {}", FIELD_COUNT, fields.len()),
            ));
        }
        if fields[1].is_empty() {
            return Err(malformed(line, "empty key".to_string()));
        }

        Ok(Self {
            timestamp: parse_number(line, "timestamp", fields[0])?,
            key: fields[1].to_string(),
            key_size: parse_number(line, "key size", fields[2])?,
            value_size: parse_number(line, "value size", fields[3])?,
            client_id: fields[4].to_string(),
            op: TraceOp::parse(fields[5]),
            ttl: parse_number(line, "ttl", fields[6])?,
        })
    }

    /// Weight charged for admitting this event under `mode`.
    pub fn weight(&self, mode: CapacityMode) -> usize {
        match mode {
            CapacityMode::Entries => 1,
            CapacityMode::Bytes => self.key_size as usize + self.value_size as usize,
        }
    }
}

fn malformed(line: usize, reason: String) -> CacheError {
    CacheError::MalformedTrace { line, reason }
}

fn parse_number<T: std::str::FromStr>(line: usize, field: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| malformed(line, format!("invalid {}: {:?}", field, raw)))
}

// == Parse Trace ==
/// Parses a whole trace, skipping blank lines.
///
/// Stops at the first malformed record.
pub fn parse_trace(contents: &str) -> Result<Vec<TraceEvent>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, record)| !record.trim().is_empty())
        .map(|(idx, record)| TraceEvent::parse(idx + 1, record))
        .collect()
}

// == Load Trace ==
/// Reads and parses a trace file.
pub async fn load_trace(path: impl AsRef<Path>) -> Result<Vec<TraceEvent>> {
    let contents = tokio::fs::read_to_string(path).await?;
    parse_trace(&contents)
}
