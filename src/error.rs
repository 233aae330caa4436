//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache construction and trace replay.
///
/// Lookups and insertions never fail with an error: a miss or a rejected
/// admission is reported through the boolean result of the operation.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Hyperbolic sample size exceeds what the cache can ever hold
    #[error("Sample size {sample_size} exceeds max capacity {max_capacity}")]
    SampleSizeTooLarge {
        sample_size: usize,
        max_capacity: usize,
    },

    /// Hyperbolic cache with room for entries but nothing to sample
    #[error("Sample size must be positive for a cache with capacity {0}")]
    ZeroSampleSize(usize),

    /// Policy name not recognised
    #[error("Unknown eviction policy: {0}")]
    UnknownPolicy(String),

    /// Capacity mode name not recognised
    #[error("Unknown capacity mode: {0}")]
    UnknownCapacityMode(String),

    /// Environment variable set to a value that cannot be parsed
    #[error("Invalid value for {name}: {value:?}")]
    InvalidConfig { name: &'static str, value: String },

    /// Trace record could not be parsed
    #[error("Malformed trace record at line {line}: {reason}")]
    MalformedTrace { line: usize, reason: String },

    /// Cache refused to admit a key during replay
    #[error("Cache rejected key: {0}")]
    Rejected(String),

    /// Background replay task panicked or was cancelled
    #[error("Replay task failed: {0}")]
    TaskFailed(String),

    /// I/O error while reading a trace
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::SampleSizeTooLarge {
            sample_size: 8,
            max_capacity: 4,
        };
        assert_eq!(err.to_string(), "Sample size 8 exceeds max capacity 4");

        let err = CacheError::MalformedTrace {
            line: 3,
            reason: "expected 7 fields, found 2".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed trace record at line 3: expected 7 fields, found 2"
        );

        let err = CacheError::InvalidConfig {
            name: "RNG_SEED",
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid value for RNG_SEED: \"abc\"");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no trace");
        let err: CacheError = io_err.into();
        assert!(matches!(err, CacheError::Io(_)));
    }
}
