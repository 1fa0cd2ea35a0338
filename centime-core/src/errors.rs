//! Error taxonomy for the engine core.

use thiserror::Error;

/// A malformed pattern value. Logged as a configuration warning; the
/// pattern simply never matches, it must not abort a batch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatternParseError {
    #[error("invalid regex {value:?}: {message}")]
    Regex { value: String, message: String },

    #[error("invalid amount range {0:?}: expected \"min-max\"")]
    AmountRange(String),

    #[error("invalid time window {0:?}: expected \"HH:MM-HH:MM\", \"weekend\" or \"weekday\"")]
    TimeWindow(String),
}

/// Misconfiguration of the engine itself. Unlike pattern errors this is a
/// programming error and propagates out of constructors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("fuzzy_threshold must be in (0, 1], got {0}")]
    FuzzyThreshold(f64),

    #[error("min_confidence must be in (0, 1], got {0}")]
    MinConfidence(f64),

    #[error("item_timeout must be non-zero")]
    ZeroTimeout,

    #[error("normalize_cache_capacity must be non-zero")]
    ZeroCacheCapacity,

    #[error("breaker_failure_threshold must be non-zero")]
    ZeroFailureThreshold,

    #[error("shared resource pool size must be at least 2, got {0}")]
    PoolTooSmall(usize),
}
