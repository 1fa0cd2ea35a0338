//! Engine configuration. The fuzzy acceptance threshold and the minimum
//! confidence floor are deliberately configuration, not constants.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Fuzzy similarity a merchant pattern must reach to count as a match.
    pub fuzzy_threshold: f64,
    /// Categories below this aggregate confidence yield `no_match`.
    pub min_confidence: f64,
    /// Per-item evaluation budget; exceeding it yields a `timeout` result.
    pub item_timeout: Duration,
    /// Capacity of the normalizer's bounded cache.
    pub normalize_cache_capacity: usize,
    /// Consecutive shared-tier failures before the circuit opens.
    pub breaker_failure_threshold: u32,
    /// How long an open circuit rejects calls before probing recovery.
    pub breaker_cooldown: Duration,
    /// Batches at or below this size use direct dispatch instead of the
    /// persistent worker pool.
    pub small_batch_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.85,
            min_confidence: 0.3,
            item_timeout: Duration::from_millis(25),
            normalize_cache_capacity: 1000,
            breaker_failure_threshold: 5,
            breaker_cooldown: Duration::from_secs(30),
            small_batch_limit: 50,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fuzzy_threshold > 0.0 && self.fuzzy_threshold <= 1.0) {
            return Err(ConfigError::FuzzyThreshold(self.fuzzy_threshold));
        }
        if !(self.min_confidence > 0.0 && self.min_confidence <= 1.0) {
            return Err(ConfigError::MinConfidence(self.min_confidence));
        }
        if self.item_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.normalize_cache_capacity == 0 {
            return Err(ConfigError::ZeroCacheCapacity);
        }
        if self.breaker_failure_threshold == 0 {
            return Err(ConfigError::ZeroFailureThreshold);
        }
        Ok(())
    }
}
