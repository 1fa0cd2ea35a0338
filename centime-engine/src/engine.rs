//! Categorization orchestrator: cache fetch, matcher dispatch, scoring,
//! all under a strict per-item timeout.

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::warn;

use centime_core::config::EngineConfig;
use centime_core::errors::ConfigError;
use centime_core::matchers::{self, MatcherContext};
use centime_core::normalize::Normalizer;
use centime_core::result::{CategorizationResult, CategorizationStatus};
use centime_core::scorer;
use centime_core::transaction::Transaction;

use crate::cache::PatternCache;

/// Monotonic engine counters.
#[derive(Debug, Default)]
pub struct EngineStats {
    processed: AtomicU64,
    matched: AtomicU64,
    no_match: AtomicU64,
    timeouts: AtomicU64,
    errors: AtomicU64,
    cache_degraded: AtomicU64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct EngineStatsSnapshot {
    pub processed: u64,
    pub matched: u64,
    pub no_match: u64,
    pub timeouts: u64,
    pub errors: u64,
    /// Times the engine fell back to an empty pattern set.
    pub cache_degraded: u64,
}

impl EngineStats {
    fn record(&self, status: CategorizationStatus) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        let counter = match status {
            CategorizationStatus::Matched => &self.matched,
            CategorizationStatus::NoMatch => &self.no_match,
            CategorizationStatus::Timeout => &self.timeouts,
            CategorizationStatus::Error => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            matched: self.matched.load(Ordering::Relaxed),
            no_match: self.no_match.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            cache_degraded: self.cache_degraded.load(Ordering::Relaxed),
        }
    }
}

pub struct CategorizationEngine {
    cache: Arc<PatternCache>,
    normalizer: Normalizer,
    config: EngineConfig,
    stats: EngineStats,
}

impl CategorizationEngine {
    pub fn new(cache: Arc<PatternCache>, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            cache,
            normalizer: Normalizer::with_capacity(config.normalize_cache_capacity),
            config,
            stats: EngineStats::default(),
        })
    }

    /// Categorize one transaction within the configured per-item budget.
    ///
    /// Cache failure or an open circuit degrades to an empty candidate set
    /// (result leans `no_match`); exceeding the budget yields a `timeout`
    /// result. Neither propagates as a hard error.
    pub async fn categorize(&self, txn: &Transaction) -> CategorizationResult {
        let start = Instant::now();
        let mut result = match tokio::time::timeout(
            self.config.item_timeout,
            self.categorize_inner(txn),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => CategorizationResult::timeout(&txn.id, start.elapsed()),
        };
        result.elapsed = start.elapsed();
        self.stats.record(result.status);
        result
    }

    async fn categorize_inner(&self, txn: &Transaction) -> CategorizationResult {
        let patterns = match self.cache.active_patterns(None) {
            Ok(patterns) => patterns,
            Err(err) => {
                warn!(
                    transaction = %txn.id,
                    error = %err,
                    "pattern cache unavailable; degrading to empty candidate set"
                );
                self.stats.cache_degraded.fetch_add(1, Ordering::Relaxed);
                Vec::new()
            }
        };

        let ctx = MatcherContext {
            normalizer: &self.normalizer,
            fuzzy_threshold: self.config.fuzzy_threshold,
        };

        let mut results = Vec::with_capacity(patterns.len());
        for pattern in patterns.iter().filter(|p| p.active) {
            results.push(matchers::evaluate(pattern, txn, &ctx));
            // Cooperative cancellation point so the timeout can fire
            // between pattern evaluations.
            tokio::task::yield_now().await;
        }

        scorer::score(txn, results, self.config.min_confidence)
    }

    pub fn stats(&self) -> EngineStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &PatternCache {
        &self.cache
    }
}
