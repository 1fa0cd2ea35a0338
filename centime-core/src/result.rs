//! Match and categorization result types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::pattern::{CategoryId, PatternId};

/// Outcome of evaluating one pattern against one transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    pub pattern_id: PatternId,
    pub category_id: CategoryId,
    pub matched: bool,
    /// Local confidence contribution in [0,1]; 0 when unmatched.
    pub contribution: f64,
    /// Copied from the pattern so scoring needs no second lookup.
    pub confidence_weight: f64,
    pub usage_count: u64,
    /// Wall time for this single evaluation.
    pub elapsed: Duration,
}

/// Terminal status of one transaction's categorization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CategorizationStatus {
    Matched,
    NoMatch,
    Error,
    Timeout,
}

/// The engine's answer for one transaction. Never persisted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategorizationResult {
    pub transaction_id: String,
    pub category_id: Option<CategoryId>,
    /// Aggregate confidence in [0,1].
    pub confidence: f64,
    /// Contributing matches, strongest vote first.
    pub matches: Vec<MatchResult>,
    pub elapsed: Duration,
    pub status: CategorizationStatus,
    /// Diagnostic reason for `error` results.
    #[serde(default)]
    pub reason: Option<String>,
}

impl CategorizationResult {
    pub fn no_match(transaction_id: &str) -> Self {
        Self {
            transaction_id: transaction_id.to_string(),
            category_id: None,
            confidence: 0.0,
            matches: Vec::new(),
            elapsed: Duration::ZERO,
            status: CategorizationStatus::NoMatch,
            reason: None,
        }
    }

    pub fn timeout(transaction_id: &str, elapsed: Duration) -> Self {
        Self {
            transaction_id: transaction_id.to_string(),
            category_id: None,
            confidence: 0.0,
            matches: Vec::new(),
            elapsed,
            status: CategorizationStatus::Timeout,
            reason: None,
        }
    }

    pub fn error(transaction_id: &str, reason: &str) -> Self {
        Self {
            transaction_id: transaction_id.to_string(),
            category_id: None,
            confidence: 0.0,
            matches: Vec::new(),
            elapsed: Duration::ZERO,
            status: CategorizationStatus::Error,
            reason: Some(reason.to_string()),
        }
    }

    pub fn is_matched(&self) -> bool {
        self.status == CategorizationStatus::Matched
    }
}
