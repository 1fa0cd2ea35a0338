//! Pattern and category model: stored rules that vote on a transaction's category.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity for a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternId(pub Uuid);

impl PatternId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PatternId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Stable identity for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub Uuid);

impl CategoryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CategoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The closed set of matcher strategies. Adding a kind is an explicit,
/// reviewable change: every `match` over this enum is exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Merchant,
    Keyword,
    Regex,
    AmountRange,
    TimeWindow,
}

impl PatternKind {
    /// All kinds, for iteration.
    pub const ALL: [PatternKind; 5] = [
        Self::Merchant,
        Self::Keyword,
        Self::Regex,
        Self::AmountRange,
        Self::TimeWindow,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Merchant => "merchant",
            Self::Keyword => "keyword",
            Self::Regex => "regex",
            Self::AmountRange => "amount_range",
            Self::TimeWindow => "time_window",
        }
    }
}

/// A stored rule that tests whether a transaction belongs to a category.
///
/// `value` is interpreted per `kind`: a merchant/keyword literal, a regex,
/// a "min-max" amount range, or an "HH:MM-HH:MM"/named time window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pattern {
    pub id: PatternId,
    pub category_id: CategoryId,
    pub kind: PatternKind,
    pub value: String,
    /// Default contribution to confidence scoring.
    pub confidence_weight: f64,
    /// Deactivation is the only engine-visible removal.
    pub active: bool,
    /// True when inferred from a user correction rather than admin-created.
    pub user_created: bool,
    pub usage_count: u64,
    pub success_count: u64,
    /// Free-form metadata; the engine never interprets it.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Pattern {
    pub fn new(category_id: CategoryId, kind: PatternKind, value: &str, weight: f64) -> Self {
        Self {
            id: PatternId::new(),
            category_id,
            kind,
            value: value.to_string(),
            confidence_weight: weight,
            active: true,
            user_created: false,
            usage_count: 0,
            success_count: 0,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn user_created(mut self) -> Self {
        self.user_created = true;
        self
    }

    /// Always derived from the counts, never stored independently.
    pub fn success_rate(&self) -> f64 {
        if self.usage_count == 0 {
            0.0
        } else {
            self.success_count as f64 / self.usage_count as f64
        }
    }

    /// Record one categorization outcome. Usage always increments;
    /// success only on a confirmed-correct outcome, so
    /// `usage_count >= success_count` holds by construction.
    pub fn record_use(&mut self, accepted: bool) {
        self.usage_count += 1;
        if accepted {
            self.success_count += 1;
        }
    }
}

/// A spending category. A pattern belongs to exactly one category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Display metadata for consumers; unused by the engine.
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl Category {
    pub fn new(name: &str) -> Self {
        Self {
            id: CategoryId::new(),
            name: name.to_string(),
            icon: None,
            color: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_rate_is_zero_without_usage() {
        let p = Pattern::new(CategoryId::new(), PatternKind::Keyword, "coffee", 1.0);
        assert_eq!(p.usage_count, 0);
        assert_eq!(p.success_rate(), 0.0);
    }

    #[test]
    fn success_rate_tracks_counts() {
        let mut p = Pattern::new(CategoryId::new(), PatternKind::Merchant, "starbucks", 2.0);
        p.record_use(true);
        p.record_use(true);
        p.record_use(false);
        assert_eq!(p.usage_count, 3);
        assert_eq!(p.success_count, 2);
        assert!((p.success_rate() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn usage_never_below_success() {
        let mut p = Pattern::new(CategoryId::new(), PatternKind::Keyword, "rent", 1.0);
        for i in 0..20 {
            p.record_use(i % 3 == 0);
            assert!(p.usage_count >= p.success_count);
        }
    }

    #[test]
    fn kind_round_trips_through_serde() {
        for kind in PatternKind::ALL {
            let raw = serde_json::to_string(&kind).unwrap();
            let back: PatternKind = serde_json::from_str(&raw).unwrap();
            assert_eq!(kind, back);
        }
        assert_eq!(
            serde_json::to_string(&PatternKind::AmountRange).unwrap(),
            "\"amount_range\""
        );
    }
}
