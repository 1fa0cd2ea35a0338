//! Confidence scoring: fold all matcher votes into one ranked suggestion.
//!
//! Per category the confidence is the weighted sum of match contributions,
//! normalized by a saturation weight and capped at 1.0. One heavy pattern
//! saturates on its own; several light agreeing patterns add up to the same
//! effect. Aggregation is commutative over matches, so dispatch order never
//! changes the outcome.

use std::collections::HashMap;

use crate::pattern::CategoryId;
use crate::result::{CategorizationResult, CategorizationStatus, MatchResult};
use crate::transaction::Transaction;

/// Weighted contribution at which a category's confidence reaches 1.0.
pub const WEIGHT_SATURATION: f64 = 3.0;

#[derive(Debug)]
struct CategoryVote {
    category_id: CategoryId,
    confidence: f64,
    max_weight: f64,
    max_usage: u64,
}

/// Aggregate match results into a `CategorizationResult`.
///
/// Tie-break between equally confident categories: the one holding the
/// pattern with the higher individual confidence_weight wins, then the one
/// with the larger usage_count (a proxy for proven reliability), then the
/// smaller category id so a full tie still resolves the same way on every
/// run.
pub fn score(
    txn: &Transaction,
    results: Vec<MatchResult>,
    min_confidence: f64,
) -> CategorizationResult {
    let matched: Vec<MatchResult> = results.into_iter().filter(|r| r.matched).collect();
    if matched.is_empty() {
        return CategorizationResult::no_match(&txn.id);
    }

    let mut by_category: HashMap<CategoryId, Vec<&MatchResult>> = HashMap::new();
    for r in &matched {
        by_category.entry(r.category_id).or_default().push(r);
    }

    let mut votes: Vec<CategoryVote> = by_category
        .into_iter()
        .map(|(category_id, group)| {
            let weighted: f64 = group
                .iter()
                .map(|r| r.confidence_weight * r.contribution)
                .sum();
            CategoryVote {
                category_id,
                confidence: (weighted / WEIGHT_SATURATION).min(1.0),
                max_weight: group
                    .iter()
                    .map(|r| r.confidence_weight)
                    .fold(f64::MIN, f64::max),
                max_usage: group.iter().map(|r| r.usage_count).max().unwrap_or(0),
            }
        })
        .collect();

    votes.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then(b.max_weight.total_cmp(&a.max_weight))
            .then(b.max_usage.cmp(&a.max_usage))
            // Grouping is HashMap-based, so a full tie needs an order that
            // does not depend on iteration order.
            .then(a.category_id.0.cmp(&b.category_id.0))
    });

    // Non-empty by construction.
    let Some(winner) = votes.first() else {
        return CategorizationResult::no_match(&txn.id);
    };

    if winner.confidence < min_confidence {
        let mut result = CategorizationResult::no_match(&txn.id);
        result.matches = ordered_matches(matched, winner.category_id);
        return result;
    }

    let category_id = winner.category_id;
    let confidence = winner.confidence;
    CategorizationResult {
        transaction_id: txn.id.clone(),
        category_id: Some(category_id),
        confidence,
        matches: ordered_matches(matched, category_id),
        elapsed: std::time::Duration::ZERO,
        status: CategorizationStatus::Matched,
        reason: None,
    }
}

/// Winning category's contributions, strongest vote first.
fn ordered_matches(matched: Vec<MatchResult>, category_id: CategoryId) -> Vec<MatchResult> {
    let mut contributing: Vec<MatchResult> = matched
        .into_iter()
        .filter(|r| r.category_id == category_id)
        .collect();
    contributing.sort_by(|a, b| {
        (b.confidence_weight * b.contribution).total_cmp(&(a.confidence_weight * a.contribution))
    });
    contributing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PatternId;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn txn() -> Transaction {
        let ts = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();
        Transaction::new("t1", "STARBUCKS", 6.45, ts)
    }

    fn vote(category_id: CategoryId, weight: f64, contribution: f64, usage: u64) -> MatchResult {
        MatchResult {
            pattern_id: PatternId::new(),
            category_id,
            matched: true,
            contribution,
            confidence_weight: weight,
            usage_count: usage,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn no_votes_is_no_match() {
        let res = score(&txn(), vec![], 0.3);
        assert_eq!(res.status, CategorizationStatus::NoMatch);
        assert_eq!(res.category_id, None);
    }

    #[test]
    fn single_heavy_vote_saturates() {
        let cat = CategoryId::new();
        let res = score(&txn(), vec![vote(cat, 4.0, 0.95, 10)], 0.3);
        assert_eq!(res.status, CategorizationStatus::Matched);
        assert_eq!(res.category_id, Some(cat));
        assert_eq!(res.confidence, 1.0);
        assert_eq!(res.matches.len(), 1);
    }

    #[test]
    fn single_light_vote_scores_proportionally() {
        let cat = CategoryId::new();
        let res = score(&txn(), vec![vote(cat, 1.5, 1.0, 0)], 0.3);
        assert_eq!(res.status, CategorizationStatus::Matched);
        assert!((res.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn below_floor_is_no_match() {
        let cat = CategoryId::new();
        let res = score(&txn(), vec![vote(cat, 0.5, 1.0, 0)], 0.3);
        assert_eq!(res.status, CategorizationStatus::NoMatch);
        assert_eq!(res.category_id, None);
        // Contributing list kept for diagnostics even below the floor.
        assert_eq!(res.matches.len(), 1);
    }

    #[test]
    fn agreement_raises_confidence() {
        let cat = CategoryId::new();
        let one = score(&txn(), vec![vote(cat, 1.0, 0.8, 0)], 0.1).confidence;
        let two = score(
            &txn(),
            vec![vote(cat, 1.0, 0.8, 0), vote(cat, 1.0, 0.8, 0)],
            0.1,
        )
        .confidence;
        assert!(two > one);
        assert!(two <= 1.0);
    }

    #[test]
    fn confidence_is_capped_at_one() {
        let cat = CategoryId::new();
        let votes = (0..5).map(|_| vote(cat, 5.0, 1.0, 0)).collect();
        let res = score(&txn(), votes, 0.3);
        assert_eq!(res.confidence, 1.0);
    }

    #[test]
    fn order_of_votes_does_not_matter() {
        let a = CategoryId::new();
        let b = CategoryId::new();
        let votes = vec![vote(a, 2.0, 0.9, 3), vote(b, 1.0, 1.0, 8), vote(a, 1.0, 0.7, 1)];
        let mut reversed = votes.clone();
        reversed.reverse();
        let r1 = score(&txn(), votes, 0.3);
        let r2 = score(&txn(), reversed, 0.3);
        assert_eq!(r1.category_id, r2.category_id);
        assert_eq!(r1.confidence, r2.confidence);
    }

    #[test]
    fn tie_breaks_on_max_weight_then_usage() {
        let a = CategoryId::new();
        let b = CategoryId::new();
        // Equal weighted sums; category b holds the heavier single pattern.
        let res = score(
            &txn(),
            vec![
                vote(a, 1.0, 0.8, 0),
                vote(a, 1.0, 0.8, 0),
                vote(b, 2.0, 0.8, 0),
            ],
            0.1,
        );
        assert_eq!(res.category_id, Some(b));

        // Equal confidence and weight: larger usage_count wins.
        let res = score(&txn(), vec![vote(a, 1.0, 0.8, 2), vote(b, 1.0, 0.8, 9)], 0.1);
        assert_eq!(res.category_id, Some(b));
    }

    #[test]
    fn full_ties_resolve_the_same_way_on_every_run() {
        let a = CategoryId::new();
        let b = CategoryId::new();
        let expected = if a.0 <= b.0 { a } else { b };
        // Identical weight, contribution and usage: the winner must not
        // depend on map iteration order.
        for _ in 0..100 {
            let res = score(&txn(), vec![vote(a, 1.5, 1.0, 0), vote(b, 1.5, 1.0, 0)], 0.3);
            assert_eq!(res.category_id, Some(expected));
        }
    }

    #[test]
    fn unmatched_votes_are_dropped() {
        let cat = CategoryId::new();
        let mut miss = vote(cat, 9.0, 0.0, 0);
        miss.matched = false;
        let res = score(&txn(), vec![miss, vote(cat, 2.0, 0.9, 0)], 0.1);
        assert_eq!(res.matches.len(), 1);
        assert!((res.confidence - 0.6).abs() < 1e-9);
    }
}
