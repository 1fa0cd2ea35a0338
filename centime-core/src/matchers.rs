//! The five matcher strategies, dispatched exhaustively by `PatternKind`.
//!
//! Every matcher is pure: one pattern against one transaction, returning a
//! `MatchResult`. Malformed pattern values never match and never abort the
//! batch; they are logged as configuration warnings.

use chrono::{Datelike, NaiveTime, Timelike, Weekday};
use regex::Regex;
use std::time::Instant;
use tracing::warn;

use crate::errors::PatternParseError;
use crate::fuzzy;
use crate::normalize::Normalizer;
use crate::pattern::{Pattern, PatternKind};
use crate::result::MatchResult;
use crate::transaction::Transaction;

/// Shared matcher inputs: the process-wide normalizer plus the configured
/// fuzzy acceptance threshold.
pub struct MatcherContext<'a> {
    pub normalizer: &'a Normalizer,
    pub fuzzy_threshold: f64,
}

/// Evaluate one pattern against one transaction.
pub fn evaluate(pattern: &Pattern, txn: &Transaction, ctx: &MatcherContext<'_>) -> MatchResult {
    let start = Instant::now();
    let (matched, contribution) = match pattern.kind {
        PatternKind::Merchant => match_merchant(pattern, txn, ctx),
        PatternKind::Keyword => match_keyword(pattern, txn, ctx),
        PatternKind::Regex => match_regex(pattern, txn),
        PatternKind::AmountRange => match_amount_range(pattern, txn),
        PatternKind::TimeWindow => match_time_window(pattern, txn),
    };

    MatchResult {
        pattern_id: pattern.id,
        category_id: pattern.category_id,
        matched,
        contribution,
        confidence_weight: pattern.confidence_weight,
        usage_count: pattern.usage_count,
        elapsed: start.elapsed(),
    }
}

/// Normalized equality, or fuzzy similarity at/above the threshold.
/// Contribution scales with similarity.
fn match_merchant(pattern: &Pattern, txn: &Transaction, ctx: &MatcherContext<'_>) -> (bool, f64) {
    let merchant = ctx.normalizer.normalize(&txn.merchant);
    let value = ctx.normalizer.normalize(&pattern.value);
    if merchant.is_empty() || value.is_empty() {
        return (false, 0.0);
    }
    if merchant == value {
        return (true, 1.0);
    }
    // Statement merchants carry store numbers and processor prefixes:
    // "STARBUCKS #4521" should still hit a "starbucks" pattern, so compare
    // the leading tokens of the longer side as well as the whole string.
    let head: String = merchant
        .split_whitespace()
        .take(value.split_whitespace().count().max(1))
        .collect::<Vec<_>>()
        .join(" ");
    let sim = fuzzy::similarity(&merchant, &value).max(fuzzy::similarity(&head, &value));
    if sim >= ctx.fuzzy_threshold {
        (true, sim)
    } else {
        (false, 0.0)
    }
}

/// Normalized pattern value as token or substring of the transaction text.
fn match_keyword(pattern: &Pattern, txn: &Transaction, ctx: &MatcherContext<'_>) -> (bool, f64) {
    let haystack = ctx.normalizer.normalize(&txn.search_text());
    let needle = ctx.normalizer.normalize(&pattern.value);
    if needle.is_empty() || haystack.is_empty() {
        return (false, 0.0);
    }
    let hit =
        haystack.split_whitespace().any(|token| token == needle) || haystack.contains(&needle);
    (hit, if hit { 1.0 } else { 0.0 })
}

/// Regex against the raw (un-normalized) transaction text.
fn match_regex(pattern: &Pattern, txn: &Transaction) -> (bool, f64) {
    let re = match Regex::new(&pattern.value) {
        Ok(re) => re,
        Err(err) => {
            warn_malformed(
                pattern,
                &PatternParseError::Regex {
                    value: pattern.value.clone(),
                    message: err.to_string(),
                },
            );
            return (false, 0.0);
        }
    };
    let hit = re.is_match(&txn.merchant) || re.is_match(&txn.description);
    (hit, if hit { 1.0 } else { 0.0 })
}

/// Inclusive "min-max" amount range.
fn match_amount_range(pattern: &Pattern, txn: &Transaction) -> (bool, f64) {
    match parse_amount_range(&pattern.value) {
        Ok((min, max)) => {
            let hit = txn.amount >= min && txn.amount <= max;
            (hit, if hit { 1.0 } else { 0.0 })
        }
        Err(err) => {
            warn_malformed(pattern, &err);
            (false, 0.0)
        }
    }
}

/// Clock window (wrap-around supported) or named day predicate.
fn match_time_window(pattern: &Pattern, txn: &Transaction) -> (bool, f64) {
    match parse_time_window(&pattern.value) {
        Ok(window) => {
            let hit = window.contains(txn);
            (hit, if hit { 1.0 } else { 0.0 })
        }
        Err(err) => {
            warn_malformed(pattern, &err);
            (false, 0.0)
        }
    }
}

fn warn_malformed(pattern: &Pattern, err: &PatternParseError) {
    warn!(
        pattern_id = %pattern.id,
        kind = pattern.kind.as_str(),
        error = %err,
        "malformed pattern value; treating as non-matching"
    );
}

/// Parse "min-max". The separator is the `-` that follows the first number,
/// so negative bounds like "-100.00--10.00" parse as (-100.00, -10.00).
pub fn parse_amount_range(value: &str) -> Result<(f64, f64), PatternParseError> {
    let raw = value.trim();
    for (i, ch) in raw.char_indices().skip(1) {
        if ch != '-' {
            continue;
        }
        let (lo, hi) = (&raw[..i], &raw[i + 1..]);
        if let (Ok(lo), Ok(hi)) = (lo.trim().parse::<f64>(), hi.trim().parse::<f64>()) {
            if lo <= hi {
                return Ok((lo, hi));
            }
            return Err(PatternParseError::AmountRange(value.to_string()));
        }
    }
    Err(PatternParseError::AmountRange(value.to_string()))
}

/// A parsed time-window pattern value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    /// Inclusive clock window; wraps midnight when start > end.
    Clock(NaiveTime, NaiveTime),
    Weekend,
    Weekday,
}

impl TimeWindow {
    pub fn contains(&self, txn: &Transaction) -> bool {
        match self {
            TimeWindow::Clock(start, end) => {
                let t = txn.timestamp.time();
                // Compare at minute granularity so "02:00" still admits 02:00:59.
                let t = NaiveTime::from_hms_opt(t.hour(), t.minute(), 0).unwrap_or(t);
                if start <= end {
                    t >= *start && t <= *end
                } else {
                    t >= *start || t <= *end
                }
            }
            TimeWindow::Weekend => {
                matches!(txn.timestamp.weekday(), Weekday::Sat | Weekday::Sun)
            }
            TimeWindow::Weekday => {
                !matches!(txn.timestamp.weekday(), Weekday::Sat | Weekday::Sun)
            }
        }
    }
}

/// Parse "HH:MM-HH:MM" or a named token (`weekend`, `weekday`).
pub fn parse_time_window(value: &str) -> Result<TimeWindow, PatternParseError> {
    let raw = value.trim();
    match raw.to_ascii_lowercase().as_str() {
        "weekend" => return Ok(TimeWindow::Weekend),
        "weekday" => return Ok(TimeWindow::Weekday),
        _ => {}
    }
    let Some((start, end)) = raw.split_once('-') else {
        return Err(PatternParseError::TimeWindow(value.to_string()));
    };
    let start = NaiveTime::parse_from_str(start.trim(), "%H:%M")
        .map_err(|_| PatternParseError::TimeWindow(value.to_string()))?;
    let end = NaiveTime::parse_from_str(end.trim(), "%H:%M")
        .map_err(|_| PatternParseError::TimeWindow(value.to_string()))?;
    Ok(TimeWindow::Clock(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::pattern::{CategoryId, Pattern, PatternKind};

    fn ctx(normalizer: &Normalizer) -> MatcherContext<'_> {
        MatcherContext {
            normalizer,
            fuzzy_threshold: 0.85,
        }
    }

    fn txn_at(merchant: &str, amount: f64, y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Transaction {
        let ts = Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap();
        Transaction::new("t1", merchant, amount, ts)
    }

    #[test]
    fn merchant_matches_exact_normalized() {
        let n = Normalizer::new();
        let p = Pattern::new(CategoryId::new(), PatternKind::Merchant, "Starbucks", 4.0);
        let t = txn_at("STARBUCKS", 6.45, 2026, 3, 14, 12, 0);
        let res = evaluate(&p, &t, &ctx(&n));
        assert!(res.matched);
        assert_eq!(res.contribution, 1.0);
    }

    #[test]
    fn merchant_matches_store_number_suffix() {
        let n = Normalizer::new();
        let p = Pattern::new(CategoryId::new(), PatternKind::Merchant, "starbucks", 4.0);
        let t = txn_at("STARBUCKS #4521", 6.45, 2026, 3, 14, 12, 0);
        let res = evaluate(&p, &t, &ctx(&n));
        assert!(res.matched);
        assert!(res.contribution >= 0.85);
    }

    #[test]
    fn merchant_fuzzy_matches_typo() {
        let n = Normalizer::new();
        let p = Pattern::new(CategoryId::new(), PatternKind::Merchant, "starbucks", 4.0);
        let t = txn_at("STARBCKS", 6.45, 2026, 3, 14, 12, 0);
        let res = evaluate(&p, &t, &ctx(&n));
        assert!(res.matched);
        assert!(res.contribution > 0.85 && res.contribution < 1.0);
    }

    #[test]
    fn merchant_rejects_different_merchant() {
        let n = Normalizer::new();
        let p = Pattern::new(CategoryId::new(), PatternKind::Merchant, "starbucks", 4.0);
        let t = txn_at("TARGET T-0482", 31.99, 2026, 3, 14, 12, 0);
        let res = evaluate(&p, &t, &ctx(&n));
        assert!(!res.matched);
        assert_eq!(res.contribution, 0.0);
    }

    #[test]
    fn keyword_matches_token_in_description() {
        let n = Normalizer::new();
        let p = Pattern::new(CategoryId::new(), PatternKind::Keyword, "tuition", 3.0);
        let t = txn_at("TEXAS STATE UNIV", 2100.0, 2026, 1, 12, 9, 0)
            .with_description("Fall tuition installment");
        assert!(evaluate(&p, &t, &ctx(&n)).matched);
    }

    #[test]
    fn keyword_misses_absent_word() {
        let n = Normalizer::new();
        let p = Pattern::new(CategoryId::new(), PatternKind::Keyword, "grocery", 1.0);
        let t = txn_at("SHELL OIL 5742", 40.0, 2026, 1, 12, 9, 0);
        assert!(!evaluate(&p, &t, &ctx(&n)).matched);
    }

    #[test]
    fn regex_matches_raw_text() {
        let n = Normalizer::new();
        let p = Pattern::new(CategoryId::new(), PatternKind::Regex, r"(?i)uber\s*\*?(trip|eats)", 2.0);
        let t = txn_at("UBER *TRIP 8XKQZ", 18.40, 2026, 3, 14, 12, 0);
        assert!(evaluate(&p, &t, &ctx(&n)).matched);
    }

    #[test]
    fn invalid_regex_never_matches() {
        let n = Normalizer::new();
        let p = Pattern::new(CategoryId::new(), PatternKind::Regex, "([unclosed", 2.0);
        let t = txn_at("ANYTHING", 1.0, 2026, 3, 14, 12, 0);
        let res = evaluate(&p, &t, &ctx(&n));
        assert!(!res.matched);
        assert_eq!(res.contribution, 0.0);
    }

    #[test]
    fn amount_range_parses_positive_and_negative() {
        assert_eq!(parse_amount_range("10-20").unwrap(), (10.0, 20.0));
        assert_eq!(parse_amount_range("10.50-99.99").unwrap(), (10.5, 99.99));
        assert_eq!(parse_amount_range("-100.00--10.00").unwrap(), (-100.0, -10.0));
        assert_eq!(parse_amount_range("-5-5").unwrap(), (-5.0, 5.0));
        assert!(parse_amount_range("20-10").is_err());
        assert!(parse_amount_range("ten-twenty").is_err());
        assert!(parse_amount_range("42").is_err());
    }

    #[test]
    fn negative_amount_range_matches_inclusively() {
        let n = Normalizer::new();
        let p = Pattern::new(CategoryId::new(), PatternKind::AmountRange, "-100.00--10.00", 1.0);
        let hit = txn_at("X", -50.0, 2026, 3, 14, 12, 0);
        let low = txn_at("X", -150.0, 2026, 3, 14, 12, 0);
        let high = txn_at("X", -5.0, 2026, 3, 14, 12, 0);
        let edge = txn_at("X", -100.0, 2026, 3, 14, 12, 0);
        assert!(evaluate(&p, &hit, &ctx(&n)).matched);
        assert!(!evaluate(&p, &low, &ctx(&n)).matched);
        assert!(!evaluate(&p, &high, &ctx(&n)).matched);
        assert!(evaluate(&p, &edge, &ctx(&n)).matched);
    }

    #[test]
    fn time_window_wraps_midnight() {
        let n = Normalizer::new();
        let p = Pattern::new(CategoryId::new(), PatternKind::TimeWindow, "22:00-02:00", 1.0);
        let late = txn_at("BAR", 12.0, 2026, 3, 13, 23, 30);
        let early = txn_at("BAR", 12.0, 2026, 3, 14, 1, 0);
        let noon = txn_at("BAR", 12.0, 2026, 3, 14, 12, 0);
        assert!(evaluate(&p, &late, &ctx(&n)).matched);
        assert!(evaluate(&p, &early, &ctx(&n)).matched);
        assert!(!evaluate(&p, &noon, &ctx(&n)).matched);
    }

    #[test]
    fn weekend_token_matches_saturday_not_wednesday() {
        let n = Normalizer::new();
        let p = Pattern::new(CategoryId::new(), PatternKind::TimeWindow, "weekend", 1.5);
        // 2026-03-14 is a Saturday, 2026-03-11 a Wednesday.
        let saturday = txn_at("CINEMA", 30.0, 2026, 3, 14, 19, 0);
        let wednesday = txn_at("CINEMA", 30.0, 2026, 3, 11, 19, 0);
        assert!(evaluate(&p, &saturday, &ctx(&n)).matched);
        assert!(!evaluate(&p, &wednesday, &ctx(&n)).matched);
    }

    #[test]
    fn weekday_token_is_the_complement() {
        let wednesday = txn_at("LUNCH", 12.0, 2026, 3, 11, 12, 0);
        let sunday = txn_at("LUNCH", 12.0, 2026, 3, 15, 12, 0);
        let w = parse_time_window("weekday").unwrap();
        assert!(w.contains(&wednesday));
        assert!(!w.contains(&sunday));
    }

    #[test]
    fn malformed_time_window_never_matches() {
        let n = Normalizer::new();
        let p = Pattern::new(CategoryId::new(), PatternKind::TimeWindow, "25:00-26:00", 1.0);
        let t = txn_at("X", 1.0, 2026, 3, 14, 12, 0);
        assert!(!evaluate(&p, &t, &ctx(&n)).matched);
        assert!(parse_time_window("noonish").is_err());
    }
}
