//! Parse transaction CSV exports into engine transactions.
//!
//! Expected header: id,timestamp,merchant,description,amount,currency
//! (description and currency optional; timestamp RFC 3339 or
//! "YYYY-MM-DD HH:MM").

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::Path;
use tracing::warn;

use centime_core::transaction::Transaction;

/// Parse a transaction CSV, skipping unparseable rows with a warning.
pub fn parse_transactions_csv(path: impl AsRef<Path>) -> Result<Vec<Transaction>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path.as_ref())
        .with_context(|| format!("opening {}", path.as_ref().display()))?;

    let mut txns = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let id = record.get(0).unwrap_or("").to_string();
        if id.is_empty() {
            continue;
        }

        let Some(timestamp) = parse_timestamp(record.get(1).unwrap_or("")) else {
            warn!(row = row + 2, "unparseable timestamp; row skipped");
            continue;
        };

        let amount: f64 = match record.get(4).unwrap_or("").parse() {
            Ok(a) => a,
            Err(_) => {
                warn!(row = row + 2, "unparseable amount; row skipped");
                continue;
            }
        };

        let mut txn = Transaction::new(&id, record.get(2).unwrap_or(""), amount, timestamp)
            .with_description(record.get(3).unwrap_or(""));
        if let Some(currency) = record.get(5).filter(|c| !c.is_empty()) {
            txn = txn.with_currency(currency);
        }
        txns.push(txn);
    }
    Ok(txns)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M") {
        return Some(naive.and_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
