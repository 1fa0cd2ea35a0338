//! Transaction value object, supplied by ingestion and consumed read-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One financial transaction record to categorize.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    /// Correlation id; results are keyed back to this.
    pub id: String,
    /// Merchant text as it appears on the statement.
    pub merchant: String,
    /// Free-form description line.
    pub description: String,
    /// Signed amount: positive = charge, negative = credit/refund.
    pub amount: f64,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn new(id: &str, merchant: &str, amount: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            merchant: merchant.to_string(),
            description: String::new(),
            amount,
            currency: "USD".to_string(),
            timestamp,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = currency.to_string();
        self
    }

    /// Combined text used by keyword matching.
    pub fn search_text(&self) -> String {
        if self.description.is_empty() {
            self.merchant.clone()
        } else {
            format!("{} {}", self.merchant, self.description)
        }
    }
}
