//! Load a pattern definition file (JSON) into a seeded in-memory store.
//!
//! Format: categories with nested pattern specs:
//! { "categories": [ { "name": "Coffee", "patterns": [
//!     { "kind": "merchant", "value": "starbucks", "weight": 4.0 } ] } ] }

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use centime_core::pattern::{Category, Pattern, PatternKind};
use centime_engine::InMemoryPatternStore;

#[derive(Debug, Deserialize)]
pub struct PatternFile {
    pub categories: Vec<CategorySpec>,
}

#[derive(Debug, Deserialize)]
pub struct CategorySpec {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    pub patterns: Vec<PatternSpec>,
}

#[derive(Debug, Deserialize)]
pub struct PatternSpec {
    pub kind: PatternKind,
    pub value: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_weight() -> f64 {
    1.0
}

fn default_active() -> bool {
    true
}

/// Parse the file and seed a store with its categories and patterns.
/// Returns the store plus a count for reporting.
pub fn load_into_store(path: impl AsRef<Path>) -> Result<(InMemoryPatternStore, usize)> {
    let raw = fs::read_to_string(path.as_ref())
        .with_context(|| format!("reading {}", path.as_ref().display()))?;
    let file: PatternFile = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", path.as_ref().display()))?;

    let store = InMemoryPatternStore::new();
    let mut count = 0usize;
    for spec in file.categories {
        let mut category = Category::new(&spec.name);
        category.icon = spec.icon;
        category.color = spec.color;
        let category_id = category.id;
        store.insert_category(category);

        for p in spec.patterns {
            let mut pattern = Pattern::new(category_id, p.kind, &p.value, p.weight);
            pattern.active = p.active;
            store.insert_pattern(pattern);
            count += 1;
        }
    }
    Ok((store, count))
}

/// Validate every parseable-kind pattern value, returning the problems.
pub fn validate(file: &PatternFile) -> Vec<String> {
    use centime_core::matchers::{parse_amount_range, parse_time_window};

    let mut problems = Vec::new();
    for category in &file.categories {
        for p in &category.patterns {
            let err = match p.kind {
                PatternKind::Regex => regex::Regex::new(&p.value).err().map(|e| e.to_string()),
                PatternKind::AmountRange => parse_amount_range(&p.value).err().map(|e| e.to_string()),
                PatternKind::TimeWindow => parse_time_window(&p.value).err().map(|e| e.to_string()),
                PatternKind::Merchant | PatternKind::Keyword => {
                    if p.value.trim().is_empty() {
                        Some("empty value never matches".to_string())
                    } else {
                        None
                    }
                }
            };
            if let Some(err) = err {
                problems.push(format!("{} / {:?} {:?}: {}", category.name, p.kind, p.value, err));
            }
        }
    }
    problems
}
