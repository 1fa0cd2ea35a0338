//! Pattern source-of-truth contract and an in-memory implementation.
//!
//! A relational store is a drop-in `PatternStore` impl; the engine only
//! needs active-pattern reads and per-pattern atomic outcome updates.

use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

use centime_core::pattern::{Category, CategoryId, Pattern, PatternId};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("pattern store unavailable: {0}")]
    Unavailable(String),

    #[error("unknown pattern {0}")]
    UnknownPattern(PatternId),
}

/// Contract with the excluded persistence layer.
pub trait PatternStore: Send + Sync {
    /// Active patterns, optionally restricted to one category.
    fn load_active(&self, category: Option<CategoryId>) -> Result<Vec<Pattern>, StoreError>;

    /// Look up one pattern regardless of active flag.
    fn get(&self, id: PatternId) -> Result<Option<Pattern>, StoreError>;

    /// Record one outcome as an atomic unit: usage always increments,
    /// success only when accepted. Maps to a single optimistic-counter
    /// UPDATE in a relational impl.
    fn record_outcome(&self, id: PatternId, accepted: bool) -> Result<(), StoreError>;
}

/// In-memory store used by tests and the CLI.
#[derive(Debug, Default)]
pub struct InMemoryPatternStore {
    patterns: RwLock<HashMap<PatternId, Pattern>>,
    categories: RwLock<HashMap<CategoryId, Category>>,
}

impl InMemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_category(&self, category: Category) {
        self.write_categories().insert(category.id, category);
    }

    pub fn insert_pattern(&self, pattern: Pattern) {
        self.write_patterns().insert(pattern.id, pattern);
    }

    pub fn category(&self, id: CategoryId) -> Option<Category> {
        self.categories
            .read()
            .expect("category map lock poisoned")
            .get(&id)
            .cloned()
    }

    /// Deactivate without deleting; deactivation is the only removal the
    /// engine ever sees.
    pub fn deactivate(&self, id: PatternId) -> Result<(), StoreError> {
        let mut patterns = self.write_patterns();
        let pattern = patterns
            .get_mut(&id)
            .ok_or(StoreError::UnknownPattern(id))?;
        pattern.active = false;
        Ok(())
    }

    fn write_patterns(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<PatternId, Pattern>> {
        self.patterns.write().expect("pattern map lock poisoned")
    }

    fn write_categories(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<CategoryId, Category>> {
        self.categories.write().expect("category map lock poisoned")
    }
}

impl PatternStore for InMemoryPatternStore {
    fn load_active(&self, category: Option<CategoryId>) -> Result<Vec<Pattern>, StoreError> {
        let patterns = self.patterns.read().expect("pattern map lock poisoned");
        let mut out: Vec<Pattern> = patterns
            .values()
            .filter(|p| p.active)
            .filter(|p| category.is_none_or(|c| p.category_id == c))
            .cloned()
            .collect();
        // Stable order keeps categorization deterministic across runs.
        out.sort_by_key(|p| p.id.0);
        Ok(out)
    }

    fn get(&self, id: PatternId) -> Result<Option<Pattern>, StoreError> {
        let patterns = self.patterns.read().expect("pattern map lock poisoned");
        Ok(patterns.get(&id).cloned())
    }

    fn record_outcome(&self, id: PatternId, accepted: bool) -> Result<(), StoreError> {
        let mut patterns = self.write_patterns();
        let pattern = patterns
            .get_mut(&id)
            .ok_or(StoreError::UnknownPattern(id))?;
        pattern.record_use(accepted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use centime_core::pattern::PatternKind;

    fn seeded() -> (InMemoryPatternStore, CategoryId, PatternId) {
        let store = InMemoryPatternStore::new();
        let cat = Category::new("Coffee");
        let cat_id = cat.id;
        store.insert_category(cat);
        let pattern = Pattern::new(cat_id, PatternKind::Merchant, "starbucks", 4.0);
        let pid = pattern.id;
        store.insert_pattern(pattern);
        (store, cat_id, pid)
    }

    #[test]
    fn load_active_filters_by_category_and_flag() {
        let (store, cat_id, pid) = seeded();
        let other = Category::new("Fuel");
        let other_id = other.id;
        store.insert_category(other);
        store.insert_pattern(Pattern::new(other_id, PatternKind::Keyword, "shell", 1.0));

        assert_eq!(store.load_active(None).unwrap().len(), 2);
        assert_eq!(store.load_active(Some(cat_id)).unwrap().len(), 1);

        store.deactivate(pid).unwrap();
        assert!(store.load_active(Some(cat_id)).unwrap().is_empty());
        // Deactivated, not destroyed.
        assert!(store.get(pid).unwrap().is_some());
    }

    #[test]
    fn record_outcome_updates_counts_atomically() {
        let (store, _, pid) = seeded();
        store.record_outcome(pid, true).unwrap();
        store.record_outcome(pid, false).unwrap();
        let p = store.get(pid).unwrap().unwrap();
        assert_eq!(p.usage_count, 2);
        assert_eq!(p.success_count, 1);
        assert_eq!(p.success_rate(), 0.5);
    }

    #[test]
    fn unknown_pattern_is_an_error() {
        let (store, _, _) = seeded();
        let missing = PatternId::new();
        assert_eq!(
            store.record_outcome(missing, true),
            Err(StoreError::UnknownPattern(missing))
        );
    }
}
