//! Two-tier pattern cache with strictly scoped invalidation.
//!
//! Tier 1 is an in-process map for sub-millisecond reads; tier 2 is a shared
//! external tier behind the circuit breaker. Every shared key carries the
//! engine's namespace prefix, and invalidation enumerates only that prefix.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

use centime_core::pattern::{CategoryId, Pattern};

use crate::breaker::{BreakerError, CircuitBreaker};
use crate::store::{PatternStore, StoreError};

/// Prefix for every key this engine writes to the shared tier. Invalidation
/// never touches keys outside it.
pub const CACHE_NAMESPACE: &str = "centime:patterns:";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SharedTierError {
    #[error("shared tier unavailable: {0}")]
    Unavailable(String),
}

/// The shared external tier (e.g. a networked cache). Implementations must
/// resolve `keys_with_prefix` via an indexed lookup, not a full key scan.
pub trait SharedTier: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SharedTierError>;
    fn put(&self, key: &str, value: &str) -> Result<(), SharedTierError>;
    fn delete(&self, key: &str) -> Result<(), SharedTierError>;
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, SharedTierError>;
}

/// In-memory shared tier. The sorted map makes prefix enumeration a range
/// walk rather than a scan of the whole key space.
#[derive(Debug, Default)]
pub struct InMemorySharedTier {
    entries: RwLock<BTreeMap<String, String>>,
}

impl InMemorySharedTier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("shared tier lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SharedTier for InMemorySharedTier {
    fn get(&self, key: &str) -> Result<Option<String>, SharedTierError> {
        Ok(self
            .entries
            .read()
            .expect("shared tier lock poisoned")
            .get(key)
            .cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), SharedTierError> {
        self.entries
            .write()
            .expect("shared tier lock poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), SharedTierError> {
        self.entries
            .write()
            .expect("shared tier lock poisoned")
            .remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, SharedTierError> {
        let entries = self.entries.read().expect("shared tier lock poisoned");
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("shared cache tier unavailable: {0}")]
    Unavailable(String),

    #[error("circuit open; shared tier not attempted")]
    CircuitOpen,

    #[error("pattern store error: {0}")]
    Store(#[from] StoreError),
}

impl From<BreakerError<SharedTierError>> for CacheError {
    fn from(err: BreakerError<SharedTierError>) -> Self {
        match err {
            BreakerError::Open => CacheError::CircuitOpen,
            BreakerError::Inner(e) => CacheError::Unavailable(e.to_string()),
        }
    }
}

impl From<BreakerError<StoreError>> for CacheError {
    fn from(err: BreakerError<StoreError>) -> Self {
        match err {
            BreakerError::Open => CacheError::CircuitOpen,
            BreakerError::Inner(e) => CacheError::Store(e),
        }
    }
}

fn cache_key(category: Option<CategoryId>) -> String {
    match category {
        Some(id) => format!("{CACHE_NAMESPACE}category:{id}"),
        None => format!("{CACHE_NAMESPACE}all"),
    }
}

/// Active patterns grouped under namespaced keys; reads populate the
/// in-process tier on miss and fall through to the store.
pub struct PatternCache {
    local: RwLock<HashMap<String, Vec<Pattern>>>,
    shared: Arc<dyn SharedTier>,
    store: Arc<dyn PatternStore>,
    breaker: Arc<CircuitBreaker>,
}

impl PatternCache {
    pub fn new(
        shared: Arc<dyn SharedTier>,
        store: Arc<dyn PatternStore>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            local: RwLock::new(HashMap::new()),
            shared,
            store,
            breaker,
        }
    }

    /// Active patterns, optionally scoped to one category.
    pub fn active_patterns(
        &self,
        category: Option<CategoryId>,
    ) -> Result<Vec<Pattern>, CacheError> {
        let key = cache_key(category);

        if let Some(hit) = self.read_local().get(&key) {
            return Ok(hit.clone());
        }

        match self.breaker.call(|| self.shared.get(&key)) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Pattern>>(&raw) {
                Ok(patterns) => {
                    self.write_local().insert(key, patterns.clone());
                    return Ok(patterns);
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "corrupt shared cache entry; refreshing from store");
                    let _ = self.breaker.call(|| self.shared.delete(&key));
                }
            },
            Ok(None) => {}
            Err(err) => return Err(err.into()),
        }

        // Shared miss: the store is the source of truth.
        let patterns = self.breaker.call(|| self.store.load_active(category))?;
        if let Ok(raw) = serde_json::to_string(&patterns) {
            // Best effort; a put failure only costs the next reader a reload.
            if let Err(err) = self.breaker.call(|| self.shared.put(&key, &raw)) {
                debug!(key = %key, error = %err, "shared tier back-fill skipped");
            }
        }
        self.write_local().insert(key, patterns.clone());
        Ok(patterns)
    }

    /// Drop every key in this engine's namespace, and nothing else.
    pub fn invalidate_all(&self) -> Result<(), CacheError> {
        self.write_local().clear();
        let keys = self
            .breaker
            .call(|| self.shared.keys_with_prefix(CACHE_NAMESPACE))?;
        for key in &keys {
            self.breaker.call(|| self.shared.delete(key))?;
        }
        debug!(removed = keys.len(), "invalidated full pattern cache namespace");
        Ok(())
    }

    /// Drop only one category's keys (plus the cross-category aggregate,
    /// which contains that category's patterns).
    pub fn invalidate_category(&self, category: CategoryId) -> Result<(), CacheError> {
        let category_key = cache_key(Some(category));
        let all_key = cache_key(None);
        {
            let mut local = self.write_local();
            local.remove(&category_key);
            local.remove(&all_key);
        }
        self.breaker.call(|| self.shared.delete(&category_key))?;
        self.breaker.call(|| self.shared.delete(&all_key))?;
        debug!(category = %category, "invalidated category cache entries");
        Ok(())
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    fn read_local(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Vec<Pattern>>> {
        self.local.read().expect("pattern cache lock poisoned")
    }

    fn write_local(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Vec<Pattern>>> {
        self.local.write().expect("pattern cache lock poisoned")
    }
}
