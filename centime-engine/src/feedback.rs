//! Learning feedback: outcome recording back into pattern statistics.
//!
//! Usage increments unconditionally; success only on accepted outcomes.
//! The success rate is always derived from the counts, never written.
//! Affected categories' cache entries are invalidated so cached counts do
//! not go stale.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use centime_core::pattern::{CategoryId, PatternId};

use crate::cache::PatternCache;
use crate::store::{PatternStore, StoreError};

/// Outcome channel invoked after a user confirms or corrects a suggestion.
pub trait LearningFeedback: Send + Sync {
    fn record_outcome(&self, pattern_ids: &[PatternId], accepted: bool) -> FeedbackSummary;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeedbackSummary {
    pub updated: usize,
    pub skipped: usize,
}

/// Feedback writer over the pattern store, invalidating touched categories.
pub struct StoreFeedback {
    store: Arc<dyn PatternStore>,
    cache: Arc<PatternCache>,
}

impl StoreFeedback {
    pub fn new(store: Arc<dyn PatternStore>, cache: Arc<PatternCache>) -> Self {
        Self { store, cache }
    }
}

impl LearningFeedback for StoreFeedback {
    fn record_outcome(&self, pattern_ids: &[PatternId], accepted: bool) -> FeedbackSummary {
        let mut summary = FeedbackSummary::default();
        let mut touched: HashSet<CategoryId> = HashSet::new();

        for &id in pattern_ids {
            // Each update is its own atomic unit; one unknown pattern must
            // not block the rest of the list.
            match self.store.record_outcome(id, accepted) {
                Ok(()) => {
                    summary.updated += 1;
                    match self.store.get(id) {
                        Ok(Some(pattern)) => {
                            touched.insert(pattern.category_id);
                        }
                        Ok(None) => {}
                        Err(err) => {
                            warn!(pattern = %id, error = %err, "category lookup failed after outcome");
                        }
                    }
                }
                Err(StoreError::UnknownPattern(_)) => {
                    warn!(pattern = %id, "outcome for unknown pattern skipped");
                    summary.skipped += 1;
                }
                Err(err) => {
                    warn!(pattern = %id, error = %err, "outcome not recorded");
                    summary.skipped += 1;
                }
            }
        }

        for category in touched {
            if let Err(err) = self.cache.invalidate_category(category) {
                // Stale counts are tolerable; the next invalidation or
                // expiry catches up.
                debug!(category = %category, error = %err, "cache invalidation deferred");
            }
        }

        summary
    }
}
