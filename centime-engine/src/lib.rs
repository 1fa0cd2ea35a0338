//! centime-engine: orchestration, caching and concurrency for the
//! categorization engine

pub mod breaker;
pub mod cache;
pub mod engine;
pub mod feedback;
pub mod processor;
pub mod store;

pub use breaker::{BreakerError, BreakerStats, CircuitBreaker, CircuitState};
pub use cache::{
    CACHE_NAMESPACE, CacheError, InMemorySharedTier, PatternCache, SharedTier, SharedTierError,
};
pub use engine::{CategorizationEngine, EngineStats, EngineStatsSnapshot};
pub use feedback::{FeedbackSummary, LearningFeedback, StoreFeedback};
pub use processor::{BatchCancellation, ConcurrentProcessor, WorkerPool};
pub use store::{InMemoryPatternStore, PatternStore, StoreError};
