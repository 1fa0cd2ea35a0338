//! centime-core: data model and matching primitives for the categorization engine

pub mod config;
pub mod errors;
pub mod fuzzy;
pub mod matchers;
pub mod normalize;
pub mod pattern;
pub mod result;
pub mod scorer;
pub mod transaction;

pub use config::EngineConfig;
pub use errors::{ConfigError, PatternParseError};
pub use matchers::{MatcherContext, evaluate};
pub use normalize::Normalizer;
pub use pattern::{Category, CategoryId, Pattern, PatternId, PatternKind};
pub use result::{CategorizationResult, CategorizationStatus, MatchResult};
pub use scorer::score;
pub use transaction::Transaction;
