//! Cross-project aggregation of learned patterns.

pub mod aggregator;
pub mod consensus;
pub mod ranking;
pub mod signature;
pub mod types;

pub use aggregator::{GlobalAggregator, SyncGuard};
pub use consensus::{consensus, recompute_all_consensus, weighted_confidence};
pub use ranking::{cosine_similarity, RankedAggregation, SemanticRanker};
pub use signature::signature;
pub use types::{
    AggregationFilter, LanguageShare, Occurrence, PatternAggregation, PortfolioView, SyncResult,
    SyncStatus,
};
