//! Counseling memory engine for Kokoro: importance scoring, decay, admission,
//! per-user storage and recall.

pub mod category;
pub mod consolidation;
pub mod decay;
pub mod error;
pub mod gate;
pub mod importance;
pub mod model;
pub mod policy;
pub mod provider;
pub mod recall;
pub mod relations;
pub mod similarity;
pub mod store;
pub mod summary;

/// Memory categories and their weights.
pub use category::MemoryCategory;
/// Similar-memory grouping.
pub use consolidation::ConsolidationGroup;
/// Read-time decay.
pub use decay::{current_importance, decay_factor};
/// Memory error type.
pub use error::MemoryError;
/// Admission control.
pub use gate::{Admission, QualityGate, RejectReason};
/// Base importance scoring.
pub use importance::{calculate_importance, calculate_importance_at};
/// Memory record model.
pub use model::{MemoryId, MemoryRecord, MemoryStats};
/// Admission, capacity and analysis policies.
pub use policy::{CapacityPolicy, ConsolidationPolicy, QualityPolicy, RelationPolicy};
/// Memory provider interface and bundled implementations.
pub use provider::{FileMemoryProvider, InMemoryProvider, MemoryProvider};
/// Recall modes, options and scoring strategies.
pub use recall::{
    Embedder, EmbeddingScorer, KeywordScorer, MemoryRecallMode, MemoryRecallOptions,
    RelevanceScorer, ScoredMemory,
};
/// Relationship analysis.
pub use relations::{MemoryEdge, MemoryGraph, MemoryNode, RelatedMemory, RelationReason, Relationship};
/// Per-user memory store.
pub use store::{MemoryStore, StoreOutcome};
/// Memory digest.
pub use summary::MemorySummary;
