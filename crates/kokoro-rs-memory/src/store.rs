//! Per-user memory store: admission, persistence, capacity and recall.

use crate::category::MemoryCategory;
use crate::consolidation::{self, ConsolidationGroup};
use crate::error::MemoryError;
use crate::gate::{Admission, QualityGate, RejectReason};
use crate::model::{MemoryId, MemoryRecord, MemoryStats};
use crate::policy::{CapacityPolicy, ConsolidationPolicy, RelationPolicy};
use crate::provider::MemoryProvider;
use crate::recall::{
    KeywordScorer, MemoryRecallOptions, RelevanceScorer, ScoredMemory, rank_records,
};
use crate::relations::{self, MemoryGraph, RelatedMemory};
use crate::summary::MemorySummary;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// Result of an insert attempt. Rejection is an expected outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoreOutcome {
    Stored(MemoryId),
    Rejected(RejectReason),
}

impl StoreOutcome {
    /// Id of the stored record, if any.
    pub fn id(&self) -> Option<MemoryId> {
        match self {
            Self::Stored(id) => Some(*id),
            Self::Rejected(_) => None,
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Stored(_))
    }
}

/// One user's records, loaded from the provider on first access.
#[derive(Default)]
struct UserSlot {
    loaded: bool,
    records: Vec<MemoryRecord>,
}

/// Memory store owning every user's record collection.
///
/// Operations on one user are serialized by that user's slot lock; different
/// users never contend beyond the brief slot lookup.
pub struct MemoryStore {
    provider: Arc<dyn MemoryProvider>,
    gate: QualityGate,
    capacity: CapacityPolicy,
    recall: MemoryRecallOptions,
    scorer: Arc<dyn RelevanceScorer>,
    consolidation: ConsolidationPolicy,
    relations: RelationPolicy,
    slots: RwLock<HashMap<String, Arc<Mutex<UserSlot>>>>,
}

impl MemoryStore {
    /// Create a store with default policies and keyword recall.
    pub fn new(provider: Arc<dyn MemoryProvider>) -> Self {
        Self {
            provider,
            gate: QualityGate::default(),
            capacity: CapacityPolicy::default(),
            recall: MemoryRecallOptions::default(),
            scorer: Arc::new(KeywordScorer),
            consolidation: ConsolidationPolicy::default(),
            relations: RelationPolicy::default(),
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the quality gate.
    pub fn with_gate(mut self, gate: QualityGate) -> Self {
        self.gate = gate;
        self
    }

    /// Replace the capacity policy.
    pub fn with_capacity(mut self, capacity: CapacityPolicy) -> Self {
        self.capacity = capacity;
        self
    }

    /// Replace the recall defaults.
    ///
    /// The mode always follows the configured scorer; a mismatching request
    /// is logged and ignored.
    pub fn with_recall(mut self, recall: MemoryRecallOptions) -> Self {
        let mode = self.scorer.mode();
        if recall.mode != mode {
            warn!(
                "recall mode does not match scorer; keeping scorer mode (requested={:?}, scorer={:?})",
                recall.mode, mode
            );
        }
        self.recall = MemoryRecallOptions { mode, ..recall };
        self
    }

    /// Replace the relevance scorer used by retrieval and adopt its mode.
    pub fn with_scorer(mut self, scorer: Arc<dyn RelevanceScorer>) -> Self {
        self.recall.mode = scorer.mode();
        self.scorer = scorer;
        self
    }

    /// Replace the consolidation policy.
    pub fn with_consolidation(mut self, consolidation: ConsolidationPolicy) -> Self {
        self.consolidation = consolidation;
        self
    }

    /// Replace the relation thresholds.
    pub fn with_relations(mut self, relations: RelationPolicy) -> Self {
        self.relations = relations;
        self
    }

    /// Recall defaults in effect.
    pub fn recall_options(&self) -> MemoryRecallOptions {
        self.recall
    }

    /// Capacity policy in effect.
    pub fn capacity(&self) -> CapacityPolicy {
        self.capacity
    }

    /// Store a candidate fragment created now.
    pub fn insert(
        &self,
        user_id: &str,
        content: &str,
        category: MemoryCategory,
        metadata: serde_json::Value,
    ) -> Result<StoreOutcome, MemoryError> {
        self.insert_at(user_id, content, category, metadata, Utc::now())
    }

    /// Store a candidate fragment with `created_at = now`.
    ///
    /// The record is durable before it becomes visible. When it pushes the
    /// user over capacity, the evicted set is dropped in the same write, so
    /// a failed write leaves both the provider and memory untouched. The new
    /// record can itself be the one evicted.
    pub fn insert_at(
        &self,
        user_id: &str,
        content: &str,
        category: MemoryCategory,
        metadata: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<StoreOutcome, MemoryError> {
        if user_id.trim().is_empty() {
            return Ok(StoreOutcome::Rejected(RejectReason::TooShort));
        }
        self.with_user(user_id, |slot| {
            let admission = self
                .gate
                .admit(content, &category, user_id, &metadata, &slot.records, now);
            let importance = match admission {
                Admission::Accept { importance } => importance,
                Admission::Reject(reason) => return Ok(StoreOutcome::Rejected(reason)),
            };

            let record = MemoryRecord {
                id: Uuid::now_v7(),
                user_id: user_id.to_string(),
                content: content.trim().to_string(),
                category,
                base_importance: importance,
                created_at: now,
                metadata,
            };
            let id = record.id;
            let category = record.category.clone();

            if slot.records.len() < self.capacity.max_records {
                self.provider.append(&record)?;
                slot.records.push(record);
            } else {
                let mut candidates = slot.records.clone();
                candidates.push(record);
                let (kept, evicted) = self.survivors(&candidates);
                self.provider.rewrite_user(user_id, &kept)?;
                slot.records = kept;
                info!(
                    "evicted memories over capacity (user_id={}, evicted={}, capacity={})",
                    user_id, evicted, self.capacity.max_records
                );
            }
            info!(
                "stored memory (user_id={}, id={}, category={}, importance={:.3})",
                user_id, id, category, importance
            );
            Ok(StoreOutcome::Stored(id))
        })
    }

    /// Drop the lowest-ranked records beyond capacity. Returns how many were removed.
    pub fn evict_if_over_capacity(&self, user_id: &str) -> Result<usize, MemoryError> {
        self.with_user(user_id, |slot| {
            if slot.records.len() <= self.capacity.max_records {
                return Ok(0);
            }
            let (kept, evicted) = self.survivors(&slot.records);
            self.provider.rewrite_user(user_id, &kept)?;
            slot.records = kept;
            info!(
                "evicted memories over capacity (user_id={}, evicted={}, capacity={})",
                user_id, evicted, self.capacity.max_records
            );
            Ok(evicted)
        })
    }

    /// Records that fit the capacity, in their original order, and the evicted count.
    fn survivors(&self, records: &[MemoryRecord]) -> (Vec<MemoryRecord>, usize) {
        let max_records = self.capacity.max_records;
        if records.len() <= max_records {
            return (records.to_vec(), 0);
        }
        let mut ranked: Vec<&MemoryRecord> = records.iter().collect();
        ranked.sort_by(|a, b| eviction_rank(b, a));
        let evicted: HashSet<MemoryId> = ranked[max_records..]
            .iter()
            .map(|record| record.id)
            .collect();
        let kept = records
            .iter()
            .filter(|record| !evicted.contains(&record.id))
            .cloned()
            .collect();
        (kept, evicted.len())
    }

    /// Stats over the user's records at the current time.
    pub fn stats(&self, user_id: &str) -> Result<MemoryStats, MemoryError> {
        let now = Utc::now();
        self.with_user(user_id, |slot| Ok(MemoryStats::from_records(&slot.records, now)))
    }

    /// Snapshot of the user's records in insertion order.
    pub fn records(&self, user_id: &str) -> Result<Vec<MemoryRecord>, MemoryError> {
        self.with_user(user_id, |slot| Ok(slot.records.clone()))
    }

    /// Look up one record of a user.
    pub fn get(&self, user_id: &str, id: MemoryId) -> Result<Option<MemoryRecord>, MemoryError> {
        self.with_user(user_id, |slot| {
            Ok(slot.records.iter().find(|record| record.id == id).cloned())
        })
    }

    /// Users with persisted or cached records.
    pub fn users(&self) -> Result<Vec<String>, MemoryError> {
        let mut users: Vec<String> = self.provider.list_users()?;
        for (user_id, slot) in self.slots.read().iter() {
            if !slot.lock().records.is_empty() {
                users.push(user_id.clone());
            }
        }
        users.sort();
        users.dedup();
        Ok(users)
    }

    /// Top `limit` records for `query`.
    pub fn retrieve(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        Ok(self
            .retrieve_scored(user_id, query, limit)?
            .into_iter()
            .map(|scored| scored.record)
            .collect())
    }

    /// Top `limit` records for `query` with their ranking components.
    pub fn retrieve_scored(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        self.retrieve_at(user_id, query, limit, Utc::now())
    }

    /// Recall evaluated at `now`.
    pub fn retrieve_at(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        let records = self.records(user_id)?;
        let ranked = rank_records(
            self.scorer.as_ref(),
            query,
            &records,
            limit,
            self.recall.min_score,
            now,
        )?;
        debug!(
            "recalled memories (user_id={}, candidates={}, returned={})",
            user_id,
            records.len(),
            ranked.len()
        );
        Ok(ranked)
    }

    /// Groups of similar memories in one category.
    pub fn consolidate(
        &self,
        user_id: &str,
        category: &MemoryCategory,
    ) -> Result<Vec<ConsolidationGroup>, MemoryError> {
        let records: Vec<MemoryRecord> = self
            .records(user_id)?
            .into_iter()
            .filter(|record| &record.category == category)
            .collect();
        Ok(consolidation::consolidate(
            &records,
            self.consolidation.similarity_threshold,
        ))
    }

    /// Memories related to `target_id`, strongest first. Empty for an unknown id.
    pub fn related(
        &self,
        user_id: &str,
        target_id: MemoryId,
        limit: usize,
    ) -> Result<Vec<RelatedMemory>, MemoryError> {
        let records = self.records(user_id)?;
        let Some(target) = records.iter().find(|record| record.id == target_id) else {
            return Ok(Vec::new());
        };
        Ok(relations::related_memories(
            target,
            &records,
            self.relations.related_threshold,
            limit,
        ))
    }

    /// Relationship graph over the user's most important memories.
    pub fn graph(&self, user_id: &str) -> Result<MemoryGraph, MemoryError> {
        let now = Utc::now();
        self.with_user(user_id, |slot| {
            Ok(MemoryGraph::build(&slot.records, &self.relations, now))
        })
    }

    /// Digest of the user's top memories, optionally limited to one category.
    pub fn summarize(
        &self,
        user_id: &str,
        category: Option<&MemoryCategory>,
    ) -> Result<Option<MemorySummary>, MemoryError> {
        let now = Utc::now();
        self.with_user(user_id, |slot| {
            let records: Vec<MemoryRecord> = slot
                .records
                .iter()
                .filter(|record| category.is_none_or(|category| &record.category == category))
                .cloned()
                .collect();
            Ok(MemorySummary::from_records(&records, now))
        })
    }

    fn slot(&self, user_id: &str) -> Arc<Mutex<UserSlot>> {
        if let Some(slot) = self.slots.read().get(user_id) {
            return slot.clone();
        }
        self.slots
            .write()
            .entry(user_id.to_string())
            .or_default()
            .clone()
    }

    fn with_user<T>(
        &self,
        user_id: &str,
        f: impl FnOnce(&mut UserSlot) -> Result<T, MemoryError>,
    ) -> Result<T, MemoryError> {
        let slot = self.slot(user_id);
        let mut guard = slot.lock();
        if !guard.loaded {
            guard.records = self.provider.load_user(user_id)?;
            guard.loaded = true;
        }
        f(&mut guard)
    }
}

/// Eviction order: importance, then recency, then id.
fn eviction_rank(a: &MemoryRecord, b: &MemoryRecord) -> Ordering {
    a.base_importance
        .partial_cmp(&b.base_importance)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::{MemoryStore, StoreOutcome};
    use crate::{
        CapacityPolicy, InMemoryProvider, MemoryCategory, MemoryRecallMode, MemoryRecallOptions,
        RejectReason,
    };
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn store() -> MemoryStore {
        MemoryStore::new(Arc::new(InMemoryProvider::new()))
    }

    #[test]
    fn empty_user_is_rejected_without_touching_storage() {
        let store = store();
        let outcome = store
            .insert("", "some meaningful content", MemoryCategory::Goals, json!({}))
            .expect("insert");
        assert_eq!(outcome, StoreOutcome::Rejected(RejectReason::TooShort));
        assert_eq!(outcome.id(), None);
        assert!(store.users().expect("users").is_empty());
    }

    #[test]
    fn stored_content_is_trimmed() {
        let store = store();
        let outcome = store
            .insert(
                "u1",
                "  I want to run a marathon  ",
                MemoryCategory::Goals,
                json!({}),
            )
            .expect("insert");
        let id = outcome.id().expect("stored");
        let record = store.get("u1", id).expect("get").expect("present");
        assert_eq!(record.content, "I want to run a marathon");
    }

    #[test]
    fn eviction_prefers_importance_over_recency() {
        let store = store().with_capacity(CapacityPolicy { max_records: 1 });
        let now = Utc::now();
        let important = store
            .insert_at(
                "u1",
                "不安で苦しい、もう限界です",
                MemoryCategory::EmotionalState,
                json!({}),
                now - Duration::days(2),
            )
            .expect("insert")
            .id()
            .expect("stored");
        store
            .insert_at(
                "u1",
                "I paint on weekends",
                MemoryCategory::Hobby,
                json!({}),
                now,
            )
            .expect("insert");
        let records = store.records("u1").expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, important);
    }

    #[test]
    fn recall_mode_follows_scorer() {
        let requested = MemoryRecallOptions {
            mode: MemoryRecallMode::Semantic,
            limit: 3,
            min_score: None,
        };
        let store = store().with_recall(requested);
        let options = store.recall_options();
        assert_eq!(options.mode, MemoryRecallMode::Keyword);
        assert_eq!(options.limit, 3);
    }

    #[test]
    fn summary_filters_by_category() {
        let store = store();
        store
            .insert("u1", "I want to sleep better", MemoryCategory::Goals, json!({}))
            .expect("insert");
        assert!(
            store
                .summarize("u1", Some(&MemoryCategory::Medication))
                .expect("summary")
                .is_none()
        );
        let summary = store
            .summarize("u1", Some(&MemoryCategory::Goals))
            .expect("summary")
            .expect("present");
        assert_eq!(summary.highlights, vec!["I want to sleep better".to_string()]);
    }
}
