//! Memory record model used by providers and the store.

use crate::category::MemoryCategory;
use crate::decay;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Time-ordered memory record identifier (UUID v7).
pub type MemoryId = Uuid;

/// Persisted memory record. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    /// Record identifier.
    pub id: MemoryId,
    /// Owning user.
    pub user_id: String,
    /// Record content.
    pub content: String,
    /// What kind of fact the record holds.
    pub category: MemoryCategory,
    /// Importance computed at creation, before decay.
    pub base_importance: f64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Caller metadata, opaque to the store.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl MemoryRecord {
    /// Whole days elapsed between creation and `now`, never negative.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.created_at).num_days().max(0)
    }

    /// Base importance after read-time decay.
    pub fn current_importance(&self, now: DateTime<Utc>) -> f64 {
        decay::current_importance(self.base_importance, &self.category, self.age_days(now))
    }
}

/// Per-user memory summary used by reporting endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MemoryStats {
    /// Number of stored records.
    pub total: usize,
    /// Record count per category name.
    pub by_category: BTreeMap<String, usize>,
    /// Mean base importance, 0 when empty.
    pub average_importance: f64,
    /// Mean decayed importance, 0 when empty.
    pub average_current_importance: f64,
}

impl MemoryStats {
    /// Compute stats over a user's records at `now`.
    pub fn from_records(records: &[MemoryRecord], now: DateTime<Utc>) -> Self {
        if records.is_empty() {
            return Self::default();
        }
        let mut by_category = BTreeMap::new();
        let mut base_sum = 0.0;
        let mut current_sum = 0.0;
        for record in records {
            *by_category
                .entry(record.category.as_str().to_string())
                .or_insert(0) += 1;
            base_sum += record.base_importance;
            current_sum += record.current_importance(now);
        }
        let total = records.len();
        Self {
            total,
            by_category,
            average_importance: base_sum / total as f64,
            average_current_importance: current_sum / total as f64,
        }
    }
}
