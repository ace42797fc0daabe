use chrono::{DateTime, Utc};
use kokoro_rs_memory::{MemoryCategory, MemoryRecord};
use serde_json::{Value, json};
use uuid::Uuid;

/// Builder for records that bypass the quality gate.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: MemoryRecord,
}

impl RecordBuilder {
    pub fn new(user_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            record: MemoryRecord {
                id: Uuid::now_v7(),
                user_id: user_id.into(),
                content: content.into(),
                category: MemoryCategory::Concerns,
                base_importance: 0.5,
                created_at: Utc::now(),
                metadata: json!({}),
            },
        }
    }

    pub fn category(mut self, category: MemoryCategory) -> Self {
        self.record.category = category;
        self
    }

    pub fn importance(mut self, importance: f64) -> Self {
        self.record.base_importance = importance;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.record.created_at = created_at;
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.record.metadata = metadata;
        self
    }

    pub fn build(self) -> MemoryRecord {
        self.record
    }
}
