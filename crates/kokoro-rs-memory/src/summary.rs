//! Deterministic digest of a user's most important memories.

use crate::model::MemoryRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Number of memories considered for a summary.
pub const SUMMARY_TOP_MEMORIES: usize = 20;

/// Characters of the leading highlight shown by [`MemorySummary`]'s `Display`.
const PREVIEW_CHARS: usize = 100;

/// Summary of the memories most worth surfacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySummary {
    /// Number of memories the summary was drawn from.
    pub total: usize,
    /// Contents of the top memories, most important first.
    pub highlights: Vec<String>,
}

impl MemorySummary {
    /// Summarize `records` at `now`; `None` when there is nothing to summarize.
    pub fn from_records(records: &[MemoryRecord], now: DateTime<Utc>) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        let mut ranked: Vec<(&MemoryRecord, f64)> = records
            .iter()
            .map(|record| (record, record.current_importance(now)))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        Some(Self {
            total: records.len(),
            highlights: ranked
                .into_iter()
                .take(SUMMARY_TOP_MEMORIES)
                .map(|(record, _)| record.content.clone())
                .collect(),
        })
    }
}

impl fmt::Display for MemorySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lead = self.highlights.first().map(String::as_str).unwrap_or_default();
        let preview: String = lead.chars().take(PREVIEW_CHARS).collect();
        write!(
            f,
            "{} memories recorded ({} highlighted). Most important: {}",
            self.total,
            self.highlights.len(),
            preview
        )?;
        if lead.chars().count() > PREVIEW_CHARS {
            f.write_str("...")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemorySummary;
    use crate::{MemoryCategory, MemoryRecord};
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use uuid::Uuid;

    fn record(content: &str, base: f64, age_days: i64) -> MemoryRecord {
        MemoryRecord {
            id: Uuid::now_v7(),
            user_id: "u1".to_string(),
            content: content.to_string(),
            category: MemoryCategory::Concerns,
            base_importance: base,
            created_at: Utc::now() - Duration::days(age_days),
            metadata: json!({}),
        }
    }

    #[test]
    fn empty_input_has_no_summary() {
        assert_eq!(MemorySummary::from_records(&[], Utc::now()), None);
    }

    #[test]
    fn highlights_follow_decayed_importance() {
        let records = vec![
            record("old but once important", 0.9, 120),
            record("fresh worry", 0.5, 0),
        ];
        let summary = MemorySummary::from_records(&records, Utc::now()).expect("summary");
        assert_eq!(summary.total, 2);
        assert_eq!(
            summary.highlights,
            vec!["fresh worry".to_string(), "old but once important".to_string()]
        );
        assert_eq!(
            summary.to_string(),
            "2 memories recorded (2 highlighted). Most important: fresh worry"
        );
    }

    #[test]
    fn highlights_are_capped() {
        let records: Vec<MemoryRecord> = (0..25)
            .map(|index| record(&format!("memory {index}"), 0.5, 0))
            .collect();
        let summary = MemorySummary::from_records(&records, Utc::now()).expect("summary");
        assert_eq!(summary.total, 25);
        assert_eq!(summary.highlights.len(), 20);
    }
}
