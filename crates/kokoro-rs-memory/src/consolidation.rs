//! Detection of memories that say the same thing.
//!
//! Consolidation only proposes groups; records are immutable, so callers
//! decide what to do with a proposal.

use crate::model::{MemoryId, MemoryRecord};
use crate::similarity::containment_similarity;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Separator used when joining grouped contents.
pub const MERGE_SEPARATOR: &str = " / ";

/// A proposed merge of similar memories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationGroup {
    /// Grouped record ids in input order.
    pub memory_ids: Vec<MemoryId>,
    /// Contents joined with [`MERGE_SEPARATOR`].
    pub merged_content: String,
    /// Number of grouped records.
    pub original_count: usize,
}

impl ConsolidationGroup {
    fn from_records(records: &[&MemoryRecord]) -> Self {
        Self {
            memory_ids: records.iter().map(|record| record.id).collect(),
            merged_content: records
                .iter()
                .map(|record| record.content.as_str())
                .collect::<Vec<_>>()
                .join(MERGE_SEPARATOR),
            original_count: records.len(),
        }
    }
}

/// Greedily group records whose containment similarity to a group's first
/// member is at least `threshold`. Singletons are dropped.
pub fn find_similar_groups<'a>(
    records: &'a [MemoryRecord],
    threshold: f64,
) -> Vec<Vec<&'a MemoryRecord>> {
    let mut processed: HashSet<MemoryId> = HashSet::new();
    let mut groups = Vec::new();
    for (index, anchor) in records.iter().enumerate() {
        if !processed.insert(anchor.id) {
            continue;
        }
        let mut group = vec![anchor];
        for candidate in &records[index + 1..] {
            if processed.contains(&candidate.id) {
                continue;
            }
            if containment_similarity(&anchor.content, &candidate.content) >= threshold {
                processed.insert(candidate.id);
                group.push(candidate);
            }
        }
        if group.len() > 1 {
            groups.push(group);
        }
    }
    groups
}

/// Merge proposals for `records`; an input of fewer than two records has none.
pub fn consolidate(records: &[MemoryRecord], threshold: f64) -> Vec<ConsolidationGroup> {
    if records.len() < 2 {
        return Vec::new();
    }
    find_similar_groups(records, threshold)
        .iter()
        .map(|group| ConsolidationGroup::from_records(group))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{consolidate, find_similar_groups};
    use crate::{MemoryCategory, MemoryRecord};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use uuid::Uuid;

    fn record(content: &str) -> MemoryRecord {
        MemoryRecord {
            id: Uuid::now_v7(),
            user_id: "u1".to_string(),
            content: content.to_string(),
            category: MemoryCategory::CopingMethods,
            base_importance: 0.6,
            created_at: Utc::now(),
            metadata: json!({}),
        }
    }

    #[test]
    fn groups_contained_texts() {
        let records = vec![
            record("散歩が好き"),
            record("朝ごはんを抜きがち"),
            record("夕方に散歩が好き"),
        ];
        let groups = consolidate(&records, 0.7);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].original_count, 2);
        assert_eq!(groups[0].memory_ids, vec![records[0].id, records[2].id]);
        assert_eq!(groups[0].merged_content, "散歩が好き / 夕方に散歩が好き");
    }

    #[test]
    fn default_threshold_needs_token_overlap() {
        let records = vec![
            record("I walk in the park every evening"),
            record("I walk in the park every evening now"),
            record("Breathing exercises help at night"),
        ];
        let groups = find_similar_groups(&records, 0.8);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn a_record_joins_at_most_one_group() {
        let records = vec![record("tea helps"), record("tea helps"), record("tea helps")];
        let groups = find_similar_groups(&records, 0.8);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
    }

    #[test]
    fn fewer_than_two_records_yield_nothing() {
        assert!(consolidate(&[record("only one memory")], 0.1).is_empty());
        assert!(consolidate(&[], 0.1).is_empty());
    }
}
