//! Relationship scoring between memories and the derived memory graph.

use crate::category::MemoryCategory;
use crate::model::{MemoryId, MemoryRecord};
use crate::policy::RelationPolicy;
use crate::similarity::jaccard_similarity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Characters of content kept in a graph node label.
const LABEL_CHARS: usize = 30;

/// Why two memories are considered related.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationReason {
    SameCategory,
    SamePeriod,
    ClosePeriod,
    SimilarContent,
    PossibleCause,
}

impl RelationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SameCategory => "same category",
            Self::SamePeriod => "same period",
            Self::ClosePeriod => "close period",
            Self::SimilarContent => "similar content",
            Self::PossibleCause => "possible cause",
        }
    }
}

impl fmt::Display for RelationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship score with the signals that contributed to it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Relationship {
    pub score: f64,
    pub reasons: Vec<RelationReason>,
}

/// Score how strongly two memories relate.
pub fn relationship(a: &MemoryRecord, b: &MemoryRecord) -> Relationship {
    let mut relation = Relationship::default();
    let mut add = |score: f64, reason: RelationReason| {
        relation.score += score;
        relation.reasons.push(reason);
    };

    if a.category == b.category {
        add(0.3, RelationReason::SameCategory);
    }

    let days_apart = a
        .created_at
        .signed_duration_since(b.created_at)
        .num_days()
        .abs();
    if days_apart <= 1 {
        add(0.3, RelationReason::SamePeriod);
    } else if days_apart <= 7 {
        add(0.2, RelationReason::ClosePeriod);
    }

    let similarity = jaccard_similarity(&a.content, &b.content);
    if similarity > 0.5 {
        add(similarity * 0.5, RelationReason::SimilarContent);
    }

    if is_causal_pair(&a.category, &b.category) {
        add(0.4, RelationReason::PossibleCause);
    }

    relation
}

/// A trigger and an effect in either order, or coping followed by an effect.
fn is_causal_pair(first: &MemoryCategory, second: &MemoryCategory) -> bool {
    (first.is_cause() && second.is_effect())
        || (second.is_cause() && first.is_effect())
        || (*first == MemoryCategory::CopingMethods && second.is_effect())
}

/// A memory related to a target memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedMemory {
    pub record: MemoryRecord,
    pub relationship: Relationship,
}

/// Memories of `records` related to `target` above `threshold`, strongest first.
pub fn related_memories(
    target: &MemoryRecord,
    records: &[MemoryRecord],
    threshold: f64,
    limit: usize,
) -> Vec<RelatedMemory> {
    let mut related: Vec<RelatedMemory> = records
        .iter()
        .filter(|record| record.id != target.id)
        .filter_map(|record| {
            let relationship = relationship(target, record);
            (relationship.score > threshold).then(|| RelatedMemory {
                record: record.clone(),
                relationship,
            })
        })
        .collect();
    related.sort_by(|a, b| {
        b.relationship
            .score
            .partial_cmp(&a.relationship.score)
            .unwrap_or(Ordering::Equal)
    });
    related.truncate(limit);
    related
}

/// Graph node for one memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryNode {
    pub id: MemoryId,
    /// Leading characters of the content.
    pub label: String,
    pub category: MemoryCategory,
    pub current_importance: f64,
    pub created_at: DateTime<Utc>,
}

/// Undirected edge between two related memories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEdge {
    pub source: MemoryId,
    pub target: MemoryId,
    pub weight: f64,
    pub reasons: Vec<RelationReason>,
}

/// Relationship graph over a user's most important memories.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MemoryGraph {
    pub nodes: Vec<MemoryNode>,
    pub edges: Vec<MemoryEdge>,
}

impl MemoryGraph {
    /// Build a graph from the top records by current importance at `now`.
    pub fn build(records: &[MemoryRecord], policy: &RelationPolicy, now: DateTime<Utc>) -> Self {
        let mut ranked: Vec<(&MemoryRecord, f64)> = records
            .iter()
            .map(|record| (record, record.current_importance(now)))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        ranked.truncate(policy.graph_max_nodes);

        let nodes = ranked
            .iter()
            .map(|(record, current_importance)| MemoryNode {
                id: record.id,
                label: label(&record.content),
                category: record.category.clone(),
                current_importance: *current_importance,
                created_at: record.created_at,
            })
            .collect();

        let mut edges = Vec::new();
        for (index, (first, _)) in ranked.iter().enumerate() {
            for (second, _) in &ranked[index + 1..] {
                let relation = relationship(first, second);
                if relation.score > policy.graph_edge_threshold {
                    edges.push(MemoryEdge {
                        source: first.id,
                        target: second.id,
                        weight: relation.score,
                        reasons: relation.reasons,
                    });
                }
            }
        }

        Self { nodes, edges }
    }
}

fn label(content: &str) -> String {
    if content.chars().count() <= LABEL_CHARS {
        return content.to_string();
    }
    let mut label: String = content.chars().take(LABEL_CHARS).collect();
    label.push_str("...");
    label
}
