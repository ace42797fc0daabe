//! Admission, capacity and analysis policies.

/// Generic greetings and acknowledgements that carry no memorable fact.
pub const DEFAULT_GENERIC_PHRASES: &[&str] = &[
    "はい",
    "いいえ",
    "うん",
    "ええ",
    "そう",
    "そうです",
    "そうですね",
    "なるほど",
    "わかりました",
    "了解",
    "大丈夫",
    "大丈夫です",
    "こんにちは",
    "こんばんは",
    "おはよう",
    "おはようございます",
    "ありがとう",
    "ありがとうございます",
    "よろしくお願いします",
    "特にないです",
    "hello",
    "hi",
    "yes",
    "no",
    "ok",
    "okay",
    "thanks",
    "thank you",
];

/// Policy for deciding which candidate fragments become memories.
#[derive(Debug, Clone)]
pub struct QualityPolicy {
    /// Minimum trimmed character count.
    pub min_chars: usize,
    /// Single-token candidates shorter than this are rejected.
    pub single_token_max_chars: usize,
    /// Near-duplicate check only applies above this character count.
    pub near_duplicate_min_chars: usize,
    /// Similarity ratio above which a same-category candidate is a near duplicate.
    pub near_duplicate_threshold: f64,
    /// Candidates scoring below this importance are rejected.
    pub min_importance: f64,
    /// Phrases rejected as too generic (compared trimmed and lowercased).
    pub generic_phrases: Vec<String>,
    /// Regex patterns that deny capture.
    pub deny_patterns: Vec<String>,
}

impl Default for QualityPolicy {
    /// Default admission thresholds.
    fn default() -> Self {
        Self {
            min_chars: 5,
            single_token_max_chars: 10,
            near_duplicate_min_chars: 20,
            near_duplicate_threshold: 0.9,
            min_importance: 0.15,
            generic_phrases: DEFAULT_GENERIC_PHRASES
                .iter()
                .map(|phrase| phrase.to_string())
                .collect(),
            deny_patterns: Vec::new(),
        }
    }
}

/// Per-user capacity bound enforced after each insert.
#[derive(Debug, Clone, Copy)]
pub struct CapacityPolicy {
    /// Maximum records kept per user.
    pub max_records: usize,
}

impl Default for CapacityPolicy {
    fn default() -> Self {
        Self { max_records: 200 }
    }
}

/// Policy for grouping similar memories.
#[derive(Debug, Clone, Copy)]
pub struct ConsolidationPolicy {
    /// Minimum containment similarity for two memories to share a group.
    pub similarity_threshold: f64,
}

impl Default for ConsolidationPolicy {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
        }
    }
}

/// Thresholds for relation lookup and graph construction.
#[derive(Debug, Clone, Copy)]
pub struct RelationPolicy {
    /// Minimum score for a memory to count as related.
    pub related_threshold: f64,
    /// Minimum score for a graph edge.
    pub graph_edge_threshold: f64,
    /// Maximum nodes in a memory graph.
    pub graph_max_nodes: usize,
}

impl Default for RelationPolicy {
    fn default() -> Self {
        Self {
            related_threshold: 0.3,
            graph_edge_threshold: 0.5,
            graph_max_nodes: 30,
        }
    }
}
