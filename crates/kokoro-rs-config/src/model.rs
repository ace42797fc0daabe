//! Configuration schema for Kokoro.

use serde::{Deserialize, Serialize};

/// Root config for the Kokoro SDK and CLI.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KokoroConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl KokoroConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> KokoroConfigBuilder {
        KokoroConfigBuilder::new()
    }
}

/// Builder for assembling a `KokoroConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct KokoroConfigBuilder {
    config: KokoroConfig,
}

impl KokoroConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the memory configuration.
    pub fn memory(mut self, memory: MemoryConfig) -> Self {
        self.config.memory = memory;
        self
    }

    /// Select the storage backend.
    pub fn provider(mut self, provider: MemoryBackend) -> Self {
        self.config.memory.provider = provider;
        self
    }

    /// Set the directory used by the file backend.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.config.memory.path = Some(path.into());
        self
    }

    /// Set the per-user record capacity.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.memory.capacity = capacity;
        self
    }

    /// Finish building the config.
    pub fn build(self) -> KokoroConfig {
        self.config
    }
}

/// Memory engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub provider: MemoryBackend,
    /// Directory for the file backend; defaults to `.kokoro/memory`.
    #[serde(default)]
    pub path: Option<String>,
    /// Maximum records kept per user.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub recall: RecallConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub consolidation: ConsolidationConfig,
    #[serde(default)]
    pub relations: RelationsConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            provider: MemoryBackend::default(),
            path: None,
            capacity: default_capacity(),
            recall: RecallConfig::default(),
            quality: QualityConfig::default(),
            consolidation: ConsolidationConfig::default(),
            relations: RelationsConfig::default(),
        }
    }
}

/// Default per-user capacity.
fn default_capacity() -> usize {
    200
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemoryBackend {
    /// One JSONL file per user.
    #[default]
    File,
    /// Process-local, nothing persisted.
    Memory,
}

/// Recall defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallConfig {
    #[serde(default = "default_recall_limit")]
    pub limit: usize,
    #[serde(default)]
    pub mode: RecallMode,
    #[serde(default)]
    pub min_score: Option<f64>,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            limit: default_recall_limit(),
            mode: RecallMode::default(),
            min_score: None,
        }
    }
}

/// Default number of recalled records.
fn default_recall_limit() -> usize {
    10
}

/// Recall scoring strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecallMode {
    #[default]
    Keyword,
    Semantic,
}

/// Admission thresholds for the quality gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
    #[serde(default = "default_single_token_max_chars")]
    pub single_token_max_chars: usize,
    #[serde(default = "default_near_duplicate_min_chars")]
    pub near_duplicate_min_chars: usize,
    #[serde(default = "default_near_duplicate_threshold")]
    pub near_duplicate_threshold: f64,
    #[serde(default = "default_min_importance")]
    pub min_importance: f64,
    /// Replaces the built-in generic phrase list when set.
    #[serde(default)]
    pub generic_phrases: Option<Vec<String>>,
    #[serde(default)]
    pub deny_patterns: Vec<String>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_chars: default_min_chars(),
            single_token_max_chars: default_single_token_max_chars(),
            near_duplicate_min_chars: default_near_duplicate_min_chars(),
            near_duplicate_threshold: default_near_duplicate_threshold(),
            min_importance: default_min_importance(),
            generic_phrases: None,
            deny_patterns: Vec::new(),
        }
    }
}

fn default_min_chars() -> usize {
    5
}

fn default_single_token_max_chars() -> usize {
    10
}

fn default_near_duplicate_min_chars() -> usize {
    20
}

fn default_near_duplicate_threshold() -> f64 {
    0.9
}

fn default_min_importance() -> f64 {
    0.15
}

/// Similar-memory grouping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationConfig {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

fn default_similarity_threshold() -> f64 {
    0.8
}

/// Relationship and graph thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationsConfig {
    #[serde(default = "default_related_threshold")]
    pub related_threshold: f64,
    #[serde(default = "default_graph_edge_threshold")]
    pub graph_edge_threshold: f64,
    #[serde(default = "default_graph_max_nodes")]
    pub graph_max_nodes: usize,
}

impl Default for RelationsConfig {
    fn default() -> Self {
        Self {
            related_threshold: default_related_threshold(),
            graph_edge_threshold: default_graph_edge_threshold(),
            graph_max_nodes: default_graph_max_nodes(),
        }
    }
}

fn default_related_threshold() -> f64 {
    0.3
}

fn default_graph_edge_threshold() -> f64 {
    0.5
}

fn default_graph_max_nodes() -> usize {
    30
}
