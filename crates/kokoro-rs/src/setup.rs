//! Translate `KokoroConfig` into memory engine policies and open a store.

use crate::KokoroError;
use kokoro_rs_config::{KokoroConfig, MemoryBackend, MemoryConfig, RecallMode};
use kokoro_rs_memory::policy::DEFAULT_GENERIC_PHRASES;
use kokoro_rs_memory::{
    CapacityPolicy, ConsolidationPolicy, Embedder, EmbeddingScorer, FileMemoryProvider,
    InMemoryProvider, KeywordScorer, MemoryProvider, MemoryRecallMode, MemoryRecallOptions,
    MemoryStore, QualityGate, QualityPolicy, RelationPolicy, RelevanceScorer,
};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

/// Directory used by the file backend when `memory.path` is unset.
pub const DEFAULT_MEMORY_PATH: &str = ".kokoro/memory";

/// Quality gate policy; an unset phrase list keeps the built-in one.
pub fn quality_policy(config: &MemoryConfig) -> QualityPolicy {
    let quality = &config.quality;
    let generic_phrases = match &quality.generic_phrases {
        Some(phrases) => phrases.clone(),
        None => DEFAULT_GENERIC_PHRASES
            .iter()
            .map(|phrase| phrase.to_string())
            .collect(),
    };
    QualityPolicy {
        min_chars: quality.min_chars,
        single_token_max_chars: quality.single_token_max_chars,
        near_duplicate_min_chars: quality.near_duplicate_min_chars,
        near_duplicate_threshold: quality.near_duplicate_threshold,
        min_importance: quality.min_importance,
        generic_phrases,
        deny_patterns: quality.deny_patterns.clone(),
    }
}

pub fn capacity_policy(config: &MemoryConfig) -> CapacityPolicy {
    CapacityPolicy {
        max_records: config.capacity,
    }
}

pub fn recall_options(config: &MemoryConfig) -> MemoryRecallOptions {
    let mode = match config.recall.mode {
        RecallMode::Keyword => MemoryRecallMode::Keyword,
        RecallMode::Semantic => MemoryRecallMode::Semantic,
    };
    MemoryRecallOptions {
        mode,
        limit: config.recall.limit,
        min_score: config.recall.min_score,
    }
}

pub fn consolidation_policy(config: &MemoryConfig) -> ConsolidationPolicy {
    ConsolidationPolicy {
        similarity_threshold: config.consolidation.similarity_threshold,
    }
}

pub fn relation_policy(config: &MemoryConfig) -> RelationPolicy {
    RelationPolicy {
        related_threshold: config.relations.related_threshold,
        graph_edge_threshold: config.relations.graph_edge_threshold,
        graph_max_nodes: config.relations.graph_max_nodes,
    }
}

/// Open a keyword-recall store described by `config`.
///
/// Fails with [`KokoroError::EmbedderRequired`] when the config asks for
/// semantic recall, since there is no embedder to score with.
pub fn open_store(config: &KokoroConfig) -> Result<MemoryStore, KokoroError> {
    if config.memory.recall.mode == RecallMode::Semantic {
        return Err(KokoroError::EmbedderRequired);
    }
    build_store(config, Arc::new(KeywordScorer))
}

/// Open a store that ranks recall by embedding similarity.
///
/// Semantic mode is used regardless of `memory.recall.mode`.
pub fn open_store_with_embedder<E>(
    config: &KokoroConfig,
    embedder: E,
) -> Result<MemoryStore, KokoroError>
where
    E: Embedder + 'static,
{
    build_store(config, Arc::new(EmbeddingScorer::new(embedder)))
}

/// The store takes its recall mode from `scorer`.
fn build_store(
    config: &KokoroConfig,
    scorer: Arc<dyn RelevanceScorer>,
) -> Result<MemoryStore, KokoroError> {
    config.validate()?;
    let memory = &config.memory;
    let provider: Arc<dyn MemoryProvider> = match memory.provider {
        MemoryBackend::File => {
            let root = memory
                .path
                .as_deref()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MEMORY_PATH));
            info!("opening file memory provider (root={})", root.display());
            Arc::new(FileMemoryProvider::new(root)?)
        }
        MemoryBackend::Memory => {
            info!("opening in-memory provider");
            Arc::new(InMemoryProvider::new())
        }
    };
    let gate = QualityGate::new(quality_policy(memory))?;
    let mut recall = recall_options(memory);
    recall.mode = scorer.mode();
    Ok(MemoryStore::new(provider)
        .with_scorer(scorer)
        .with_gate(gate)
        .with_capacity(capacity_policy(memory))
        .with_recall(recall)
        .with_consolidation(consolidation_policy(memory))
        .with_relations(relation_policy(memory)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kokoro_rs_memory::{MemoryCategory, MemoryError};
    use kokoro_rs_test_utils::FixedEmbedder;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    fn in_memory_config() -> KokoroConfig {
        KokoroConfig::builder()
            .provider(MemoryBackend::Memory)
            .build()
    }

    #[test]
    fn unset_phrases_keep_builtin_list() {
        let policy = quality_policy(&MemoryConfig::default());
        assert_eq!(policy.generic_phrases.len(), DEFAULT_GENERIC_PHRASES.len());
        assert_eq!(policy.min_importance, 0.15);
    }

    #[test]
    fn configured_phrases_replace_builtin_list() {
        let mut memory = MemoryConfig::default();
        memory.quality.generic_phrases = Some(vec!["whatever".to_string()]);
        memory.quality.deny_patterns = vec!["password".to_string()];
        let policy = quality_policy(&memory);
        assert_eq!(policy.generic_phrases, vec!["whatever".to_string()]);
        assert_eq!(policy.deny_patterns, vec!["password".to_string()]);
    }

    #[test]
    fn recall_and_relation_settings_are_copied() {
        let mut memory = MemoryConfig::default();
        memory.recall.limit = 4;
        memory.recall.min_score = Some(0.1);
        memory.relations.graph_max_nodes = 12;
        let recall = recall_options(&memory);
        assert_eq!(recall.limit, 4);
        assert_eq!(recall.min_score, Some(0.1));
        assert_eq!(recall.mode, MemoryRecallMode::Keyword);
        assert_eq!(relation_policy(&memory).graph_max_nodes, 12);
        assert_eq!(capacity_policy(&memory).max_records, 200);
    }

    #[test]
    fn in_memory_store_accepts_and_recalls() {
        let store = open_store(&in_memory_config()).expect("store");
        let outcome = store
            .insert(
                "user-1",
                "I have trouble sleeping before exams",
                MemoryCategory::Symptoms,
                json!({}),
            )
            .expect("insert");
        assert!(outcome.is_stored());

        let recalled = store.retrieve("user-1", "sleeping", 5).expect("recall");
        assert_eq!(recalled.len(), 1);
        assert_eq!(recalled[0].content, "I have trouble sleeping before exams");
    }

    #[test]
    fn file_store_persists_under_configured_path() {
        let temp = tempdir().expect("tmp");
        let root = temp.path().join("memory");
        let config = KokoroConfig::builder()
            .path(root.to_string_lossy())
            .build();

        let store = open_store(&config).expect("store");
        store
            .insert(
                "user-1",
                "My sister helps me when I feel anxious",
                MemoryCategory::SupportSystem,
                json!({}),
            )
            .expect("insert");
        drop(store);

        let reopened = open_store(&config).expect("store");
        assert_eq!(reopened.records("user-1").expect("records").len(), 1);
    }

    #[test]
    fn configured_deny_pattern_blocks_capture() {
        let mut config = in_memory_config();
        config.memory.quality.deny_patterns = vec!["(?i)password".to_string()];
        let store = open_store(&config).expect("store");
        let outcome = store
            .insert(
                "user-1",
                "My password is hunter2 and I worry about it",
                MemoryCategory::Concerns,
                json!({}),
            )
            .expect("insert");
        assert!(!outcome.is_stored());
    }

    #[test]
    fn invalid_deny_pattern_is_reported() {
        let mut config = in_memory_config();
        config.memory.quality.deny_patterns = vec!["(".to_string()];
        let err = open_store(&config).err().expect("error");
        assert!(matches!(err, KokoroError::Memory(MemoryError::Regex(_))));
    }

    #[test]
    fn semantic_mode_needs_embedder() {
        let mut config = in_memory_config();
        config.memory.recall.mode = RecallMode::Semantic;
        let err = open_store(&config).err().expect("error");
        assert!(matches!(err, KokoroError::EmbedderRequired));

        let store =
            open_store_with_embedder(&config, FixedEmbedder::new(["sleep", "work"])).expect("store");
        assert_eq!(store.recall_options().mode, MemoryRecallMode::Semantic);
    }

    #[test]
    fn invalid_config_is_rejected_before_opening() {
        let config = KokoroConfig::builder()
            .provider(MemoryBackend::Memory)
            .capacity(0)
            .build();
        let err = open_store(&config).err().expect("error");
        assert!(matches!(err, KokoroError::Config(_)));
    }
}
