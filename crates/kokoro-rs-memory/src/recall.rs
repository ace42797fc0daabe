//! Memory recall scoring.
//!
//! A record's rank key is `relevance * current_importance`. The relevance
//! strategy is pluggable; decayed importance is always applied on top so
//! stale matches rank below fresh ones of equal textual relevance.

use crate::error::MemoryError;
use crate::model::{MemoryId, MemoryRecord};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Recall modes supported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryRecallMode {
    /// Query-token substring matching.
    #[default]
    Keyword,
    /// Embedding cosine similarity through a caller-supplied [`Embedder`].
    Semantic,
}

/// Recall options for memory retrieval.
///
/// A store always reports the mode of its scorer; `mode` here is a request
/// that only takes effect together with a matching [`RelevanceScorer`].
#[derive(Debug, Clone, Copy)]
pub struct MemoryRecallOptions {
    /// Recall mode to use.
    pub mode: MemoryRecallMode,
    /// Default number of records returned.
    pub limit: usize,
    /// Optional minimum rank key; records at or below zero are always dropped.
    pub min_score: Option<f64>,
}

impl Default for MemoryRecallOptions {
    /// Default recall options.
    fn default() -> Self {
        Self {
            mode: MemoryRecallMode::Keyword,
            limit: 10,
            min_score: None,
        }
    }
}

/// Relevance of candidate records to a query; zero means unrelated.
pub trait RelevanceScorer: Send + Sync {
    /// One score per record, in input order.
    fn relevance(&self, query: &str, records: &[MemoryRecord]) -> Result<Vec<f64>, MemoryError>;

    /// Recall mode this scorer implements.
    fn mode(&self) -> MemoryRecallMode;
}

/// Counts query tokens that occur as substrings of the record content.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordScorer;

impl RelevanceScorer for KeywordScorer {
    fn relevance(&self, query: &str, records: &[MemoryRecord]) -> Result<Vec<f64>, MemoryError> {
        let tokens: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        Ok(records
            .iter()
            .map(|record| {
                let content = record.content.to_lowercase();
                tokens
                    .iter()
                    .filter(|token| content.contains(token.as_str()))
                    .count() as f64
            })
            .collect())
    }

    fn mode(&self) -> MemoryRecallMode {
        MemoryRecallMode::Keyword
    }
}

/// Produces a vector embedding for a text.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError>;
}

/// Cosine similarity between query and record embeddings.
///
/// Record embeddings are cached by id; records are immutable so entries
/// never go stale.
pub struct EmbeddingScorer<E> {
    embedder: E,
    cache: Mutex<HashMap<MemoryId, Vec<f32>>>,
}

impl<E: Embedder> EmbeddingScorer<E> {
    pub fn new(embedder: E) -> Self {
        Self {
            embedder,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn record_embedding(&self, record: &MemoryRecord) -> Result<Vec<f32>, MemoryError> {
        if let Some(embedding) = self.cache.lock().get(&record.id) {
            return Ok(embedding.clone());
        }
        let embedding = self.embedder.embed(&record.content)?;
        self.cache.lock().insert(record.id, embedding.clone());
        Ok(embedding)
    }
}

impl<E: Embedder> RelevanceScorer for EmbeddingScorer<E> {
    fn relevance(&self, query: &str, records: &[MemoryRecord]) -> Result<Vec<f64>, MemoryError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let query_embedding = self.embedder.embed(query)?;
        records
            .iter()
            .map(|record| {
                let record_embedding = self.record_embedding(record)?;
                Ok(cosine_similarity(&query_embedding, &record_embedding).max(0.0))
            })
            .collect()
    }

    fn mode(&self) -> MemoryRecallMode {
        MemoryRecallMode::Semantic
    }
}

/// Cosine similarity; 0 for empty or mismatched vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// A recalled record with its ranking components.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredMemory {
    pub record: MemoryRecord,
    /// Output of the relevance scorer.
    pub relevance: f64,
    /// Decayed importance at recall time.
    pub current_importance: f64,
    /// `relevance * current_importance`.
    pub score: f64,
}

/// Rank `records` against `query`, keeping at most `limit` positive scores.
///
/// Ties are broken by newer `created_at`, then by id.
pub fn rank_records(
    scorer: &dyn RelevanceScorer,
    query: &str,
    records: &[MemoryRecord],
    limit: usize,
    min_score: Option<f64>,
    now: DateTime<Utc>,
) -> Result<Vec<ScoredMemory>, MemoryError> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let relevances = scorer.relevance(query, records)?;
    let mut scored = Vec::new();
    for (record, relevance) in records.iter().zip(relevances) {
        let current_importance = record.current_importance(now);
        let score = relevance * current_importance;
        if score <= 0.0 || min_score.is_some_and(|min| score < min) {
            continue;
        }
        scored.push(ScoredMemory {
            record: record.clone(),
            relevance,
            current_importance,
            score,
        });
    }
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.record.created_at.cmp(&a.record.created_at))
            .then_with(|| b.record.id.cmp(&a.record.id))
    });
    scored.truncate(limit);
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::{
        Embedder, EmbeddingScorer, KeywordScorer, RelevanceScorer, cosine_similarity,
        rank_records,
    };
    use crate::{MemoryCategory, MemoryError, MemoryRecord};
    use chrono::{DateTime, Duration, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn record(content: &str, base: f64, created_at: DateTime<Utc>) -> MemoryRecord {
        MemoryRecord {
            id: Uuid::now_v7(),
            user_id: "u1".to_string(),
            content: content.to_string(),
            category: MemoryCategory::Concerns,
            base_importance: base,
            created_at,
            metadata: json!({}),
        }
    }

    #[test]
    fn keyword_scorer_counts_matching_tokens() {
        let records = [
            record("Work stress keeps me awake", 0.5, Utc::now()),
            record("Holidays are calm", 0.5, Utc::now()),
        ];
        let scores = KeywordScorer
            .relevance("stress AWAKE holiday", &records)
            .expect("score");
        assert_eq!(scores, vec![2.0, 1.0]);
    }

    #[test]
    fn zero_scores_are_excluded() {
        let now = Utc::now();
        let records = vec![record("仕事の不安", 0.9, now), record("趣味は読書", 0.9, now)];
        let ranked = rank_records(&KeywordScorer, "不安", &records, 10, None, now).expect("rank");
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].record.content, "仕事の不安");
    }

    #[test]
    fn stale_matches_rank_below_fresh_ones() {
        let now = Utc::now();
        let stale = record("不安が続く", 0.9, now - Duration::days(60));
        let fresh = record("不安な朝", 0.9, now);
        let ranked = rank_records(
            &KeywordScorer,
            "不安",
            &[stale.clone(), fresh.clone()],
            10,
            None,
            now,
        )
        .expect("rank");
        assert_eq!(ranked[0].record, fresh);
        assert_eq!(ranked[1].record, stale);
        assert!((ranked[1].current_importance - 0.9 * 0.45).abs() < 1e-9);
    }

    #[test]
    fn ties_prefer_newer_records() {
        let now = Utc::now();
        let older = record("眠れない夜", 0.5, now - Duration::hours(3));
        let newer = record("眠れない朝", 0.5, now - Duration::hours(1));
        let ranked = rank_records(
            &KeywordScorer,
            "眠れない",
            &[older, newer.clone()],
            1,
            None,
            now,
        )
        .expect("rank");
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].record, newer);
    }

    #[test]
    fn min_score_and_zero_limit() {
        let now = Utc::now();
        let records = vec![record("不安", 0.2, now), record("不安 不安", 0.9, now)];
        let ranked =
            rank_records(&KeywordScorer, "不安", &records, 10, Some(0.5), now).expect("rank");
        assert_eq!(ranked.len(), 1);
        assert!(
            rank_records(&KeywordScorer, "不安", &records, 0, None, now)
                .expect("rank")
                .is_empty()
        );
    }

    struct AxisEmbedder {
        calls: AtomicUsize,
    }

    impl Embedder for AxisEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.contains("sleep") {
                Ok(vec![1.0, 0.0])
            } else {
                Ok(vec![0.0, 1.0])
            }
        }
    }

    #[test]
    fn embedding_scorer_uses_cosine_and_caches_records() {
        let scorer = EmbeddingScorer::new(AxisEmbedder {
            calls: AtomicUsize::new(0),
        });
        let now = Utc::now();
        let sleep = record("I sleep badly", 0.8, now);
        let food = record("I skip breakfast", 0.8, now);
        let records = vec![sleep.clone(), food];

        let ranked = rank_records(&scorer, "sleep", &records, 10, None, now).expect("rank");
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].record, sleep);

        rank_records(&scorer, "sleep", &records, 10, None, now).expect("rank again");
        // one query embedding per recall, record embeddings only once
        assert_eq!(scorer.embedder.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn cosine_handles_degenerate_vectors() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-9);
    }
}
