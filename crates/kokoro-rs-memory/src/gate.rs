//! Quality gate deciding whether a candidate fragment becomes a memory.
//!
//! Rules run cheapest first and the first match wins, so generic phrases
//! are rejected before importance scoring can rescue them.

use crate::category::MemoryCategory;
use crate::error::MemoryError;
use crate::importance::calculate_importance_at;
use crate::model::MemoryRecord;
use crate::policy::QualityPolicy;
use crate::similarity::similarity_ratio;
use chrono::{DateTime, Utc};
use log::debug;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;

/// Why a candidate was not stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    /// Missing user or too few characters.
    TooShort,
    /// A single short token.
    SingleToken,
    /// Same content already stored for the user.
    ExactDuplicate,
    /// Nearly the same content already stored in the same category.
    NearDuplicate,
    /// Greeting or acknowledgement.
    TooGeneric,
    /// Matched a deny pattern.
    Denied,
    /// Importance below the admission threshold.
    LowImportance(f64),
}

impl RejectReason {
    /// Short label for logs and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TooShort => "too short",
            Self::SingleToken => "single token",
            Self::ExactDuplicate => "exact duplicate",
            Self::NearDuplicate => "near duplicate",
            Self::TooGeneric => "too generic",
            Self::Denied => "denied",
            Self::LowImportance(_) => "low importance",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowImportance(score) => write!(f, "low importance ({score:.2})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Gate decision for one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    /// Candidate is admissible with this base importance.
    Accept { importance: f64 },
    /// Candidate was declined.
    Reject(RejectReason),
}

impl Admission {
    /// Whether the candidate was accepted.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accept { .. })
    }

    /// Human-readable reason, "accepted" on success.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Accept { .. } => "accepted",
            Self::Reject(reason) => reason.as_str(),
        }
    }
}

/// Compiled quality policy.
#[derive(Debug, Clone)]
pub struct QualityGate {
    policy: QualityPolicy,
    generic_phrases: HashSet<String>,
    deny_patterns: Vec<Regex>,
}

impl Default for QualityGate {
    fn default() -> Self {
        let policy = QualityPolicy::default();
        let generic_phrases = normalized_phrases(&policy.generic_phrases);
        Self {
            policy,
            generic_phrases,
            deny_patterns: Vec::new(),
        }
    }
}

impl QualityGate {
    /// Compile a gate from a policy. Fails on invalid deny patterns.
    pub fn new(policy: QualityPolicy) -> Result<Self, MemoryError> {
        let mut deny_patterns = Vec::new();
        for pattern in &policy.deny_patterns {
            let regex = Regex::new(pattern).map_err(|err| MemoryError::Regex(err.to_string()))?;
            deny_patterns.push(regex);
        }
        let generic_phrases = normalized_phrases(&policy.generic_phrases);
        Ok(Self {
            policy,
            generic_phrases,
            deny_patterns,
        })
    }

    /// Policy the gate was built from.
    pub fn policy(&self) -> &QualityPolicy {
        &self.policy
    }

    /// Decide whether `content` may be stored for `user_id`.
    ///
    /// `existing` may contain records of other users; only the caller's own
    /// records are considered for duplicate checks.
    pub fn admit(
        &self,
        content: &str,
        category: &MemoryCategory,
        user_id: &str,
        metadata: &serde_json::Value,
        existing: &[MemoryRecord],
        now: DateTime<Utc>,
    ) -> Admission {
        let decision = self.evaluate(content, category, user_id, metadata, existing, now);
        if let Admission::Reject(reason) = decision {
            debug!(
                "memory candidate rejected (user_id={}, category={}, reason={})",
                user_id, category, reason
            );
        }
        decision
    }

    fn evaluate(
        &self,
        content: &str,
        category: &MemoryCategory,
        user_id: &str,
        metadata: &serde_json::Value,
        existing: &[MemoryRecord],
        now: DateTime<Utc>,
    ) -> Admission {
        let trimmed = content.trim();
        let char_count = trimmed.chars().count();
        if user_id.trim().is_empty() || char_count < self.policy.min_chars {
            return Admission::Reject(RejectReason::TooShort);
        }

        if trimmed.split_whitespace().count() == 1 && char_count < self.policy.single_token_max_chars
        {
            return Admission::Reject(RejectReason::SingleToken);
        }

        let normalized = trimmed.to_lowercase();
        let own_records = || existing.iter().filter(|record| record.user_id == user_id);
        if own_records().any(|record| record.content.trim().to_lowercase() == normalized) {
            return Admission::Reject(RejectReason::ExactDuplicate);
        }
        if char_count > self.policy.near_duplicate_min_chars
            && own_records().any(|record| {
                &record.category == category
                    && similarity_ratio(trimmed, &record.content)
                        > self.policy.near_duplicate_threshold
            })
        {
            return Admission::Reject(RejectReason::NearDuplicate);
        }

        if self.generic_phrases.contains(&normalized) {
            return Admission::Reject(RejectReason::TooGeneric);
        }

        if self
            .deny_patterns
            .iter()
            .any(|regex| regex.is_match(trimmed))
        {
            return Admission::Reject(RejectReason::Denied);
        }

        let importance = calculate_importance_at(trimmed, category, metadata, now);
        if importance < self.policy.min_importance {
            return Admission::Reject(RejectReason::LowImportance(importance));
        }

        Admission::Accept { importance }
    }
}

fn normalized_phrases(phrases: &[String]) -> HashSet<String> {
    phrases
        .iter()
        .map(|phrase| phrase.trim().to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Admission, QualityGate, RejectReason};
    use crate::{MemoryCategory, MemoryRecord, QualityPolicy};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use uuid::Uuid;

    fn stored(user_id: &str, content: &str, category: MemoryCategory) -> MemoryRecord {
        MemoryRecord {
            id: Uuid::now_v7(),
            user_id: user_id.to_string(),
            content: content.to_string(),
            category,
            base_importance: 0.5,
            created_at: Utc::now(),
            metadata: json!({}),
        }
    }

    fn admit(gate: &QualityGate, content: &str, existing: &[MemoryRecord]) -> Admission {
        gate.admit(
            content,
            &MemoryCategory::CopingMethods,
            "u1",
            &json!({}),
            existing,
            Utc::now(),
        )
    }

    #[test]
    fn rejects_short_and_single_token_candidates() {
        let gate = QualityGate::default();
        assert_eq!(
            admit(&gate, "はい", &[]),
            Admission::Reject(RejectReason::TooShort)
        );
        assert_eq!(
            admit(&gate, "   abc   ", &[]),
            Admission::Reject(RejectReason::TooShort)
        );
        assert_eq!(
            admit(&gate, "散歩が好きです", &[]),
            Admission::Reject(RejectReason::SingleToken)
        );
        assert!(admit(&gate, "夜に散歩するのが好きです", &[]).is_accepted());
    }

    #[test]
    fn rejects_missing_user() {
        let gate = QualityGate::default();
        let decision = gate.admit(
            "I walk every evening to relax",
            &MemoryCategory::CopingMethods,
            " ",
            &json!({}),
            &[],
            Utc::now(),
        );
        assert_eq!(decision, Admission::Reject(RejectReason::TooShort));
    }

    #[test]
    fn exact_duplicate_is_case_and_space_insensitive() {
        let gate = QualityGate::default();
        let existing = [stored(
            "u1",
            "Walking helps me calm down",
            MemoryCategory::Hobby,
        )];
        assert_eq!(
            admit(&gate, "  walking HELPS me calm down ", &existing),
            Admission::Reject(RejectReason::ExactDuplicate)
        );
    }

    #[test]
    fn duplicates_of_other_users_are_ignored() {
        let gate = QualityGate::default();
        let existing = [stored(
            "someone-else",
            "Walking helps me calm down",
            MemoryCategory::CopingMethods,
        )];
        assert!(admit(&gate, "Walking helps me calm down", &existing).is_accepted());
    }

    #[test]
    fn near_duplicate_requires_same_category_and_length() {
        let gate = QualityGate::default();
        let original = "I often cannot sleep at night because of anxiety";
        let candidate = "I often cannot sleep at night because of anxiety.";

        let same_category = [stored("u1", original, MemoryCategory::CopingMethods)];
        assert_eq!(
            admit(&gate, candidate, &same_category),
            Admission::Reject(RejectReason::NearDuplicate)
        );

        let other_category = [stored("u1", original, MemoryCategory::Symptoms)];
        assert!(admit(&gate, candidate, &other_category).is_accepted());
    }

    #[test]
    fn exact_duplicate_wins_over_earlier_near_duplicate() {
        let gate = QualityGate::default();
        let content = "I often cannot sleep at night because of anxiety";
        let existing = [
            stored("u1", &format!("{content}."), MemoryCategory::CopingMethods),
            stored("u1", content, MemoryCategory::CopingMethods),
        ];
        assert_eq!(
            admit(&gate, content, &existing),
            Admission::Reject(RejectReason::ExactDuplicate)
        );
    }

    #[test]
    fn short_similar_text_skips_near_duplicate_rule() {
        let gate = QualityGate::default();
        let existing = [stored("u1", "散歩が好きです", MemoryCategory::CopingMethods)];
        let decision = admit(&gate, "散歩が好き", &existing);
        assert_ne!(decision, Admission::Reject(RejectReason::NearDuplicate));

        let existing = [stored("u1", "walk in the park", MemoryCategory::CopingMethods)];
        assert!(admit(&gate, "walk in the park!", &existing).is_accepted());
    }

    #[test]
    fn rejects_generic_phrases() {
        let gate = QualityGate::default();
        assert_eq!(
            admit(&gate, "ありがとうございます", &[]),
            Admission::Reject(RejectReason::TooGeneric)
        );
        assert_eq!(
            admit(&gate, "Thank You", &[]),
            Admission::Reject(RejectReason::TooGeneric)
        );
    }

    #[test]
    fn deny_patterns_block_matches() {
        let gate = QualityGate::new(QualityPolicy {
            deny_patterns: vec![r"\d{3}-\d{4}-\d{4}".to_string()],
            ..QualityPolicy::default()
        })
        .expect("gate");
        assert_eq!(
            admit(&gate, "my number is 090-1234-5678", &[]),
            Admission::Reject(RejectReason::Denied)
        );
    }

    #[test]
    fn invalid_deny_pattern_is_an_error() {
        let result = QualityGate::new(QualityPolicy {
            deny_patterns: vec!["(".to_string()],
            ..QualityPolicy::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn low_importance_is_rejected() {
        let gate = QualityGate::new(QualityPolicy {
            min_importance: 0.5,
            ..QualityPolicy::default()
        })
        .expect("gate");
        let decision = gate.admit(
            "I live near the station",
            &MemoryCategory::Location,
            "u1",
            &json!({}),
            &[],
            Utc::now(),
        );
        assert_eq!(decision.reason(), "low importance");
    }

    #[test]
    fn accepted_candidate_carries_importance() {
        let gate = QualityGate::default();
        let decision = gate.admit(
            "不安で苦しい、もう限界です",
            &MemoryCategory::EmotionalState,
            "u1",
            &json!({}),
            &[],
            Utc::now(),
        );
        match decision {
            Admission::Accept { importance } => assert!(importance >= 0.8),
            other => panic!("unexpected decision: {other:?}"),
        }
    }
}
