//! Base importance scoring for candidate memories.
//!
//! The score starts from the category weight and is scaled by
//! multiplicative signals, so a strong distress or recency signal can
//! dominate a low-weight category.

use crate::category::MemoryCategory;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

/// Lower bound of any computed importance.
pub const MIN_IMPORTANCE: f64 = 0.1;
/// Upper bound of any computed importance.
pub const MAX_IMPORTANCE: f64 = 1.0;

/// Crisis and severe-distress terms.
const HIGH_INTENSITY_TERMS: &[&str] = &[
    "不安",
    "苦しい",
    "辛い",
    "つらい",
    "死にたい",
    "消えたい",
    "絶望",
    "パニック",
    "発作",
    "限界",
    "panic",
    "hopeless",
    "suicid",
    "can't go on",
];

/// Worry, fatigue and stress terms.
const MEDIUM_INTENSITY_TERMS: &[&str] = &[
    "心配",
    "悩み",
    "困った",
    "疲れ",
    "ストレス",
    "落ち込",
    "憂鬱",
    "眠れない",
    "イライラ",
    "worried",
    "stress",
    "tired",
    "exhausted",
];

/// Hedges that soften whatever intensity is present.
const HEDGE_TERMS: &[&str] = &[
    "気になる",
    "少し",
    "ちょっと",
    "時々",
    "やや",
    "a little",
    "somewhat",
    "sometimes",
];

/// Metadata key carrying a caller-supplied event timestamp.
const TIMESTAMP_KEY: &str = "timestamp";

/// Score a candidate memory as of the current time.
pub fn calculate_importance(content: &str, category: &MemoryCategory, metadata: &Value) -> f64 {
    calculate_importance_at(content, category, metadata, Utc::now())
}

/// Score a candidate memory as of `now`. Always in `[0.1, 1.0]`.
pub fn calculate_importance_at(
    content: &str,
    category: &MemoryCategory,
    metadata: &Value,
    now: DateTime<Utc>,
) -> f64 {
    let base = category.type_weight();
    let emotional = emotional_intensity(content);
    let temporal = recency(metadata.get(TIMESTAMP_KEY), now);
    let length = length_importance(content);

    let mut multiplier = 1.0;
    if emotional >= 0.9 {
        multiplier *= 1.5;
    } else if emotional >= 0.6 {
        multiplier *= 1.2;
    } else if emotional <= 0.3 {
        multiplier *= 0.5;
    } else if emotional <= 0.4 {
        multiplier *= 0.7;
    }

    if temporal >= 0.8 && emotional >= 0.5 {
        multiplier *= 1.3;
    } else if temporal <= 0.3 {
        multiplier *= 0.6;
    }

    if length >= 0.8 {
        multiplier *= 1.1;
    }

    (base * multiplier).clamp(MIN_IMPORTANCE, MAX_IMPORTANCE)
}

/// Emotional intensity signal in `[0.3, 0.9]`; 0.5 for neutral text.
pub fn emotional_intensity(content: &str) -> f64 {
    let lowered = content.to_lowercase();
    let contains_any = |terms: &[&str]| terms.iter().any(|term| lowered.contains(term));
    let hedged = contains_any(HEDGE_TERMS);
    if contains_any(HIGH_INTENSITY_TERMS) {
        if hedged { 0.6 } else { 0.9 }
    } else if contains_any(MEDIUM_INTENSITY_TERMS) {
        if hedged { 0.4 } else { 0.6 }
    } else if hedged {
        0.3
    } else {
        0.5
    }
}

/// Recency signal from an optional timestamp value; 0.5 when unknown.
pub fn recency(timestamp: Option<&Value>, now: DateTime<Utc>) -> f64 {
    let Some(timestamp) = timestamp.and_then(parse_timestamp) else {
        return 0.5;
    };
    let days_ago = now.signed_duration_since(timestamp).num_days();
    if days_ago <= 1 {
        1.0
    } else if days_ago <= 7 {
        0.8
    } else if days_ago <= 30 {
        0.6
    } else {
        0.3
    }
}

/// Length signal by character count.
pub fn length_importance(content: &str) -> f64 {
    match content.chars().count() {
        len if len > 100 => 0.8,
        len if len > 50 => 0.6,
        len if len > 20 => 0.4,
        _ => 0.2,
    }
}

/// Accepts RFC 3339, naive ISO-8601 (read as UTC), or epoch seconds.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => {
            let raw = raw.trim();
            if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
                return Some(parsed.with_timezone(&Utc));
            }
            [
                "%Y-%m-%dT%H:%M:%S%.f",
                "%Y-%m-%dT%H:%M:%S",
                "%Y-%m-%d %H:%M:%S%.f",
                "%Y-%m-%d %H:%M:%S",
            ]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| naive.and_utc())
        }
        Value::Number(number) => number
            .as_i64()
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0)),
        _ => None,
    }
}
