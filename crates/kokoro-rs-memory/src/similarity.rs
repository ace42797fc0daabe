//! Text similarity helpers shared by the quality gate, consolidation and
//! relation scoring.

use std::collections::HashSet;

/// Lowercased whitespace tokens of `text`.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|token| token.to_lowercase())
        .collect()
}

/// Jaccard similarity over whitespace token sets; 0 when either side is empty.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let left = tokenize(a);
    let right = tokenize(b);
    jaccard(&left, &right)
}

fn jaccard(left: &HashSet<String>, right: &HashSet<String>) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let intersection = left.intersection(right).count();
    let union = left.union(right).count();
    intersection as f64 / union as f64
}

/// Near-duplicate ratio used by the quality gate.
///
/// When one lowercased text contains the other the ratio is
/// `chars(shorter) / chars(longer)`; otherwise it is token Jaccard.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let left = tokenize(a);
    let right = tokenize(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (&a, &b)
    } else {
        (&b, &a)
    };
    if longer.contains(shorter.as_str()) {
        let longer_len = longer.chars().count();
        if longer_len == 0 {
            return 0.0;
        }
        return shorter.chars().count() as f64 / longer_len as f64;
    }
    jaccard(&left, &right)
}

/// Grouping similarity: token Jaccard, raised to at least 0.7 when one
/// text contains the other.
pub fn containment_similarity(a: &str, b: &str) -> f64 {
    let left = tokenize(a);
    let right = tokenize(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let score = jaccard(&left, &right);
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a.contains(b.as_str()) || b.contains(a.as_str()) {
        score.max(0.7)
    } else {
        score
    }
}
