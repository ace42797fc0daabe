//! Read-time importance decay.
//!
//! Decay is never written back to records. Every caller that needs a
//! record's effective importance (stats, recall ranking, summaries, graphs)
//! goes through [`current_importance`] so rankings stay consistent.

use crate::category::MemoryCategory;

/// Minimum decay factor for persistent categories.
pub const PERSISTENT_DECAY_FLOOR: f64 = 0.7;

/// Stepwise retention factor for a record of the given age.
fn stepped_factor(age_days: i64) -> f64 {
    match age_days {
        i64::MIN..=0 => 1.0,
        1 => 0.95,
        2..=7 => 0.85,
        8..=30 => 0.65,
        31..=90 => 0.45,
        _ => 0.25,
    }
}

/// Decay factor for a category at a given age in whole days.
pub fn decay_factor(category: &MemoryCategory, age_days: i64) -> f64 {
    let factor = stepped_factor(age_days);
    if category.is_persistent() {
        factor.max(PERSISTENT_DECAY_FLOOR)
    } else {
        factor
    }
}

/// Effective importance of a record with `base_importance` at `age_days`.
pub fn current_importance(base_importance: f64, category: &MemoryCategory, age_days: i64) -> f64 {
    base_importance * decay_factor(category, age_days)
}
