//! Merging layer values under requirement constraints.

use serde_json::{Map, Value};

/// Fold `layers` in order on top of the requirements, which stay locked.
pub(super) fn merge_layers(layers: &[Value], constraints: Option<&Value>) -> Value {
    let mut merged = Value::Object(Map::new());
    if let Some(constraints) = constraints {
        overlay(&mut merged, constraints, None);
    }
    for layer in layers {
        overlay(&mut merged, layer, constraints);
    }
    merged
}

/// Overlay `value` onto `base`. Objects merge per key; anything else
/// replaces. A key whose constraint is a non-object value is locked.
fn overlay(base: &mut Value, value: &Value, constraint: Option<&Value>) {
    let (base_map, value_map) = match (base, value) {
        (Value::Object(base_map), Value::Object(value_map)) => (base_map, value_map),
        (base, value) => {
            if constraint.is_none() {
                *base = value.clone();
            }
            return;
        }
    };
    let constraint_map = match constraint {
        None => None,
        Some(Value::Object(map)) => Some(map),
        Some(_) => return,
    };
    for (key, child) in value_map {
        let child_constraint = constraint_map.and_then(|map| map.get(key));
        if child_constraint.is_some_and(|locked| !locked.is_object()) {
            continue;
        }
        let slot = base_map.entry(key.clone()).or_insert_with(|| {
            if child_constraint.is_some() {
                Value::Object(Map::new())
            } else {
                Value::Null
            }
        });
        overlay(slot, child, child_constraint);
    }
}

#[cfg(test)]
mod tests {
    use super::merge_layers;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn later_layers_override_and_objects_merge() {
        let merged = merge_layers(
            &[
                json!({ "memory": { "capacity": 100, "recall": { "limit": 3 } } }),
                json!({ "memory": { "recall": { "limit": 5 } } }),
            ],
            None,
        );
        assert_eq!(
            merged,
            json!({ "memory": { "capacity": 100, "recall": { "limit": 5 } } })
        );
    }

    #[test]
    fn constrained_leaves_are_locked() {
        let constraints = json!({ "memory": { "capacity": 50 } });
        let merged = merge_layers(
            &[json!({ "memory": { "capacity": 500, "path": "/tmp/kokoro" } })],
            Some(&constraints),
        );
        assert_eq!(
            merged,
            json!({ "memory": { "capacity": 50, "path": "/tmp/kokoro" } })
        );
    }

    #[test]
    fn constrained_arrays_are_not_replaced() {
        let constraints = json!({ "memory": { "quality": { "deny_patterns": ["secret"] } } });
        let merged = merge_layers(
            &[json!({ "memory": { "quality": { "deny_patterns": [] } } })],
            Some(&constraints),
        );
        assert_eq!(merged, constraints);
    }
}
