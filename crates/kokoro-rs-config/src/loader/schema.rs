//! Schema checks for Kokoro JSON5 configuration layers.
//!
//! Every layer is checked on its own so errors name the file that
//! introduced them; all fields are optional at this stage.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Check one layer against the schema.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    ensure_allowed_keys(map, &["$schema", "memory"], layer, "")?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("memory") {
        validate_memory(value, layer, "memory")?;
    }
    Ok(())
}

/// Validate the "memory" block.
fn validate_memory(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    let allowed = [
        "provider",
        "path",
        "capacity",
        "recall",
        "quality",
        "consolidation",
        "relations",
    ];
    ensure_allowed_keys(map, &allowed, layer, path)?;

    if let Some(value) = map.get("provider") {
        expect_one_of(value, &["file", "memory"], layer, &join_path(path, "provider"))?;
    }
    if let Some(value) = map.get("path") {
        expect_string(value, layer, &join_path(path, "path"))?;
    }
    if let Some(value) = map.get("capacity") {
        expect_u64(value, layer, &join_path(path, "capacity"))?;
    }
    if let Some(value) = map.get("recall") {
        validate_recall(value, layer, &join_path(path, "recall"))?;
    }
    if let Some(value) = map.get("quality") {
        validate_quality(value, layer, &join_path(path, "quality"))?;
    }
    if let Some(value) = map.get("consolidation") {
        let path = join_path(path, "consolidation");
        let map = expect_object(value, layer, &path)?;
        ensure_allowed_keys(map, &["similarity_threshold"], layer, &path)?;
        if let Some(value) = map.get("similarity_threshold") {
            expect_f64(value, layer, &join_path(&path, "similarity_threshold"))?;
        }
    }
    if let Some(value) = map.get("relations") {
        validate_relations(value, layer, &join_path(path, "relations"))?;
    }
    Ok(())
}

/// Validate recall defaults.
fn validate_recall(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["limit", "mode", "min_score"], layer, path)?;

    if let Some(value) = map.get("limit") {
        expect_u64(value, layer, &join_path(path, "limit"))?;
    }
    if let Some(value) = map.get("mode") {
        expect_one_of(value, &["keyword", "semantic"], layer, &join_path(path, "mode"))?;
    }
    if let Some(value) = map.get("min_score")
        && !value.is_null()
    {
        expect_f64(value, layer, &join_path(path, "min_score"))?;
    }
    Ok(())
}

/// Validate quality gate thresholds.
fn validate_quality(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    let integers = [
        "min_chars",
        "single_token_max_chars",
        "near_duplicate_min_chars",
    ];
    let numbers = ["near_duplicate_threshold", "min_importance"];
    let lists = ["generic_phrases", "deny_patterns"];
    let allowed: Vec<&str> = integers.iter().chain(&numbers).chain(&lists).copied().collect();
    ensure_allowed_keys(map, &allowed, layer, path)?;

    for key in integers {
        if let Some(value) = map.get(key) {
            expect_u64(value, layer, &join_path(path, key))?;
        }
    }
    for key in numbers {
        if let Some(value) = map.get(key) {
            expect_f64(value, layer, &join_path(path, key))?;
        }
    }
    for key in lists {
        if let Some(value) = map.get(key) {
            validate_string_array(value, layer, &join_path(path, key))?;
        }
    }
    Ok(())
}

/// Validate relation thresholds.
fn validate_relations(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["related_threshold", "graph_edge_threshold", "graph_max_nodes"],
        layer,
        path,
    )?;

    for key in ["related_threshold", "graph_edge_threshold"] {
        if let Some(value) = map.get(key) {
            expect_f64(value, layer, &join_path(path, key))?;
        }
    }
    if let Some(value) = map.get("graph_max_nodes") {
        expect_u64(value, layer, &join_path(path, "graph_max_nodes"))?;
    }
    Ok(())
}

fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    value
        .as_object()
        .ok_or_else(|| invalid_field(layer, path, "expected object"))
}

fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    match value {
        Value::String(_) => Ok(()),
        _ => Err(invalid_field(layer, path, "expected string")),
    }
}

/// Expect a string naming one of `choices`.
fn expect_one_of(
    value: &Value,
    choices: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    let Some(choice) = value.as_str() else {
        return Err(invalid_field(layer, path, "expected string"));
    };
    if choices.contains(&choice) {
        Ok(())
    } else {
        let message = format!("expected one of {}", choices.join(", "));
        Err(invalid_field(layer, path, &message))
    }
}

/// Non-negative integers only.
fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    match value.as_u64() {
        Some(_) => Ok(()),
        None => Err(invalid_field(layer, path, "expected non-negative integer")),
    }
}

fn expect_f64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    match value {
        Value::Number(_) => Ok(()),
        _ => Err(invalid_field(layer, path, "expected number")),
    }
}

fn validate_string_array(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let Some(entries) = value.as_array() else {
        return Err(invalid_field(layer, path, "expected array"));
    };
    match entries.iter().position(|entry| !entry.is_string()) {
        Some(idx) => Err(invalid_field(
            layer,
            &format!("{path}[{idx}]"),
            "expected string",
        )),
        None => Ok(()),
    }
}

/// Reject keys outside `allowed`.
fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    match map.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(invalid_field(layer, &join_path(path, key), "unknown key")),
        None => Ok(()),
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Error located as `layer:path`, with `root` for the top level.
fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{path}"),
        message: message.to_string(),
    }
}
