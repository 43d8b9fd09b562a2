//! Key-path addressing over nested API responses.
//!
//! Flattening is one-way: it exists so that callers can match paths against
//! leaf values, not to reconstruct the original structure.

use serde_json::Value;

/// Flattens a nested value into `(flat_key, leaf)` pairs.
///
/// Nested maps contribute keys joined by `.`, sequences suffix `[i]`, and an
/// empty sequence is recorded once as an empty-sequence leaf. Traversal order
/// follows the input's natural key/index order.
pub fn flatten(value: &Value) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    walk("", value, &mut out);
    out
}

fn walk(prefix: &str, value: &Value, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let flat_key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                walk(&flat_key, child, out);
            }
        }
        Value::Array(items) => {
            if items.is_empty() {
                out.push((prefix.to_string(), Value::Array(Vec::new())));
            } else {
                for (i, item) in items.iter().enumerate() {
                    walk(&format!("{prefix}[{i}]"), item, out);
                }
            }
        }
        leaf => out.push((prefix.to_string(), leaf.clone())),
    }
}

/// Walks a dotted `path` through nested maps and returns the sequence found
/// at the end.
///
/// A missing intermediate key or a non-sequence leaf both yield an empty
/// vector: callers treat "no matches" uniformly, never as an error.
pub fn extract_by_path(value: &Value, path: &str) -> Vec<Value> {
    let mut current = value;
    for key in path.split('.') {
        match current.get(key) {
            Some(next) => current = next,
            None => return Vec::new(),
        }
    }
    match current {
        Value::Array(items) => items.clone(),
        _ => Vec::new(),
    }
}

/// Collects leaves whose flat key contains `needle` as a substring, in
/// traversal order. Used by API crawls to pull records out of arbitrary
/// response shapes without knowing the exact nesting.
pub fn match_flat_keys(value: &Value, needle: &str) -> Vec<Value> {
    flatten(value)
        .into_iter()
        .filter(|(key, _)| key.contains(needle))
        .map(|(_, leaf)| leaf)
        .collect()
}
