//! `RemoveEmptyStrings` and `RemoveNulls` filter operators.

use serde_json::{Map, Value};

/// Walks `node`, dropping object pairs whose value is an empty string, and
/// recursing into everything else. Arrays are never filtered themselves,
/// only their elements are recursed into.
pub fn remove_empty_strings(node: &Value) -> Value {
    walk(node, &|v| matches!(v, Value::String(s) if s.is_empty()))
}

/// Walks `node`, dropping object pairs whose value is `null`.
pub fn remove_nulls(node: &Value) -> Value {
    walk(node, &|v| v.is_null())
}

fn walk(node: &Value, should_drop: &dyn Fn(&Value) -> bool) -> Value {
    match node {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                if should_drop(value) {
                    continue;
                }
                out.insert(key.clone(), walk(value, should_drop));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| walk(v, should_drop)).collect()),
        other => other.clone(),
    }
}
