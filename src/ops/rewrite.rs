//! `ReplaceKeys` and `ReplaceValues` rewrite operators.

use serde_json::{Map, Value};

use crate::regex_engine::CompiledPattern;

/// Walks `node`'s objects, substituting each key that matches `pattern`.
/// Duplicate keys after substitution are last-wins, which falls out
/// naturally from rebuilding the object by sequential `Map::insert`.
pub fn replace_keys(node: &Value, pattern: &CompiledPattern, replacement: &str) -> Value {
    match node {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                let (new_key, _) = pattern
                    .replace_all(key, replacement)
                    .unwrap_or_else(|_| (key.clone(), 0));
                out.insert(new_key, replace_keys(value, pattern, replacement));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| replace_keys(v, pattern, replacement))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Walks every node, rewriting string leaves that match `pattern`;
/// non-string leaves and container shapes are untouched.
pub fn replace_values(node: &Value, pattern: &CompiledPattern, replacement: &str) -> Value {
    match node {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), replace_values(value, pattern, replacement));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| replace_values(v, pattern, replacement))
                .collect(),
        ),
        Value::String(s) => {
            let (new_s, _) = pattern
                .replace_all(s, replacement)
                .unwrap_or_else(|_| (s.clone(), 0));
            Value::String(new_s)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn replace_values_by_regex_scenario() {
        let pattern = CompiledPattern::compile("^old_.*$").unwrap();
        let input = json!({"status":"old_active","name":"John"});
        let out = replace_values(&input, &pattern, "new_value");
        assert_eq!(out, json!({"status":"new_value","name":"John"}));
    }

    #[test]
    fn replace_values_ignores_non_string_leaves() {
        let pattern = CompiledPattern::compile("1").unwrap();
        let input = json!({"n": 1, "s": "1x"});
        let out = replace_values(&input, &pattern, "Z");
        assert_eq!(out, json!({"n": 1, "s": "Zx"}));
    }

    #[test]
    fn replace_keys_rewrites_matching_keys() {
        let pattern = CompiledPattern::compile("^old_").unwrap();
        let input = json!({"old_field": 1, "kept": 2});
        let out = replace_keys(&input, &pattern, "new_");
        assert_eq!(out, json!({"new_field": 1, "kept": 2}));
    }

    #[test]
    fn replace_keys_last_wins_on_collision() {
        let pattern = CompiledPattern::compile("^(a|b)$").unwrap();
        let input = json!({"a": 1, "b": 2});
        let out = replace_keys(&input, &pattern, "x");
        let obj = out.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert_eq!(obj.get("x"), Some(&json!(2)));
    }
}
