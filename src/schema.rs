//! JSON Schema (Draft 7) induction and the merge lattice over it.

use fnv::FnvHashSet;
use itertools::Itertools;
use serde_json::{Map, Value};

use crate::flatten::leaf_type_name;
use crate::options::EngineOptions;

const SCHEMA_URI: &str = "http://json-schema.org/draft-07/schema#";

/// Induces a Draft-7 schema describing a single document.
pub fn induce(node: &Value, opts: &EngineOptions) -> Value {
    let mut schema = induce_inner(node, opts);
    if let Value::Object(map) = &mut schema {
        map.insert(
            "$schema".to_string(),
            Value::String(SCHEMA_URI.to_string()),
        );
    }
    schema
}

/// Induces a single schema describing every element of `batch`, merging
/// per-element schemas under the lattice in `merge`. An empty batch
/// induces the schema of `null`.
pub fn induce_batch(batch: &[Value], opts: &EngineOptions) -> Value {
    let merged = batch
        .iter()
        .map(|v| induce_inner(v, opts))
        .reduce(|a, b| merge(&a, &b))
        .unwrap_or_else(|| induce_inner(&Value::Null, opts));
    add_schema_uri(merged)
}

fn add_schema_uri(mut schema: Value) -> Value {
    if let Value::Object(map) = &mut schema {
        map.insert(
            "$schema".to_string(),
            Value::String(SCHEMA_URI.to_string()),
        );
    }
    schema
}

/// Induces a bare (no `$schema` key) schema node for `node`, the unit the
/// merge lattice operates over.
fn induce_inner(node: &Value, opts: &EngineOptions) -> Value {
    let mut obj = Map::new();
    match node {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            obj.insert("type".to_string(), Value::String(leaf_type_name(node).to_string()));
        }
        Value::Array(items) => {
            obj.insert("type".to_string(), Value::String("array".to_string()));
            let sample = items.iter().take(opts.max_array_sample_size);
            let items_schema = sample
                .map(|v| induce_inner(v, opts))
                .reduce(|a, b| merge(&a, &b));
            if let Some(items_schema) = items_schema {
                obj.insert("items".to_string(), items_schema);
            }
        }
        Value::Object(map) => {
            obj.insert("type".to_string(), Value::String("object".to_string()));
            let mut properties = Map::new();
            for (key, value) in map {
                properties.insert(key.clone(), induce_inner(value, opts));
            }
            let mut required: Vec<String> = map.keys().cloned().collect();
            required.sort();
            obj.insert("properties".to_string(), Value::Object(properties));
            obj.insert(
                "required".to_string(),
                Value::Array(required.into_iter().map(Value::String).collect()),
            );
        }
    }
    Value::Object(obj)
}

/// Merges two induced schema nodes under the type lattice. Associative and
/// commutative up to the sorted-union ordering rule.
pub fn merge(a: &Value, b: &Value) -> Value {
    let a_obj = a.as_object().cloned().unwrap_or_default();
    let b_obj = b.as_object().cloned().unwrap_or_default();

    let mut out = Map::new();
    out.insert("type".to_string(), merge_type(&a_obj, &b_obj));

    let has_properties = a_obj.contains_key("properties") || b_obj.contains_key("properties");
    if has_properties {
        let a_props = a_obj
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let b_props = b_obj
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let keys: Vec<&String> = a_props.keys().chain(b_props.keys()).sorted().dedup().collect();

        let mut merged_props = Map::new();
        for key in keys {
            let merged = match (a_props.get(key), b_props.get(key)) {
                (Some(x), Some(y)) => merge(x, y),
                (Some(x), None) => x.clone(),
                (None, Some(y)) => y.clone(),
                (None, None) => unreachable!("key came from one of the two maps"),
            };
            merged_props.insert(key.clone(), merged);
        }
        out.insert("properties".to_string(), Value::Object(merged_props));
        out.insert("required".to_string(), merge_required(&a_obj, &b_obj));
    }

    if a_obj.contains_key("items") || b_obj.contains_key("items") {
        let merged_items = match (a_obj.get("items"), b_obj.get("items")) {
            (Some(x), Some(y)) => merge(x, y),
            (Some(x), None) => x.clone(),
            (None, Some(y)) => y.clone(),
            (None, None) => unreachable!(),
        };
        out.insert("items".to_string(), merged_items);
    }

    Value::Object(out)
}

/// `required` becomes the intersection of the two operands' `required`
/// sets.
fn merge_required(a_obj: &Map<String, Value>, b_obj: &Map<String, Value>) -> Value {
    let a_required: FnvHashSet<String> = string_set(a_obj.get("required"));
    let b_required: FnvHashSet<String> = string_set(b_obj.get("required"));
    let mut intersection: Vec<String> = a_required.intersection(&b_required).cloned().collect();
    intersection.sort();
    Value::Array(intersection.into_iter().map(Value::String).collect())
}

fn string_set(value: Option<&Value>) -> FnvHashSet<String> {
    value
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

/// Merges two `type` fields (each either a single string or a sorted
/// array of strings) into the union, deduplicated and sorted.
fn merge_type(a_obj: &Map<String, Value>, b_obj: &Map<String, Value>) -> Value {
    let mut types: FnvHashSet<String> = FnvHashSet::default();
    for obj in [a_obj, b_obj] {
        match obj.get("type") {
            Some(Value::String(s)) => {
                types.insert(s.clone());
            }
            Some(Value::Array(items)) => {
                for item in items {
                    if let Value::String(s) = item {
                        types.insert(s.clone());
                    }
                }
            }
            _ => {}
        }
    }
    let mut sorted: Vec<String> = types.into_iter().collect();
    sorted.sort();
    match sorted.len() {
        0 => Value::Null,
        1 => Value::String(sorted.into_iter().next().unwrap()),
        _ => Value::Array(sorted.into_iter().map(Value::String).collect()),
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod schema_tests;
