//! The recursive flattener: collapses a tree into an object of
//! `path -> leaf` pairs.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::arena::{sized_arena, FlattenedArray};
use crate::error::Result;
use crate::options::EngineOptions;
use crate::path::PathBuffer;
use crate::threadpool::parallel_map;

const INITIAL_CAPACITY: usize = 64;

/// Flattens a single document, producing a new object with no nested
/// object or array values at any position.
pub fn flatten_node(node: &Value, opts: &EngineOptions) -> Result<Value> {
    let arena = sized_arena(INITIAL_CAPACITY);
    let mut out = FlattenedArray::new(&arena);
    let root = PathBuffer::new(opts.max_path_depth);
    walk(node, root, &mut out)?;
    Ok(out.into_object())
}

fn walk(node: &Value, path: PathBuffer, out: &mut FlattenedArray) -> Result<()> {
    match node {
        Value::Object(map) => {
            for (key, value) in map {
                let child = path.child_key(key)?;
                walk(value, child, out)?;
            }
        }
        Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                let child = path.child_index(index)?;
                walk(value, child, out)?;
            }
        }
        leaf => out.push(path.as_str(), leaf.clone()),
    }
    Ok(())
}

/// True iff `node` is an array all of whose elements are non-container,
/// in which case the flattener passes it through unchanged.
pub fn is_primitive_array(node: &Value) -> bool {
    match node {
        Value::Array(items) => items
            .iter()
            .all(|v| !matches!(v, Value::Object(_) | Value::Array(_))),
        _ => false,
    }
}

/// Top-level dispatch for a parsed document:
/// - primitive array -> unchanged copy
/// - array with at least one container element -> `flatten_batch`
/// - anything else -> `flatten_node`
pub fn flatten_document(
    root: Value,
    use_threads: bool,
    num_threads: usize,
    opts: &EngineOptions,
) -> Result<Value> {
    if is_primitive_array(&root) {
        return Ok(root);
    }
    match root {
        Value::Array(items) => {
            let flattened = flatten_batch(items, use_threads, num_threads, opts)?;
            Ok(Value::Array(flattened))
        }
        other => flatten_node(&other, opts),
    }
}

/// Flattens every element of `elements` independently, preserving input
/// order in the output regardless of dispatch order: running the batch
/// through the thread pool must produce exactly the same result as running
/// it sequentially.
///
/// Uses the thread pool only when `use_threads` is set, the batch is at
/// least `opts.min_batch_size_for_mt` elements, and more than one thread
/// resolves out of `num_threads`. A per-element error fails the whole
/// batch.
pub fn flatten_batch(
    elements: Vec<Value>,
    use_threads: bool,
    num_threads: usize,
    opts: &EngineOptions,
) -> Result<Vec<Value>> {
    let threads = opts.resolve_threads(num_threads);
    let should_parallelize =
        use_threads && elements.len() >= opts.min_batch_size_for_mt && threads > 1;

    if should_parallelize {
        let opts = opts.clone();
        let results = parallel_map(elements, threads, move |el| flatten_node(&el, &opts));
        results.into_iter().collect()
    } else {
        elements.iter().map(|el| flatten_node(el, opts)).collect()
    }
}

/// Returns the JSON-type name of a leaf, used by `paths_with_types` and
/// by `schema::induce_inner` for schema induction.
pub fn leaf_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "integer"
            } else {
                "number"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Flattens `node` and maps every resulting key to its leaf's type name
/// instead of its value. Returned as a `BTreeMap` for deterministic
/// iteration order independent of the input's key order.
pub fn paths_with_types(node: &Value, opts: &EngineOptions) -> Result<BTreeMap<String, &'static str>> {
    let flattened = flatten_node(node, opts)?;
    let mut out = BTreeMap::new();
    if let Value::Object(map) = flattened {
        for (key, value) in map {
            out.insert(key, leaf_type_name(&value));
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "flatten_tests.rs"]
mod flatten_tests;
