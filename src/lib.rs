//! A high-throughput JSON transformation engine: flatten, induce schema,
//! filter, and rewrite, with an optional parallel batch path.
//!
//! This crate is the engine only; a CLI front end, stdin/file reading, and
//! any language-binding glue are deliberately external collaborators and
//! not part of this surface.
//!
//! The DOM is `serde_json::Value`: object key ordering is preserved end to
//! end (`serde_json`'s `preserve_order` feature), so transformations never
//! reorder sibling keys.

pub mod arena;
pub mod builder;
pub mod error;
pub mod flatten;
pub mod ops;
pub mod options;
pub mod path;
pub mod queue;
pub mod regex_engine;
pub mod schema;
pub mod slab_alloc;
pub mod threadpool;

pub use builder::{Builder, Operation};
pub use error::{Error, Result};
pub use options::EngineOptions;

use serde_json::Value;

use crate::options::time;
use crate::regex_engine::CompiledPattern;

fn parse_input(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Err(Error::invalid_input("input text is empty"));
    }
    serde_json::from_str(text).map_err(|e| Error::invalid_input(e.to_string()))
}

fn serialize(value: &Value, pretty: bool) -> Result<String> {
    let result = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    result.map_err(|e| Error::invalid_input(e.to_string()))
}

/// Flattens a single JSON document.
pub fn flatten_json(
    text: &str,
    use_threads: bool,
    num_threads: usize,
    pretty: bool,
) -> Result<String> {
    flatten_json_with(text, use_threads, num_threads, pretty, &EngineOptions::default())
}

/// As `flatten_json`, with caller-supplied tunables.
pub fn flatten_json_with(
    text: &str,
    use_threads: bool,
    num_threads: usize,
    pretty: bool,
    opts: &EngineOptions,
) -> Result<String> {
    time(opts, "flatten_json", || {
        let root = parse_input(text)?;
        let flattened = flatten::flatten_document(root, use_threads, num_threads, opts)?;
        serialize(&flattened, pretty)
    })
}

/// Induces a Draft-7 JSON Schema for a single document.
/// `use_threads`/`num_threads` are accepted for signature symmetry with
/// the batch form but induction over one document is always sequential.
pub fn generate_schema(
    text: &str,
    _use_threads: bool,
    _num_threads: usize,
) -> Result<String> {
    let opts = EngineOptions::default();
    let root = parse_input(text)?;
    let schema = schema::induce(&root, &opts);
    serialize(&schema, false)
}

/// Flattens each of `texts` independently, dispatching across the thread
/// pool when the batch and thread count clear `min_batch_size_for_mt`.
/// A parse or flatten error on any element fails the whole batch.
pub fn flatten_batch(
    texts: &[String],
    use_threads: bool,
    num_threads: usize,
    pretty: bool,
) -> Result<Vec<String>> {
    let opts = EngineOptions::default();
    let roots: Vec<Value> = texts
        .iter()
        .map(|t| parse_input(t))
        .collect::<Result<_>>()?;

    let threads = opts.resolve_threads(num_threads);
    let should_parallelize =
        use_threads && roots.len() >= opts.min_batch_size_for_mt && threads > 1;

    let flattened: Vec<Value> = if should_parallelize {
        let opts = opts.clone();
        let results = threadpool::parallel_map(roots, threads, move |root| {
            flatten::flatten_document(root, false, 0, &opts)
        });
        results.into_iter().collect::<Result<_>>()?
    } else {
        roots
            .into_iter()
            .map(|root| flatten::flatten_document(root, false, 0, &opts))
            .collect::<Result<_>>()?
    };

    flattened.iter().map(|v| serialize(v, pretty)).collect()
}

/// Induces a single schema describing every document in `texts`.
pub fn generate_schema_batch(
    texts: &[String],
    _use_threads: bool,
    _num_threads: usize,
) -> Result<String> {
    let opts = EngineOptions::default();
    let roots: Vec<Value> = texts
        .iter()
        .map(|t| parse_input(t))
        .collect::<Result<_>>()?;
    let schema = schema::induce_batch(&roots, &opts);
    serialize(&schema, false)
}

/// Flattens `text` and returns a mapping from each resulting path to its
/// leaf's JSON type name.
pub fn get_flattened_paths_with_types(text: &str, pretty: bool) -> Result<String> {
    let opts = EngineOptions::default();
    let root = parse_input(text)?;
    let paths = flatten::paths_with_types(&root, &opts)?;
    let map: serde_json::Map<String, Value> = paths
        .into_iter()
        .map(|(k, v)| (k, Value::String(v.to_string())))
        .collect();
    serialize(&Value::Object(map), pretty)
}

/// Drops empty-string-valued object pairs.
pub fn remove_empty_strings(text: &str, pretty: bool) -> Result<String> {
    let root = parse_input(text)?;
    serialize(&ops::filter::remove_empty_strings(&root), pretty)
}

/// Drops null-valued object pairs.
pub fn remove_nulls(text: &str, pretty: bool) -> Result<String> {
    let root = parse_input(text)?;
    serialize(&ops::filter::remove_nulls(&root), pretty)
}

/// Rewrites object keys matching `pattern`.
pub fn replace_keys(text: &str, pattern: &str, replacement: &str, pretty: bool) -> Result<String> {
    let root = parse_input(text)?;
    let compiled = CompiledPattern::compile(pattern)?;
    serialize(&ops::rewrite::replace_keys(&root, &compiled, replacement), pretty)
}

/// Rewrites string leaves matching `pattern`.
pub fn replace_values(
    text: &str,
    pattern: &str,
    replacement: &str,
    pretty: bool,
) -> Result<String> {
    let root = parse_input(text)?;
    let compiled = CompiledPattern::compile(pattern)?;
    serialize(&ops::rewrite::replace_values(&root, &compiled, replacement), pretty)
}

/// Runs an ad hoc sequence of operations through the builder pipeline.
pub fn builder_execute(text: &str, operations: Vec<Operation>, pretty: bool) -> Result<String> {
    let root = parse_input(text)?;
    let mut builder = Builder::new(root).pretty(pretty);
    for op in operations {
        builder = builder.add_operation(op);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_json_rejects_empty_input() {
        let err = flatten_json("", false, 0, false).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn flatten_json_rejects_malformed_json() {
        let err = flatten_json("{not json", false, 0, false).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn end_to_end_flatten() {
        let out = flatten_json(r#"{"a":{"b":1}}"#, false, 0, false).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value, serde_json::json!({"a.b": 1}));
    }

    #[test]
    fn end_to_end_schema() {
        let out = generate_schema(r#"{"a":1}"#, false, 0).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["type"], serde_json::json!("object"));
    }

    #[test]
    fn end_to_end_batch_flatten_preserves_order() {
        let texts: Vec<String> = vec![
            r#"{"x":1}"#.to_string(),
            r#"{"y":{"z":2}}"#.to_string(),
        ];
        let out = flatten_batch(&texts, false, 0, false).unwrap();
        assert_eq!(out.len(), 2);
        let first: Value = serde_json::from_str(&out[0]).unwrap();
        let second: Value = serde_json::from_str(&out[1]).unwrap();
        assert_eq!(first, serde_json::json!({"x": 1}));
        assert_eq!(second, serde_json::json!({"y.z": 2}));
    }

    #[test]
    fn end_to_end_builder_execute() {
        let out = builder_execute(
            r#"{"status":"old_active","empty":""}"#,
            vec![
                Operation::RemoveEmptyStrings,
                Operation::ReplaceValues {
                    pattern: "^old_.*$".to_string(),
                    replacement: "new_value".to_string(),
                },
            ],
            false,
        )
        .unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value, serde_json::json!({"status": "new_value"}));
    }
}
