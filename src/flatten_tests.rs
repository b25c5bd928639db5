use super::*;
use serde_json::json;

fn opts() -> EngineOptions {
    EngineOptions::default()
}

#[test]
fn flatten_nested_object() {
    let input = json!({"a":{"b":{"c":1}},"d":[10,20]});
    let out = flatten_node(&input, &opts()).unwrap();
    let obj = out.as_object().unwrap();
    assert_eq!(obj.get("a.b.c"), Some(&json!(1)));
    assert_eq!(obj.get("d[0]"), Some(&json!(10)));
    assert_eq!(obj.get("d[1]"), Some(&json!(20)));
    assert_eq!(obj.len(), 3);
}

#[test]
fn flatten_leaves_only_invariant() {
    let input = json!({"a":{"b":[1,{"c":2}]},"x":null});
    let out = flatten_node(&input, &opts()).unwrap();
    for value in out.as_object().unwrap().values() {
        assert!(!value.is_object());
        assert!(!value.is_array());
    }
}

#[test]
fn array_of_objects_flattened_batch() {
    let input = json!([{"x":1},{"y":{"z":2}}]);
    let Value::Array(items) = input else { unreachable!() };
    let out = flatten_batch(items, false, 0, &opts()).unwrap();
    assert_eq!(out, vec![json!({"x":1}), json!({"y.z":2})]);
}

#[test]
fn primitive_array_passthrough() {
    let input = json!([1, 2, 3]);
    let out = flatten_document(input.clone(), false, 0, &opts()).unwrap();
    assert_eq!(out, input);
}

#[test]
fn parallel_equals_sequential_for_a_large_batch() {
    let elements: Vec<Value> = (0..250)
        .map(|i| json!({"n": i, "nested": {"k": i * 2}}))
        .collect();
    let mut small_batch_opts = opts();
    small_batch_opts.min_batch_size_for_mt = 100;

    let sequential = flatten_batch(elements.clone(), false, 0, &small_batch_opts).unwrap();
    let parallel = flatten_batch(elements, true, 4, &small_batch_opts).unwrap();
    assert_eq!(sequential, parallel);
}

#[test]
fn get_paths_with_types_scenario() {
    let input = json!({
        "name":"J","age":30,"active":true,"score":9.5,"addr":{"c":"X"}
    });
    let types = paths_with_types(&input, &opts()).unwrap();
    assert_eq!(types.get("name"), Some(&"string"));
    assert_eq!(types.get("age"), Some(&"integer"));
    assert_eq!(types.get("active"), Some(&"boolean"));
    assert_eq!(types.get("score"), Some(&"number"));
    assert_eq!(types.get("addr.c"), Some(&"string"));
}

#[test]
fn depth_exceeded_surfaces_on_a_pathological_path() {
    let mut tiny = opts();
    tiny.max_path_depth = 4;
    let input = json!({"way_too_long_a_key": 1});
    let err = flatten_node(&input, &tiny).unwrap_err();
    assert!(matches!(err, crate::error::Error::DepthExceeded(_)));
}

#[test]
fn batch_error_fails_the_whole_batch() {
    let mut tiny = opts();
    tiny.max_path_depth = 4;
    let elements = vec![json!({"ok": 1}), json!({"way_too_long_a_key": 1})];
    let err = flatten_batch(elements, false, 0, &tiny).unwrap_err();
    assert!(matches!(err, crate::error::Error::DepthExceeded(_)));
}
