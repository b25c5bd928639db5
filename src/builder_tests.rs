use super::*;
use crate::ops::filter::remove_nulls;
use crate::ops::rewrite::replace_values;
use serde_json::json;

#[test]
fn builder_equals_hand_composed_pipeline() {
    let input = json!({"a": null, "status": "old_active", "name": "John"});

    let via_builder = Builder::new(input.clone())
        .add_operation(Operation::RemoveNulls)
        .add_operation(Operation::ReplaceValues {
            pattern: "^old_.*$".to_string(),
            replacement: "new_value".to_string(),
        })
        .build()
        .unwrap();
    let via_builder: Value = serde_json::from_str(&via_builder).unwrap();

    let pattern = CompiledPattern::compile("^old_.*$").unwrap();
    let composed = replace_values(&remove_nulls(&input), &pattern, "new_value");

    assert_eq!(via_builder, composed);
}

#[test]
fn flatten_runs_terminal_after_filters_and_rewrites() {
    let input = json!({"a": {"b": ""}, "c": {"d": 1}});
    let out = Builder::new(input)
        .add_operation(Operation::RemoveEmptyStrings)
        .add_operation(Operation::Flatten)
        .build()
        .unwrap();
    let out: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(out, json!({"c.d": 1}));
}

#[test]
fn non_terminal_flatten_is_rejected() {
    let input = json!({"a": 1});
    let err = Builder::new(input)
        .add_operation(Operation::Flatten)
        .add_operation(Operation::RemoveNulls)
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[test]
fn invalid_regex_fails_build() {
    let input = json!({"a": 1});
    let err = Builder::new(input)
        .add_operation(Operation::ReplaceKeys {
            pattern: "(".to_string(),
            replacement: "x".to_string(),
        })
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidPattern(_)));
}

#[test]
fn pretty_print_flag_controls_formatting() {
    let input = json!({"a": 1});
    let compact = Builder::new(input.clone()).build().unwrap();
    let pretty = Builder::new(input).pretty(true).build().unwrap();
    assert!(!compact.contains('\n'));
    assert!(pretty.contains('\n'));
}
