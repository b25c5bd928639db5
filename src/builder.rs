//! The operation pipeline / builder: an ordered list of operations executed
//! as a single recursive pass, with `Flatten` (if present) applied once at
//! the end.

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::flatten::flatten_node;
use crate::options::EngineOptions;
use crate::regex_engine::CompiledPattern;

/// One transformation step. `ReplaceKeys`/`ReplaceValues` carry their raw
/// pattern/replacement text; compilation happens lazily in `build()`,
/// populated only when the builder is actually run.
#[derive(Debug, Clone)]
pub enum Operation {
    RemoveEmptyStrings,
    RemoveNulls,
    ReplaceKeys { pattern: String, replacement: String },
    ReplaceValues { pattern: String, replacement: String },
    Flatten,
}

/// One bit per operation kind. A fixed, five-bit, internal-only set has no
/// public API surface of its own, so plain constants read clearer here
/// than a dependency on the `bitflags` crate would.
mod op_bit {
    pub const REMOVE_EMPTY_STRINGS: u8 = 0b0_0001;
    pub const REMOVE_NULLS: u8 = 0b0_0010;
    pub const REPLACE_KEYS: u8 = 0b0_0100;
    pub const REPLACE_VALUES: u8 = 0b0_1000;
    pub const FLATTEN: u8 = 0b1_0000;
}

/// Ordered operation list plus the document it will run against.
pub struct Builder {
    operations: Vec<Operation>,
    input: Value,
    pretty_print: bool,
    opts: EngineOptions,
}

struct CompiledOps {
    remove_empty_strings: bool,
    remove_nulls: bool,
    replace_keys: Option<(CompiledPattern, String)>,
    replace_values: Option<(CompiledPattern, String)>,
    flatten: bool,
}

impl Builder {
    pub fn new(input: Value) -> Self {
        Builder {
            operations: Vec::new(),
            input,
            pretty_print: false,
            opts: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, opts: EngineOptions) -> Self {
        self.opts = opts;
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty_print = pretty;
        self
    }

    pub fn add_operation(mut self, op: Operation) -> Self {
        self.operations.push(op);
        self
    }

    /// Bitmask of the operation kinds present, one bit per kind.
    fn bitmask(&self) -> u8 {
        self.operations.iter().fold(0u8, |mask, op| {
            mask | match op {
                Operation::RemoveEmptyStrings => op_bit::REMOVE_EMPTY_STRINGS,
                Operation::RemoveNulls => op_bit::REMOVE_NULLS,
                Operation::ReplaceKeys { .. } => op_bit::REPLACE_KEYS,
                Operation::ReplaceValues { .. } => op_bit::REPLACE_VALUES,
                Operation::Flatten => op_bit::FLATTEN,
            }
        })
    }

    /// Validates the operation list, compiles every regex operation, and
    /// runs the single-pass traversal, applying `Flatten` last if present.
    /// Returns the serialized result (pretty or compact per
    /// `pretty_print`).
    ///
    /// `Flatten` must be the last operation in construction order; a
    /// `Flatten` anywhere else is rejected here as `InvalidInput` rather
    /// than silently relocated.
    pub fn build(self) -> Result<String> {
        if let Some(pos) = self
            .operations
            .iter()
            .position(|op| matches!(op, Operation::Flatten))
        {
            if pos != self.operations.len() - 1 {
                return Err(Error::invalid_input(
                    "Flatten must be the last operation in the builder",
                ));
            }
        }

        let _mask = self.bitmask();
        let compiled = self.compile()?;

        let mut result = traverse(&self.input, &compiled);
        if compiled.flatten {
            result = flatten_node(&result, &self.opts)?;
        }

        if self.pretty_print {
            serde_json::to_string_pretty(&result)
                .map_err(|e| Error::invalid_input(e.to_string()))
        } else {
            serde_json::to_string(&result).map_err(|e| Error::invalid_input(e.to_string()))
        }
    }

    fn compile(&self) -> Result<CompiledOps> {
        let mut compiled = CompiledOps {
            remove_empty_strings: false,
            remove_nulls: false,
            replace_keys: None,
            replace_values: None,
            flatten: false,
        };
        for op in &self.operations {
            match op {
                Operation::RemoveEmptyStrings => compiled.remove_empty_strings = true,
                Operation::RemoveNulls => compiled.remove_nulls = true,
                Operation::Flatten => compiled.flatten = true,
                Operation::ReplaceKeys { pattern, replacement } => {
                    compiled.replace_keys =
                        Some((CompiledPattern::compile(pattern)?, replacement.clone()));
                }
                Operation::ReplaceValues { pattern, replacement } => {
                    compiled.replace_values =
                        Some((CompiledPattern::compile(pattern)?, replacement.clone()));
                }
            }
        }
        Ok(compiled)
    }
}

/// The single recursive pass: at each object pair, test "should drop"
/// first; otherwise rewrite the key, rewrite string values, then recurse.
/// All filters/rewrites apply at every visited node regardless of the
/// operations' listed order (only `Flatten` is ordered, and it is applied
/// outside this pass).
fn traverse(node: &Value, ops: &CompiledOps) -> Value {
    match node {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                if should_drop(value, ops) {
                    continue;
                }
                let new_key = match &ops.replace_keys {
                    Some((pattern, replacement)) => pattern
                        .replace_all(key, replacement)
                        .map(|(s, _)| s)
                        .unwrap_or_else(|_| key.clone()),
                    None => key.clone(),
                };
                out.insert(new_key, rewrite_then_recurse(value, ops));
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| traverse(v, ops)).collect())
        }
        other => rewrite_leaf(other, ops),
    }
}

fn should_drop(value: &Value, ops: &CompiledOps) -> bool {
    (ops.remove_empty_strings && matches!(value, Value::String(s) if s.is_empty()))
        || (ops.remove_nulls && value.is_null())
}

fn rewrite_then_recurse(value: &Value, ops: &CompiledOps) -> Value {
    match value {
        Value::Object(_) | Value::Array(_) => traverse(value, ops),
        leaf => rewrite_leaf(leaf, ops),
    }
}

fn rewrite_leaf(value: &Value, ops: &CompiledOps) -> Value {
    match (&ops.replace_values, value) {
        (Some((pattern, replacement)), Value::String(s)) => {
            let (new_s, _) = pattern
                .replace_all(s, replacement)
                .unwrap_or_else(|_| (s.clone(), 0));
            Value::String(new_s)
        }
        _ => value.clone(),
    }
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod builder_tests;
