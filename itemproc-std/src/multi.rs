//! Processors that reduce a batch of values.
//!
//! These run once per batch (the `call` transform) and are typically used
//! as output processors: pick one value, keep the meaningful ones, or join
//! them.

use itemproc_macros::processor;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Return every value unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TakeAll;

#[processor(crate = itemproc_core, register)]
impl TakeAll {
    fn call(values: Vec<Value>, _context: &Self) -> Vec<Value> {
        values
    }
}

/// Return every value unchanged.
///
/// The same as [`TakeAll`], under the name that reads better for input
/// processors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity;

#[processor(crate = itemproc_core, register)]
impl Identity {
    fn call(values: Vec<Value>, _context: &Self) -> Vec<Value> {
        values
    }
}

/// The first value that is not excluded, or `default`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TakeFirst {
    /// Values skipped even when first.
    pub exclude: Vec<Value>,
    /// Returned when every value is excluded.
    pub default: Value,
}

impl Default for TakeFirst {
    fn default() -> Self {
        Self {
            exclude: vec![Value::Null, Value::from("")],
            default: Value::Null,
        }
    }
}

#[processor(crate = itemproc_core, register)]
impl TakeFirst {
    fn call(values: Vec<Value>, context: &Self) -> Value {
        values
            .into_iter()
            .find(|value| !context.exclude.iter().any(|excluded| same_value(value, excluded)))
            .unwrap_or_else(|| context.default.clone())
    }
}

/// The first truthy value, or `default`.
///
/// A value is falsey when it matches one of `falsey_values`, or when it is
/// an empty string, list or object and `empty_iterables_are_falsey` is set.
/// Values matching `exclude` are always truthy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TakeFirstTruthy {
    /// Values treated as falsey.
    pub falsey_values: Vec<Value>,
    /// Treat `""`, `[]` and `{}` as falsey.
    pub empty_iterables_are_falsey: bool,
    /// Values treated as truthy regardless.
    pub exclude: Vec<Value>,
    /// Returned when no value is truthy.
    pub default: Value,
}

impl Default for TakeFirstTruthy {
    fn default() -> Self {
        Self {
            falsey_values: default_falsey_values(),
            empty_iterables_are_falsey: true,
            exclude: Vec::new(),
            default: Value::Null,
        }
    }
}

#[processor(crate = itemproc_core, register)]
impl TakeFirstTruthy {
    fn call(values: Vec<Value>, context: &Self) -> Value {
        values
            .into_iter()
            .find(|value| {
                is_truthy(
                    value,
                    &context.falsey_values,
                    context.empty_iterables_are_falsey,
                    &context.exclude,
                )
            })
            .unwrap_or_else(|| context.default.clone())
    }
}

/// Every truthy value, or `default` when there are none.
///
/// Truthiness follows [`TakeFirstTruthy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TakeAllTruthy {
    /// Values treated as falsey.
    pub falsey_values: Vec<Value>,
    /// Treat `""`, `[]` and `{}` as falsey.
    pub empty_iterables_are_falsey: bool,
    /// Values treated as truthy regardless.
    pub exclude: Vec<Value>,
    /// Returned when no value is truthy.
    pub default: Value,
}

impl Default for TakeAllTruthy {
    fn default() -> Self {
        Self {
            falsey_values: default_falsey_values(),
            empty_iterables_are_falsey: true,
            exclude: Vec::new(),
            default: Value::Null,
        }
    }
}

#[processor(crate = itemproc_core, register)]
impl TakeAllTruthy {
    fn call(values: Vec<Value>, context: &Self) -> Value {
        let truthy: Vec<Value> = values
            .into_iter()
            .filter(|value| {
                is_truthy(
                    value,
                    &context.falsey_values,
                    context.empty_iterables_are_falsey,
                    &context.exclude,
                )
            })
            .collect();
        if truthy.is_empty() {
            context.default.clone()
        } else {
            Value::Array(truthy)
        }
    }
}

/// The first non-null value, or `default`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coalesce {
    /// Returned when every value is null.
    pub default: Value,
}

#[processor(crate = itemproc_core, register)]
impl Coalesce {
    fn call(values: Vec<Value>, context: &Self) -> Value {
        values
            .into_iter()
            .find(|value| !value.is_null())
            .unwrap_or_else(|| context.default.clone())
    }
}

/// Join the values into one string.
///
/// Strings are joined as-is; other values use their JSON rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Join {
    /// Placed between values.
    pub separator: String,
}

impl Default for Join {
    fn default() -> Self {
        Self {
            separator: " ".into(),
        }
    }
}

#[processor(crate = itemproc_core, register)]
impl Join {
    fn call(values: Vec<Value>, context: &Self) -> String {
        values
            .iter()
            .map(|value| match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(&context.separator)
    }
}

/// Flatten nested lists into one list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Flatten;

#[processor(crate = itemproc_core, register)]
impl Flatten {
    fn call(values: Vec<Value>, _context: &Self) -> Vec<Value> {
        let mut flat = Vec::with_capacity(values.len());
        flatten_into(&mut flat, values);
        flat
    }
}

fn flatten_into(out: &mut Vec<Value>, values: Vec<Value>) {
    for value in values {
        match value {
            Value::Array(nested) => flatten_into(out, nested),
            other => out.push(other),
        }
    }
}

fn default_falsey_values() -> Vec<Value> {
    vec![Value::Null, Value::Bool(false), Value::from(0)]
}

/// Equality where every JSON number compares by numeric value.
fn same_value(value: &Value, other: &Value) -> bool {
    match (value, other) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => value == other,
    }
}

fn is_truthy(value: &Value, falsey_values: &[Value], empty_iterables_are_falsey: bool, exclude: &[Value]) -> bool {
    if exclude.iter().any(|excluded| same_value(value, excluded)) {
        return true;
    }
    let empty = match value {
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    };
    if empty_iterables_are_falsey && empty {
        return false;
    }
    !falsey_values.iter().any(|falsey| same_value(value, falsey))
}
