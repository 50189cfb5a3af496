//! Value normalization shared by processors and collections.

use serde_json::Value;

/// Normalize an input into a list of values.
///
/// Arrays are used as-is, `null` becomes an empty list and every other
/// value (strings and objects included) becomes a one-element list, so
/// callers never special-case scalar versus batch input.
pub fn to_values(value: Value) -> Vec<Value> {
    match value {
        Value::Array(values) => values,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Append a stage's output to `out`, fanning out arrays.
pub(crate) fn extend_flat(out: &mut Vec<Value>, produced: Value) {
    out.extend(to_values(produced));
}

/// Truthiness of a value.
///
/// `null`, `false`, zero, the empty string, the empty array and the empty
/// object are falsey.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
