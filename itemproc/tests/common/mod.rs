#![allow(dead_code)]

use itemproc::{Value, processor};
use serde::{Deserialize, Serialize};

// ============================================================================
// Test Processors
// ============================================================================

/// Joins a batch into one string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Glue {
    pub separator: String,
    pub prefix: String,
}

impl Default for Glue {
    fn default() -> Self {
        Self {
            separator: " ".into(),
            prefix: String::new(),
        }
    }
}

#[processor(register)]
impl Glue {
    fn call(values: Vec<String>, context: &Self) -> String {
        format!("{}{}", context.prefix, values.join(&context.separator))
    }
}

/// Parses integers in a configurable radix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseInt {
    pub radix: u32,
}

impl Default for ParseInt {
    fn default() -> Self {
        Self { radix: 10 }
    }
}

#[processor(register)]
impl ParseInt {
    fn process_value(value: String, context: &Self) -> Result<i64, std::num::ParseIntError> {
        i64::from_str_radix(value.trim(), context.radix)
    }
}

// ============================================================================
// Plain Functions
// ============================================================================

pub fn words(value: Value) -> Value {
    match value {
        Value::String(s) => s.split_whitespace().map(Value::from).collect(),
        other => other,
    }
}

pub fn exclaim(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(format!("{s}!")),
        other => other,
    }
}
