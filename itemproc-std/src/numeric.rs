//! Number extraction and formatting.
//!
//! Scraped numbers come in many shapes (`1 000 000,00`, `1,000,000.00`,
//! `1.000.000,00`). [`parse_number`] reads the first one in a string,
//! guessing which separator is the decimal mark unless told.

use crate::charset::{CharSet, compiled};
use itemproc_macros::processor;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

lazy_static! {
    static ref NUMBER_TOKEN: Regex = Regex::new(r"[-+]?\d[\d\s.,'\u{a0}]*").unwrap();
}

/// The input contains no digits.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no number found in {0:?}")]
pub struct NoNumberFound(pub String);

/// Read the first number in `text`.
///
/// With `decimal_separator` unset the separator is guessed: when both `.`
/// and `,` appear the last one is the decimal mark; a single kind that
/// repeats, or appears once followed by exactly three digits after a
/// non-zero integer part, groups thousands.
pub fn parse_number(text: &str, decimal_separator: Option<char>) -> Option<f64> {
    let token = NUMBER_TOKEN.find(text)?.as_str();
    let token = token.trim_end_matches(|c: char| !c.is_ascii_digit());
    let negative = token.starts_with('-');

    let decimal = decimal_separator.or_else(|| guess_decimal_separator(token));
    let mut normalized = String::with_capacity(token.len() + 1);
    if negative {
        normalized.push('-');
    }
    for c in token.chars() {
        if c.is_ascii_digit() {
            normalized.push(c);
        } else if Some(c) == decimal {
            normalized.push('.');
        }
    }
    normalized.parse().ok()
}

fn guess_decimal_separator(token: &str) -> Option<char> {
    let last = token.rfind(['.', ','])?;
    let separator = token[last..].chars().next()?;
    let other = if separator == '.' { ',' } else { '.' };
    if token.contains(other) {
        return Some(separator);
    }
    if token.matches(separator).count() > 1 {
        return None;
    }
    let fraction = &token[last + 1..];
    let integer = token[..last].trim_start_matches(['-', '+']);
    let groups_thousands = fraction.len() == 3
        && fraction.chars().all(|c| c.is_ascii_digit())
        && !integer.trim_start_matches('0').is_empty();
    (!groups_thousands).then_some(separator)
}

fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Runs of digits, allowing the given separators between digits.
///
/// ```rust,ignore
/// ExtractDigits::default().apply("Call 555.123.4567 or 2", ())?;
/// // [["555.123.4567", "2"]]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractDigits {
    /// Characters allowed between digits.
    pub separators: CharSet,
}

impl Default for ExtractDigits {
    fn default() -> Self {
        Self {
            separators: CharSet::from([',', '.']),
        }
    }
}

#[processor(crate = itemproc_core, register)]
impl ExtractDigits {
    fn process_value(value: String, context: &Self) -> Result<Vec<String>, regex::Error> {
        let pattern = compiled(format!(r"\d(?:[\d{}]*\d)?", context.separators.escaped()))?;
        Ok(pattern
            .find_iter(&value)
            .map(|m| m.as_str().to_string())
            .collect())
    }
}

/// Parse the first number of a string as a float.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToFloat {
    /// Round to this many decimal places.
    pub decimal_places: Option<u32>,
    /// Decimal mark of the input; guessed when unset.
    pub decimal_separator: Option<char>,
}

#[processor(crate = itemproc_core, register)]
impl ToFloat {
    fn process_value(value: String, context: &Self) -> Result<f64, NoNumberFound> {
        let number = parse_number(&value, context.decimal_separator).ok_or(NoNumberFound(value))?;
        Ok(match context.decimal_places {
            Some(places) => round_to(number, places),
            None => number,
        })
    }
}

/// Re-format a numeric string with chosen separators.
///
/// ```rust,ignore
/// NormalizeNumericString::with_context([
///     ("thousands_separator", json!(",")),
///     ("decimal_places", json!(2)),
///     ("keep_trailing_zeros", json!(true)),
/// ])?
/// .apply("1 000 000,00", ())?;
/// // ["1,000,000.00"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeNumericString {
    /// Inserted between groups of three integer digits.
    pub thousands_separator: String,
    /// Decimal mark of the output.
    pub decimal_separator: String,
    /// Fixed number of decimal places.
    pub decimal_places: Option<usize>,
    /// Keep zeros at the end of the fraction.
    pub keep_trailing_zeros: bool,
    /// Decimal mark of the input; guessed when unset.
    pub input_decimal_separator: Option<char>,
}

impl Default for NormalizeNumericString {
    fn default() -> Self {
        Self {
            thousands_separator: String::new(),
            decimal_separator: ".".into(),
            decimal_places: None,
            keep_trailing_zeros: false,
            input_decimal_separator: None,
        }
    }
}

#[processor(crate = itemproc_core, register)]
impl NormalizeNumericString {
    fn process_value(value: String, context: &Self) -> Result<String, NoNumberFound> {
        let number = parse_number(&value, context.input_decimal_separator).ok_or(NoNumberFound(value))?;
        let digits = match context.decimal_places {
            Some(places) => format!("{:.*}", places, number.abs()),
            None => number.abs().to_string(),
        };
        let (integer, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), ""));
        let fraction = if context.keep_trailing_zeros {
            fraction
        } else {
            fraction.trim_end_matches('0')
        };

        let mut out = String::new();
        if number.is_sign_negative() && number != 0.0 {
            out.push('-');
        }
        out.push_str(&group_thousands(integer, &context.thousands_separator));
        if !fraction.is_empty() {
            out.push_str(&context.decimal_separator);
            out.push_str(fraction);
        }
        Ok(out)
    }
}

fn group_thousands(integer: &str, separator: &str) -> String {
    let len = integer.len();
    let mut out = String::with_capacity(len + len / 3 * separator.len());
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use itemproc_core::{Configurable, ProcessError, ProcessorExt};
    use serde_json::json;

    #[test]
    fn test_parse_number_guesses_separator() {
        assert_eq!(parse_number("1 000 000,00", None), Some(1_000_000.0));
        assert_eq!(parse_number("$1,000,000.50", None), Some(1_000_000.5));
        assert_eq!(parse_number("1.000.000,25 €", None), Some(1_000_000.25));
        assert_eq!(parse_number("1,000", None), Some(1000.0));
        assert_eq!(parse_number("0.125", None), Some(0.125));
        assert_eq!(parse_number("19.99", None), Some(19.99));
        assert_eq!(parse_number("-3,5 °C", None), Some(-3.5));
        assert_eq!(parse_number("no digits", None), None);
    }

    #[test]
    fn test_parse_number_with_known_separator() {
        assert_eq!(parse_number("1.000", Some(',')), Some(1000.0));
        assert_eq!(parse_number("1,000", Some(',')), Some(1.0));
    }

    #[test]
    fn test_extract_digits() {
        assert_eq!(
            ExtractDigits::default()
                .apply("Call 555.123.4567 or 2", ())
                .unwrap(),
            json!([["555.123.4567", "2"]])
        );
        assert_eq!(
            ExtractDigits::default()
                .apply("1,5", [("separators", json!([]))])
                .unwrap(),
            json!([["1", "5"]])
        );
    }

    #[test]
    fn test_to_float() {
        let to_float = ToFloat::default();
        assert_eq!(to_float.apply(json!(["$19.99", "1 234,5"]), ()).unwrap(), json!([19.99, 1234.5]));
        assert_eq!(
            to_float.apply("3.14159", [("decimal_places", 2)]).unwrap(),
            json!([3.14])
        );
    }

    #[test]
    fn test_to_float_without_number_fails() {
        let err = ToFloat::default().apply("n/a", ()).unwrap_err();
        assert!(matches!(err, ProcessError::Transform { .. }));
        assert_eq!(err.kind(), "NoNumberFound");
    }

    #[test]
    fn test_normalize_numeric_string() {
        let normalize = NormalizeNumericString::with_context([
            ("thousands_separator", json!(",")),
            ("decimal_places", json!(2)),
            ("keep_trailing_zeros", json!(true)),
        ])
        .unwrap();
        assert_eq!(normalize.apply("1 000 000,00", ()).unwrap(), json!(["1,000,000.00"]));
        assert_eq!(
            normalize
                .apply("1 000 000,00", [("keep_trailing_zeros", false)])
                .unwrap(),
            json!(["1,000,000"])
        );
        assert_eq!(
            NormalizeNumericString::default()
                .apply("1.234,50", [("decimal_separator", ",")])
                .unwrap(),
            json!(["1234,5"])
        );
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("1234567", " "), "1 234 567");
        assert_eq!(group_thousands("123", ","), "123");
        assert_eq!(group_thousands("1000", ""), "1000");
    }
}
