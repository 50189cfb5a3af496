//! Date and time parsing with `chrono`.
//!
//! Formats use `strftime` syntax. Outputs are serialized through chrono's
//! serde support: dates as `YYYY-MM-DD`, times as `HH:MM:SS`, datetimes as
//! RFC 3339.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use itemproc_macros::processor;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Failure to read a date or time.
#[derive(Error, Debug)]
pub enum DateTimeError {
    /// The input does not match the format.
    #[error("failed to parse {input:?} with format {format:?}: {source}")]
    Parse {
        /// Offending input.
        input: String,
        /// Format it was read with.
        format: String,
        /// Underlying parser error.
        source: chrono::ParseError,
    },
    /// An offset setting is not of the form `+HH:MM`.
    #[error("invalid UTC offset {offset:?}: {source}")]
    Offset {
        /// Offending setting.
        offset: String,
        /// Underlying parser error.
        source: chrono::ParseError,
    },
    /// The local time does not exist at the input offset.
    #[error("{0} has no single instant at the input offset")]
    Ambiguous(NaiveDateTime),
}

fn parse_offset(offset: &str) -> Result<FixedOffset, DateTimeError> {
    offset.parse().map_err(|source| DateTimeError::Offset {
        offset: offset.to_string(),
        source,
    })
}

/// Parse a datetime and convert it between UTC offsets.
///
/// The input is read with `format` and interpreted at `input_offset`; the
/// result is expressed at `output_offset`. `return_date` and `return_time`
/// narrow the output; setting both yields `{"date": ..., "time": ...}`.
///
/// ```rust,ignore
/// DateTime::default().apply("2023-05-22, 12:30:45", [("input_offset", "+02:00")])?;
/// // ["2023-05-22T10:30:45+00:00"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateTime {
    /// `strftime` format of the input.
    pub format: String,
    /// Offset the input is expressed in.
    pub input_offset: String,
    /// Offset of the output.
    pub output_offset: String,
    /// Return only the date.
    pub return_date: bool,
    /// Return only the time.
    pub return_time: bool,
}

impl Default for DateTime {
    fn default() -> Self {
        Self {
            format: "%Y-%m-%d, %H:%M:%S".into(),
            input_offset: "+00:00".into(),
            output_offset: "+00:00".into(),
            return_date: false,
            return_time: false,
        }
    }
}

#[processor(crate = itemproc_core, register)]
impl DateTime {
    fn process_value(value: String, context: &Self) -> Result<Value, DateTimeError> {
        let naive = NaiveDateTime::parse_from_str(&value, &context.format).map_err(|source| {
            DateTimeError::Parse {
                input: value.clone(),
                format: context.format.clone(),
                source,
            }
        })?;
        let local = parse_offset(&context.input_offset)?
            .from_local_datetime(&naive)
            .single()
            .ok_or(DateTimeError::Ambiguous(naive))?;
        let converted = local.with_timezone(&parse_offset(&context.output_offset)?);

        let date = converted.date_naive().format("%Y-%m-%d").to_string();
        let time = converted.time().format("%H:%M:%S").to_string();
        Ok(match (context.return_date, context.return_time) {
            (true, true) => json!({ "date": date, "time": time }),
            (true, false) => Value::String(date),
            (false, true) => Value::String(time),
            (false, false) => Value::String(converted.to_rfc3339()),
        })
    }
}

/// Parse a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Date {
    /// `strftime` format of the input.
    pub format: String,
}

impl Default for Date {
    fn default() -> Self {
        Self {
            format: "%Y-%m-%d".into(),
        }
    }
}

#[processor(crate = itemproc_core, register)]
impl Date {
    fn process_value(value: String, context: &Self) -> Result<NaiveDate, DateTimeError> {
        NaiveDate::parse_from_str(&value, &context.format).map_err(|source| DateTimeError::Parse {
            input: value.clone(),
            format: context.format.clone(),
            source,
        })
    }
}

/// Parse a time of day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Time {
    /// `strftime` format of the input.
    pub format: String,
}

impl Default for Time {
    fn default() -> Self {
        Self {
            format: "%H:%M:%S".into(),
        }
    }
}

#[processor(crate = itemproc_core, register)]
impl Time {
    fn process_value(value: String, context: &Self) -> Result<NaiveTime, DateTimeError> {
        NaiveTime::parse_from_str(&value, &context.format).map_err(|source| DateTimeError::Parse {
            input: value.clone(),
            format: context.format.clone(),
            source,
        })
    }
}
