//! Text clean-up processors.
//!
//! All of them run per value and take strings.

use crate::charset::{CharSet, compiled};
use itemproc_macros::processor;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::{iter::Peekable, str::Chars};
use thiserror::Error;

lazy_static! {
    static ref ZERO_WIDTH: Regex = Regex::new("[\u{200b}\u{feff}]").unwrap();
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// Collapse whitespace and tighten it around punctuation.
///
/// Steps, in order:
/// 1. remove zero-width spaces,
/// 2. collapse whitespace runs into one space,
/// 3. drop whitespace before `lstrip_chars`, after `rstrip_chars` and on
///    both sides of `strip_chars`,
/// 4. trim.
///
/// Each character set can be adjusted with its `_add` and `_ignore`
/// companions instead of being replaced.
///
/// ```rust,ignore
/// NormalizeWhitespace::default().apply(["$ 100", "Sandwich - The - Hyphens"], ())?;
/// // ["$100", "Sandwich-The-Hyphens"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeWhitespace {
    /// Characters that take no whitespace on their left.
    pub lstrip_chars: CharSet,
    /// Added to `lstrip_chars`.
    pub lstrip_chars_add: CharSet,
    /// Removed from `lstrip_chars`.
    pub lstrip_chars_ignore: CharSet,
    /// Characters that take no whitespace on their right.
    pub rstrip_chars: CharSet,
    /// Added to `rstrip_chars`.
    pub rstrip_chars_add: CharSet,
    /// Removed from `rstrip_chars`.
    pub rstrip_chars_ignore: CharSet,
    /// Characters that take no whitespace on either side.
    pub strip_chars: CharSet,
    /// Added to `strip_chars`.
    pub strip_chars_add: CharSet,
    /// Removed from `strip_chars`.
    pub strip_chars_ignore: CharSet,
}

impl Default for NormalizeWhitespace {
    fn default() -> Self {
        Self {
            lstrip_chars: CharSet::from([
                '.', ',', '!', '?', ')', ']', '}', ':', ';', '%', '\u{2019}', '\u{201d}', '\u{92}', '\u{94}',
            ]),
            lstrip_chars_add: CharSet::new(),
            lstrip_chars_ignore: CharSet::new(),
            rstrip_chars: CharSet::from(['(', '$', '[', '{', '#', '\u{2018}', '\u{201c}', '\u{91}', '\u{93}']),
            rstrip_chars_add: CharSet::new(),
            rstrip_chars_ignore: CharSet::new(),
            strip_chars: CharSet::from(['-', '/', '_', '@', '\\', '^', '~']),
            strip_chars_add: CharSet::new(),
            strip_chars_ignore: CharSet::new(),
        }
    }
}

#[processor(crate = itemproc_core, register)]
impl NormalizeWhitespace {
    fn process_value(value: String, context: &Self) -> Result<String, regex::Error> {
        let value = ZERO_WIDTH.replace_all(&value, "");
        let mut value = WHITESPACE_RUN.replace_all(&value, " ").into_owned();

        let lstrip = context
            .lstrip_chars
            .adjusted(&context.lstrip_chars_add, &context.lstrip_chars_ignore);
        if let Some(class) = lstrip.character_class() {
            value = compiled(format!(r"\s*({class})"))?
                .replace_all(&value, "${1}")
                .into_owned();
        }

        let rstrip = context
            .rstrip_chars
            .adjusted(&context.rstrip_chars_add, &context.rstrip_chars_ignore);
        if let Some(class) = rstrip.character_class() {
            value = compiled(format!(r"({class})\s*"))?
                .replace_all(&value, "${1}")
                .into_owned();
        }

        let strip = context
            .strip_chars
            .adjusted(&context.strip_chars_add, &context.strip_chars_ignore);
        if let Some(class) = strip.character_class() {
            value = compiled(format!(r"\s*({class})\s*"))?
                .replace_all(&value, "${1}")
                .into_owned();
        }

        Ok(value.trim().to_string())
    }
}

/// Pad the given characters with a fixed number of spaces.
///
/// Existing whitespace around each character is replaced, so `"7-3"` and
/// `"7 -   3"` both become `"7 - 3"` with `chars = "-"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharWhitespacePadding {
    /// Characters to pad.
    pub chars: CharSet,
    /// Spaces on the left.
    pub lpad: usize,
    /// Spaces on the right.
    pub rpad: usize,
}

impl Default for CharWhitespacePadding {
    fn default() -> Self {
        Self {
            chars: CharSet::new(),
            lpad: 1,
            rpad: 1,
        }
    }
}

#[processor(crate = itemproc_core, register)]
impl CharWhitespacePadding {
    fn process_value(value: String, context: &Self) -> Result<String, regex::Error> {
        let Some(class) = context.chars.character_class() else {
            return Ok(value);
        };
        let pattern = compiled(format!(r"\s*{class}\s*"))?;
        let left = " ".repeat(context.lpad);
        let right = " ".repeat(context.rpad);
        Ok(pattern
            .replace_all(&value, |caps: &Captures<'_>| {
                format!("{left}{}{right}", caps[0].trim())
            })
            .into_owned())
    }
}

/// Strip leading and trailing quote and tick marks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripQuotes {
    /// Quotation marks.
    pub quotes: CharSet,
    /// Added to `quotes`.
    pub quotes_add: CharSet,
    /// Removed from `quotes`.
    pub quotes_ignore: CharSet,
    /// Tick marks.
    pub ticks: CharSet,
    /// Added to `ticks`.
    pub ticks_add: CharSet,
    /// Removed from `ticks`.
    pub ticks_ignore: CharSet,
    /// Removed from both sets.
    pub symbols_ignore: CharSet,
}

impl Default for StripQuotes {
    fn default() -> Self {
        Self {
            quotes: CharSet::from([
                '\u{2018}', '\u{2019}', '\u{201c}', '\u{201d}', '\'', '"', '\u{91}', '\u{92}', '\u{93}', '\u{94}',
            ]),
            quotes_add: CharSet::new(),
            quotes_ignore: CharSet::new(),
            ticks: CharSet::from(['`', '\u{2cb}']),
            ticks_add: CharSet::new(),
            ticks_ignore: CharSet::new(),
            symbols_ignore: CharSet::new(),
        }
    }
}

#[processor(crate = itemproc_core, register)]
impl StripQuotes {
    fn process_value(value: String, context: &Self) -> String {
        let quotes = context.quotes.adjusted(&context.quotes_add, &context.quotes_ignore);
        let ticks = context.ticks.adjusted(&context.ticks_add, &context.ticks_ignore);
        let marks = quotes.adjusted(&ticks, &context.symbols_ignore);
        value.trim_matches(|c| marks.contains(c)).to_string()
    }
}

/// Text content of an HTML fragment.
///
/// Tags are dropped; the text inside them is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoveHtmlTags;

#[processor(crate = itemproc_core, name = "RemoveHTMLTags", register)]
impl RemoveHtmlTags {
    fn process_value(value: String, _context: &Self) -> String {
        Html::parse_fragment(&value).root_element().text().collect()
    }
}

/// Lowercase a string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Lowercase;

#[processor(crate = itemproc_core, register)]
impl Lowercase {
    fn process_value(value: String, _context: &Self) -> String {
        value.to_lowercase()
    }
}

/// Uppercase a string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Uppercase;

#[processor(crate = itemproc_core, register)]
impl Uppercase {
    fn process_value(value: String, _context: &Self) -> String {
        value.to_uppercase()
    }
}

/// Trim whitespace, or the given characters, from both ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Strip {
    /// Characters to trim; whitespace when unset.
    pub chars: Option<CharSet>,
}

#[processor(crate = itemproc_core, register)]
impl Strip {
    fn process_value(value: String, context: &Self) -> String {
        match &context.chars {
            Some(chars) => value.trim_matches(|c| chars.contains(c)).to_string(),
            None => value.trim().to_string(),
        }
    }
}

/// A backslash escape that cannot be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnicodeEscapeError {
    /// `\x`, `\u` or `\U` is not followed by enough hex digits.
    #[error("truncated \\{escape} escape in {input:?}")]
    Truncated {
        /// The escape letter.
        escape: char,
        /// The string being decoded.
        input: String,
    },
    /// The escape decodes to a surrogate or out-of-range code point.
    #[error("\\{escape} escape names no character: {code:#x}")]
    InvalidCodePoint {
        /// The escape letter.
        escape: char,
        /// The decoded number.
        code: u32,
    },
    /// The string ends in a lone backslash.
    #[error("trailing backslash in {0:?}")]
    TrailingBackslash(String),
}

/// Turn backslash escapes such as `\n`, `\x41` or `\u00e9` into the
/// characters they name.
///
/// Unknown escapes like `\q` are kept as written. Characters outside escapes
/// pass through unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UnicodeEscape;

#[processor(crate = itemproc_core, register)]
impl UnicodeEscape {
    fn process_value(value: String, _context: &Self) -> Result<String, UnicodeEscapeError> {
        unescape(&value)
    }
}

fn unescape(input: &str) -> Result<String, UnicodeEscapeError> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escape) = chars.next() else {
            return Err(UnicodeEscapeError::TrailingBackslash(input.to_string()));
        };
        match escape {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\u{7}'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '\\' | '\'' | '"' => out.push(escape),
            // Line continuation.
            '\n' => {}
            'x' => out.push(hex_escape(&mut chars, escape, 2, input)?),
            'u' => out.push(hex_escape(&mut chars, escape, 4, input)?),
            'U' => out.push(hex_escape(&mut chars, escape, 8, input)?),
            '0'..='7' => {
                let mut code = escape as u32 - '0' as u32;
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(digit) => {
                            code = code * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(code).ok_or(UnicodeEscapeError::InvalidCodePoint { escape, code })?);
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Ok(out)
}

fn hex_escape(
    chars: &mut Peekable<Chars<'_>>,
    escape: char,
    digits: usize,
    input: &str,
) -> Result<char, UnicodeEscapeError> {
    let truncated = || UnicodeEscapeError::Truncated {
        escape,
        input: input.to_string(),
    };
    let mut code = 0u32;
    for _ in 0..digits {
        let digit = chars.next().and_then(|d| d.to_digit(16)).ok_or_else(truncated)?;
        code = code * 16 + digit;
    }
    char::from_u32(code).ok_or(UnicodeEscapeError::InvalidCodePoint { escape, code })
}
