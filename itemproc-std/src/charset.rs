//! Character sets used as processor settings, and the regexes built from
//! them.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};

/// Distinct patterns kept before the cache is emptied.
const PATTERN_CACHE_LIMIT: usize = 64;

lazy_static! {
    static ref PATTERNS: Mutex<HashMap<String, Regex>> = Mutex::new(HashMap::new());
}

/// Compile `pattern`, reusing an earlier compilation of the same text.
///
/// Patterns are built from processor settings, so a batch compiles each
/// one once instead of once per value.
pub(crate) fn compiled(pattern: String) -> Result<Regex, regex::Error> {
    let mut patterns = PATTERNS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(regex) = patterns.get(&pattern) {
        return Ok(regex.clone());
    }
    let regex = Regex::new(&pattern)?;
    if patterns.len() >= PATTERN_CACHE_LIMIT {
        patterns.clear();
    }
    patterns.insert(pattern, regex.clone());
    Ok(regex)
}

/// An ordered set of characters.
///
/// Deserializes from a string (one entry per character) or from a list of
/// strings, so `"-/"` and `["-", "/"]` configure the same set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CharSet(BTreeSet<char>);

impl CharSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// `self ∪ add ∖ ignore`, the usual `_add`/`_ignore` adjustment.
    pub fn adjusted(&self, add: &CharSet, ignore: &CharSet) -> CharSet {
        self.0
            .union(&add.0)
            .filter(|c| !ignore.0.contains(c))
            .copied()
            .collect()
    }

    /// Whether `c` is in the set.
    pub fn contains(&self, c: char) -> bool {
        self.0.contains(&c)
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Members escaped for use inside a regex character class.
    pub fn escaped(&self) -> String {
        self.0
            .iter()
            .map(|c| regex::escape(c.encode_utf8(&mut [0; 4])))
            .collect()
    }

    /// A regex character class matching any member, or `None` when empty.
    pub fn character_class(&self) -> Option<String> {
        if self.0.is_empty() {
            return None;
        }
        Some(format!("[{}]", self.escaped()))
    }
}

impl FromIterator<char> for CharSet {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[char; N]> for CharSet {
    fn from(chars: [char; N]) -> Self {
        chars.into_iter().collect()
    }
}

impl From<&str> for CharSet {
    fn from(chars: &str) -> Self {
        chars.chars().collect()
    }
}

impl<'de> Deserialize<'de> for CharSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            One(String),
            Many(Vec<String>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::One(s) => s.chars().collect(),
            Repr::Many(items) => items.iter().flat_map(|s| s.chars()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserializes_string_or_list() {
        let from_str: CharSet = serde_json::from_value(json!("-/")).unwrap();
        let from_list: CharSet = serde_json::from_value(json!(["/", "-"])).unwrap();
        assert_eq!(from_str, from_list);
        assert!(from_str.contains('-'));
    }

    #[test]
    fn test_adjusted() {
        let base = CharSet::from(['.', ',']);
        let adjusted = base.adjusted(&CharSet::from(['!']), &CharSet::from([',']));
        assert_eq!(adjusted, CharSet::from(['.', '!']));
    }

    #[test]
    fn test_compiled_patterns_are_reused() {
        let pattern = r"\s*([\-])\s*".to_string();
        let first = compiled(pattern.clone()).unwrap();
        assert!(PATTERNS.lock().unwrap().contains_key(&pattern));

        let second = compiled(pattern).unwrap();
        assert_eq!(first.as_str(), second.as_str());
        assert_eq!(second.replace_all("a - b", "${1}"), "a-b");

        assert!(compiled("[".to_string()).is_err());
    }

    #[test]
    fn test_character_class_escapes() {
        assert_eq!(CharSet::from(['-', '^']).character_class().unwrap(), r"[\-\^]");
        assert!(CharSet::new().character_class().is_none());
    }
}
