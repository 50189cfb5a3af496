//! # Context Store
//!
//! A processor's configurable parameters live in a [`Context`]: an ordered
//! mapping from key to [`Value`]. Every processor owns one (its *default
//! context*), built once from its typed configuration record. Callers may
//! pass another `Context` at call time (the *loader context*), which is
//! layered over the defaults for that one invocation only.
//!
//! # Call shapes
//!
//! All three ways of passing overrides convert into the same `Context`:
//!
//! ```rust,ignore
//! processor.apply(values, ())?;                                  // no override
//! processor.apply(values, loader_context)?;                      // a mapping
//! processor.apply(values, [("separator", json!("-"))])?;         // keyword pairs
//! processor.apply(values, context! { "separator" => "-" })?;     // same, via macro
//! ```
//!
//! # Layered lookup
//!
//! [`LayeredContext`] is the two-tier view used during a call: overrides are
//! consulted first, defaults fill the gaps, and a key missing from both is
//! an error rather than a silent `None`.

use crate::error::{ContextError, ContextMergeConflict, DefinitionError};
use indexmap::IndexMap;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::fmt;

/// An ordered mapping of context keys to values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Context {
    entries: IndexMap<String, Value>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from a typed configuration record.
    ///
    /// Keys appear in field-declaration order. A unit struct yields an empty
    /// context.
    pub fn from_config<T: Serialize + ?Sized>(
        processor: &str,
        config: &T,
    ) -> Result<Self, DefinitionError> {
        let value = serde_json::to_value(config).map_err(|source| DefinitionError::Serialize {
            processor: processor.to_string(),
            source,
        })?;
        match value {
            Value::Object(map) => Ok(map.into_iter().collect()),
            Value::Null => Ok(Self::new()),
            other => Err(DefinitionError::NotARecord {
                processor: processor.to_string(),
                found: kind_of(&other),
            }),
        }
    }

    /// Returns a copy with `key` set to `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Set `key`, keeping its original position if it already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Whether the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the context has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union of two contexts.
    ///
    /// Keys shared by both sides must carry equal values; otherwise the
    /// merge is refused so neither side silently shadows the other.
    pub fn merge(&self, other: &Context) -> Result<Context, ContextMergeConflict> {
        let mut merged = self.clone();
        for (key, right) in other.iter() {
            match self.get(key) {
                Some(left) if left != right => {
                    return Err(ContextMergeConflict {
                        key: key.to_string(),
                        left: left.clone(),
                        right: right.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    merged.insert(key, right.clone());
                }
            }
        }
        Ok(merged)
    }

    /// Deserialize the context into a typed configuration record.
    ///
    /// Unit structs accept any context, since they declare no keys.
    pub fn to_config<T: DeserializeOwned>(&self) -> Result<T, ContextError> {
        let object: serde_json::Map<String, Value> = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        T::deserialize(&Value::Object(object)).or_else(|source| {
            T::deserialize(&Value::Null).map_err(|_| ContextError::InvalidValue {
                target: crate::error::short_type_name::<T>().to_string(),
                source,
            })
        })
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={}", DisplayValue(value))?;
        }
        Ok(())
    }
}

/// Renders strings without JSON quotes and everything else as JSON.
pub(crate) struct DisplayValue<'a>(pub &'a Value);

impl fmt::Display for DisplayValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// Call shapes

impl From<()> for Context {
    fn from(_: ()) -> Self {
        Context::new()
    }
}

impl From<Option<Context>> for Context {
    fn from(context: Option<Context>) -> Self {
        context.unwrap_or_default()
    }
}

impl From<&Context> for Context {
    fn from(context: &Context) -> Self {
        context.clone()
    }
}

impl From<IndexMap<String, Value>> for Context {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Self { entries }
    }
}

impl From<serde_json::Map<String, Value>> for Context {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Context
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Context
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Context {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Build a [`Context`] from keyword-style pairs.
///
/// ```rust,ignore
/// let overrides = context! { "separator" => "-", "decimal_places" => 2 };
/// ```
#[macro_export]
macro_rules! context {
    () => {
        $crate::Context::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::Context::new()$(.with($key, $crate::__private::serde_json::json!($value)))+
    };
}

/// Call-time overrides layered over a processor's defaults.
#[derive(Debug, Clone, Copy)]
pub struct LayeredContext<'a> {
    overrides: &'a Context,
    defaults: &'a Context,
}

impl<'a> LayeredContext<'a> {
    /// Layer `overrides` over `defaults`.
    pub fn new(overrides: &'a Context, defaults: &'a Context) -> Self {
        Self {
            overrides,
            defaults,
        }
    }

    /// The call-time overrides.
    pub fn overrides(&self) -> &'a Context {
        self.overrides
    }

    /// The processor's defaults.
    pub fn defaults(&self) -> &'a Context {
        self.defaults
    }

    /// Look up a key, overrides first.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.overrides.get(key).or_else(|| self.defaults.get(key))
    }

    /// Look up a key that must be set on one of the two layers.
    pub fn resolve(&self, key: &str) -> Result<&'a Value, ContextError> {
        self.get(key)
            .ok_or_else(|| ContextError::MissingKey(key.to_string()))
    }

    /// Collapse both layers into one context.
    ///
    /// Default keys come first in declaration order, followed by keys that
    /// only the overrides set.
    pub fn flatten(&self) -> Context {
        let mut merged = Context::new();
        for (key, value) in self.defaults.iter() {
            merged.insert(key, self.overrides.get(key).unwrap_or(value).clone());
        }
        for (key, value) in self.overrides.iter() {
            if !merged.contains_key(key) {
                merged.insert(key, value.clone());
            }
        }
        merged
    }

    /// Deserialize the merged view into a typed configuration record.
    ///
    /// Keys the record does not declare are ignored.
    pub fn unpack<T: DeserializeOwned>(&self) -> Result<T, ContextError> {
        self.flatten().to_config()
    }

    /// Values of every default key, in declaration order, followed by the
    /// values of `additional` keys.
    pub fn unpack_declared(&self, additional: &[&str]) -> Result<Vec<Value>, ContextError> {
        self.defaults
            .keys()
            .chain(additional.iter().copied())
            .map(|key| self.resolve(key).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct JoinConfig {
        separator: String,
        limit: Option<u32>,
    }

    fn defaults() -> Context {
        Context::from([("a", 1), ("b", 2), ("c", 3)])
    }

    #[test]
    fn test_from_config_keeps_declaration_order() {
        let ctx = Context::from_config(
            "Join",
            &JoinConfig {
                separator: " ".into(),
                limit: None,
            },
        )
        .unwrap();
        assert_eq!(ctx.keys().collect::<Vec<_>>(), vec!["separator", "limit"]);
        assert_eq!(ctx.get("limit"), Some(&Value::Null));
    }

    #[test]
    fn test_from_config_unit_struct_is_empty() {
        #[derive(Serialize)]
        struct Flatten;
        assert!(Context::from_config("Flatten", &Flatten).unwrap().is_empty());
    }

    #[test]
    fn test_unit_struct_round_trips_through_empty_context() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct Flatten;
        let context = Context::from_config("Flatten", &Flatten).unwrap();
        assert_eq!(context.to_config::<Flatten>().unwrap(), Flatten);
        let forwarded = Context::from([("separator", "-")]);
        assert_eq!(forwarded.to_config::<Flatten>().unwrap(), Flatten);
    }

    #[test]
    fn test_from_config_rejects_non_record() {
        #[derive(Serialize)]
        struct Wrapper(u32);
        let err = Context::from_config("Wrapper", &Wrapper(3)).unwrap_err();
        assert!(matches!(err, DefinitionError::NotARecord { found: "a number", .. }));
    }

    #[test]
    fn test_call_shapes_are_equivalent() {
        let pairs = Context::from([("separator", "-")]);
        let mut map = serde_json::Map::new();
        map.insert("separator".into(), json!("-"));
        let mapping = Context::from(map);
        let via_macro = context! { "separator" => "-" };

        assert_eq!(pairs, mapping);
        assert_eq!(pairs, via_macro);
        assert_eq!(Context::from(()), Context::from(None::<Context>));
    }

    #[test]
    fn test_overrides_win_and_defaults_fill_gaps() {
        let defaults = defaults();
        let overrides = Context::from([("a", 10)]);
        let layered = LayeredContext::new(&overrides, &defaults);

        assert_eq!(layered.resolve("a").unwrap(), &json!(10));
        assert_eq!(layered.resolve("b").unwrap(), &json!(2));
        assert!(matches!(
            layered.resolve("z"),
            Err(ContextError::MissingKey(key)) if key == "z"
        ));
    }

    #[test]
    fn test_layering_never_mutates_defaults() {
        let defaults = defaults();
        let overrides = Context::from([("a", 10), ("d", 4)]);
        let flat = LayeredContext::new(&overrides, &defaults).flatten();

        assert_eq!(flat.keys().collect::<Vec<_>>(), vec!["a", "b", "c", "d"]);
        assert_eq!(flat.get("a"), Some(&json!(10)));
        assert_eq!(defaults, self::defaults());
    }

    #[test]
    fn test_unpack_declared_order() {
        let defaults = defaults();
        let none = Context::new();
        let layered = LayeredContext::new(&none, &defaults);
        assert_eq!(
            layered.unpack_declared(&[]).unwrap(),
            vec![json!(1), json!(2), json!(3)]
        );

        let overrides = Context::from([("a", 10), ("d", 40)]);
        let layered = LayeredContext::new(&overrides, &defaults);
        assert_eq!(
            layered.unpack_declared(&["d"]).unwrap(),
            vec![json!(10), json!(2), json!(3), json!(40)]
        );
    }

    #[test]
    fn test_unpack_typed_ignores_unrelated_keys() {
        let defaults = Context::from([("separator", json!(" ")), ("limit", Value::Null)]);
        let overrides = Context::from([("separator", json!("-")), ("unrelated", json!(true))]);
        let config: JoinConfig = LayeredContext::new(&overrides, &defaults).unpack().unwrap();
        assert_eq!(
            config,
            JoinConfig {
                separator: "-".into(),
                limit: None
            }
        );
    }

    #[test]
    fn test_unpack_typed_rejects_wrong_type() {
        let defaults = Context::from([("separator", json!(" ")), ("limit", Value::Null)]);
        let overrides = Context::from([("separator", json!(5))]);
        let err = LayeredContext::new(&overrides, &defaults)
            .unpack::<JoinConfig>()
            .unwrap_err();
        assert!(matches!(err, ContextError::InvalidValue { target, .. } if target == "JoinConfig"));
    }

    #[test]
    fn test_merge_equal_keys() {
        let left = Context::from([("foo", "bar"), ("x", "1")]);
        let right = Context::from([("foo", "bar"), ("y", "2")]);
        let merged = left.merge(&right).unwrap();
        assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["foo", "x", "y"]);
    }

    #[test]
    fn test_merge_conflict() {
        let left = Context::from([("foo", "bar")]);
        let right = Context::from([("foo", "baz")]);
        let err = left.merge(&right).unwrap_err();
        assert_eq!(err.key, "foo");
        assert_eq!(err.left, json!("bar"));
        assert_eq!(err.right, json!("baz"));
    }

    #[test]
    fn test_display_renders_key_value_pairs() {
        let ctx = Context::from([("separator", json!(", ")), ("limit", json!(3))]);
        assert_eq!(ctx.to_string(), "separator=, , limit=3");
    }
}
