//! # Processor
//!
//! The unit of data cleaning. A processor owns a default [`Context`], takes
//! one value or a batch of values plus call-time overrides, and returns the
//! processed result.
//!
//! Most processors are configuration structs whose `impl` block carries the
//! `#[processor]` attribute, which generates this trait from a
//! `process_value` or `call` transform. Implementing the trait by hand is
//! the low-level escape hatch; a type that never overrides
//! [`Processor::process`] fails with [`ProcessError::NotImplemented`].

use crate::{
    context::{Context, LayeredContext},
    error::{ContextError, DefinitionError, Error, ProcessError},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{any::Any, fmt};

/// Upcast to [`Any`] for type-aware equality.
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A context-aware value processor.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Processor`",
    label = "missing `Processor` implementation",
    note = "Add `#[processor]` to an `impl` block defining `process_value` or `call`."
)]
pub trait Processor: AsAny + Send + Sync + 'static {
    /// Name used when rendering the processor.
    fn name(&self) -> &str;

    /// The processor's configured defaults.
    fn default_context(&self) -> Result<Context, DefinitionError>;

    /// Process `values` with `overrides` layered over the defaults.
    fn process(&self, values: Value, overrides: &Context) -> Result<Value, ProcessError> {
        let _ = (values, overrides);
        Err(ProcessError::NotImplemented {
            processor: self.name().to_string(),
        })
    }

    /// Same concrete type and equal default contexts.
    fn dyn_eq(&self, other: &dyn Processor) -> bool {
        if self.as_any().type_id() != other.as_any().type_id() {
            return false;
        }
        match (self.default_context(), other.default_context()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    /// `Name(key=value, ...)`, for debugging and error messages.
    fn describe(&self) -> String {
        match self.default_context() {
            Ok(context) => format!("{}({context})", self.name()),
            Err(_) => format!("{}(..)", self.name()),
        }
    }
}

impl PartialEq for dyn Processor {
    fn eq(&self, other: &Self) -> bool {
        self.dyn_eq(other)
    }
}

impl fmt::Debug for dyn Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Calling conveniences available on every processor.
pub trait ProcessorExt: Processor {
    /// Process a value or batch of values.
    ///
    /// `overrides` accepts every call-context shape: `()`, a [`Context`] or
    /// mapping, or keyword-style pairs.
    fn apply(
        &self,
        values: impl Into<Value>,
        overrides: impl Into<Context>,
    ) -> Result<Value, ProcessError> {
        self.process(values.into(), &overrides.into())
    }
}

impl<P: Processor + ?Sized> ProcessorExt for P {}

/// Construction with overrides layered over the type's defaults.
pub trait Configurable: Processor + Default + Serialize + DeserializeOwned {
    /// Build an instance from `Default` with `overrides` applied.
    ///
    /// Keys the type does not declare are rejected.
    fn with_context(overrides: impl Into<Context>) -> Result<Self, Error> {
        let base = Self::default();
        let defaults = base.default_context()?;
        let overrides = overrides.into();
        if let Some(key) = overrides.keys().find(|key| !defaults.contains_key(key)) {
            return Err(ContextError::UnknownKey {
                processor: base.name().to_string(),
                key: key.to_string(),
            }
            .into());
        }
        Ok(LayeredContext::new(&overrides, &defaults).unpack()?)
    }
}

impl<T> Configurable for T where T: Processor + Default + Serialize + DeserializeOwned {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Scramble {
        reverse: bool,
        suffix: String,
    }

    impl Default for Scramble {
        fn default() -> Self {
            Self {
                reverse: false,
                suffix: String::new(),
            }
        }
    }

    impl Processor for Scramble {
        fn name(&self) -> &str {
            "Scramble"
        }

        fn default_context(&self) -> Result<Context, DefinitionError> {
            Context::from_config(self.name(), self)
        }

        fn process(&self, values: Value, overrides: &Context) -> Result<Value, ProcessError> {
            crate::invoke::each(self, values, overrides, |value: String, context: &Self| {
                let mut out: String = if context.reverse {
                    value.chars().rev().collect()
                } else {
                    value
                };
                out.push_str(&context.suffix);
                Ok(out)
            })
        }
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Unfinished {
        level: u8,
    }

    impl Processor for Unfinished {
        fn name(&self) -> &str {
            "Unfinished"
        }

        fn default_context(&self) -> Result<Context, DefinitionError> {
            Context::from_config(self.name(), self)
        }
    }

    #[test]
    fn test_unimplemented_process_names_type() {
        let err = Unfinished::default().apply("x", ()).unwrap_err();
        assert!(matches!(&err, ProcessError::NotImplemented { processor } if processor == "Unfinished"));
        assert!(err.to_string().starts_with("Unfinished has not implemented"));
    }

    #[test]
    fn test_call_overrides_take_priority() {
        let scramble = Scramble::default();
        assert_eq!(
            scramble.apply(vec!["hello", "world"], ()).unwrap(),
            json!(["hello", "world"])
        );
        assert_eq!(
            scramble
                .apply(vec!["hello", "world"], [("reverse", true)])
                .unwrap(),
            json!(["olleh", "dlrow"])
        );
        // Defaults are untouched by the previous call.
        assert_eq!(scramble.apply("abc", ()).unwrap(), json!(["abc"]));
    }

    #[test]
    fn test_scalar_promotion() {
        let scramble = Scramble::default();
        assert_eq!(
            scramble.apply("abc", ()).unwrap(),
            scramble.apply(vec!["abc"], ()).unwrap()
        );
    }

    #[test]
    fn test_with_context_layers_constructor_overrides() {
        let scramble = Scramble::with_context([("suffix", "!")]).unwrap();
        assert_eq!(
            scramble.default_context().unwrap(),
            Context::from([("reverse", json!(false)), ("suffix", json!("!"))])
        );
        assert_eq!(scramble.apply("hi", ()).unwrap(), json!(["hi!"]));
    }

    #[test]
    fn test_with_context_rejects_unknown_keys() {
        let err = Scramble::with_context([("shuffle", true)]).unwrap_err();
        assert!(matches!(
            err,
            Error::Context(ContextError::UnknownKey { key, .. }) if key == "shuffle"
        ));
    }

    #[test]
    fn test_equality_is_type_and_context() {
        let a: Box<dyn Processor> = Box::new(Scramble::default());
        let b: Box<dyn Processor> = Box::new(Scramble::default());
        let c: Box<dyn Processor> = Box::new(Scramble {
            reverse: true,
            ..Scramble::default()
        });
        let d: Box<dyn Processor> = Box::new(Unfinished::default());

        assert!(*a == *b);
        assert!(*a != *c);
        assert!(*a != *d);
    }

    #[test]
    fn test_describe() {
        let scramble = Scramble {
            reverse: true,
            suffix: "?".into(),
        };
        assert_eq!(scramble.describe(), "Scramble(reverse=true, suffix=?)");
    }
}
