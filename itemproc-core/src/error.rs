//! Error types for itemproc.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`Error`] - Top-level error type for all itemproc operations
//! - [`DefinitionError`] - A processor type cannot be used at all
//! - [`ContextError`] - A context lookup or typed unpack failed
//! - [`ContextMergeConflict`] - Two contexts disagree on a shared key
//! - [`ProcessError`] - A processor failed while processing values
//! - [`ElementError`] - A collection stage failed on one value
//! - [`CollectionError`] - A positional collection operation was invalid
//!
//! [`TransformError`] is the carrier returned by user transforms. Like
//! `anyhow::Error` it converts from any [`std::error::Error`], so `?` works
//! inside `process_value`, and it remembers the original error's type name.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all itemproc operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A processor type is unusable.
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// A context lookup failed.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Two contexts could not be merged.
    #[error(transparent)]
    Merge(#[from] ContextMergeConflict),

    /// Processing values failed.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// A collection operation was invalid.
    #[error(transparent)]
    Collection(#[from] CollectionError),
}

/// The processor type cannot be used.
#[derive(Error, Debug)]
pub enum DefinitionError {
    /// The configuration did not serialize to a record of named fields.
    #[error("{processor}: configuration must be a struct with named fields, got {found}")]
    NotARecord {
        /// Name of the processor.
        processor: String,
        /// JSON kind the configuration serialized to.
        found: &'static str,
    },

    /// The configuration could not be serialized.
    #[error("{processor}: configuration could not be serialized")]
    Serialize {
        /// Name of the processor.
        processor: String,
        /// The serializer's error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from context lookups.
#[derive(Error, Debug)]
pub enum ContextError {
    /// The key is neither overridden nor defaulted.
    #[error("context key `{0}` is not set")]
    MissingKey(String),

    /// A constructor override names a key the type does not declare.
    #[error("{processor}() got an unexpected context key `{key}`")]
    UnknownKey {
        /// Name of the processor.
        processor: String,
        /// The offending key.
        key: String,
    },

    /// The merged context does not fit the typed configuration.
    #[error("invalid context for {target}: {source}")]
    InvalidValue {
        /// Name of the configuration type.
        target: String,
        /// The deserializer's error.
        #[source]
        source: serde_json::Error,
    },
}

/// Two contexts share a key with different values.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot merge contexts: key `{key}` is {left} on one side and {right} on the other")]
pub struct ContextMergeConflict {
    /// The conflicting key.
    pub key: String,
    /// Value on the receiving side.
    pub left: Value,
    /// Value on the incoming side.
    pub right: Value,
}

/// Errors raised while a processor handles values.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The processor never provided a transform.
    #[error(
        "{processor} has not implemented `process`; implement it or use #[processor] with `process_value` or `call`"
    )]
    NotImplemented {
        /// Name of the processor.
        processor: String,
    },

    /// The processor's default context could not be built.
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// The merged context was unusable.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// An input value did not have the type the transform expects.
    #[error("{processor}: unexpected input {value}: {source}")]
    InvalidInput {
        /// Name of the processor.
        processor: String,
        /// The rejected value.
        value: Value,
        /// The deserializer's error.
        #[source]
        source: serde_json::Error,
    },

    /// A transform result could not be converted back into a value.
    #[error("{processor}: result could not be serialized: {source}")]
    InvalidOutput {
        /// Name of the processor.
        processor: String,
        /// The serializer's error.
        #[source]
        source: serde_json::Error,
    },

    /// The transform itself failed.
    #[error("{processor}: {error}")]
    Transform {
        /// Name of the processor.
        processor: String,
        /// The transform's error.
        error: TransformError,
    },

    /// A collection stage failed on one value.
    #[error(transparent)]
    Element(#[from] ElementError),
}

impl ProcessError {
    /// A short name for the failure, used when the error is wrapped.
    pub fn kind(&self) -> &str {
        match self {
            ProcessError::NotImplemented { .. } => "NotImplemented",
            ProcessError::Definition(_) => "DefinitionError",
            ProcessError::Context(_) => "ContextError",
            ProcessError::InvalidInput { .. } => "InvalidInput",
            ProcessError::InvalidOutput { .. } => "InvalidOutput",
            ProcessError::Transform { error, .. } => error.kind(),
            ProcessError::Element(_) => "ElementError",
        }
    }

    /// The message without the kind, used when the error is wrapped.
    pub fn detail(&self) -> String {
        match self {
            ProcessError::Transform { error, .. } => error.message().to_string(),
            other => other.to_string(),
        }
    }
}

/// A collection stage failed while processing one value.
#[derive(Error, Debug)]
#[error("Error in {collection} with {stage} value={value} error='{kind}: {message}'")]
pub struct ElementError {
    /// Name of the collection.
    pub collection: String,
    /// Rendered stage that failed.
    pub stage: String,
    /// The value being processed.
    pub value: Value,
    /// Type name of the original error.
    pub kind: String,
    /// Message of the original error.
    pub message: String,
    /// The original error.
    #[source]
    pub source: BoxError,
}

/// Errors from positional collection operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    /// The index is past the end of the stage list.
    #[error("stage index {index} out of range for collection of length {len}")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of stages.
        len: usize,
    },

    /// The stage to remove is not in the collection.
    #[error("stage `{0}` is not in the collection")]
    StageNotFound(String),
}

/// The error a transform returns.
///
/// Any [`std::error::Error`] converts into it, recording the error's type
/// name as its [`kind`](Self::kind).
pub struct TransformError {
    kind: String,
    message: String,
    source: Option<BoxError>,
}

impl TransformError {
    /// A failure with an explicit kind and message.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an already boxed error under the given kind.
    pub fn from_boxed(kind: impl Into<String>, source: BoxError) -> Self {
        Self {
            kind: kind.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Type name (or explicit kind) of the failure.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Message of the failure.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The wrapped error, if the failure came from one.
    pub fn source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Converts into a boxed error, keeping the original when there is one.
    pub fn into_boxed(self) -> BoxError {
        match self.source {
            Some(source) => source,
            None => Box::new(Message {
                kind: self.kind,
                message: self.message,
            }),
        }
    }
}

impl<E> From<E> for TransformError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self {
            kind: short_type_name::<E>().to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl fmt::Debug for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

/// Boxed form of a kind/message failure.
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
struct Message {
    kind: String,
    message: String,
}

/// Last path segment of a type name, ignoring generic arguments.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Error, Debug)]
    #[error("bad digit")]
    struct ParseFailure;

    #[test]
    fn test_transform_error_records_type_name() {
        let err: TransformError = ParseFailure.into();
        assert_eq!(err.kind(), "ParseFailure");
        assert_eq!(err.message(), "bad digit");
        assert_eq!(err.to_string(), "ParseFailure: bad digit");
    }

    #[test]
    fn test_transform_error_from_std_error() {
        let err: TransformError = "x".parse::<i32>().unwrap_err().into();
        assert_eq!(err.kind(), "ParseIntError");
    }

    #[test]
    fn test_transform_error_into_boxed_keeps_message() {
        let boxed = TransformError::new("ValueError", "no digits").into_boxed();
        assert_eq!(boxed.to_string(), "ValueError: no digits");
    }

    #[test]
    fn test_element_error_message() {
        let err = ElementError {
            collection: "MapCompose".into(),
            stage: "Strip()".into(),
            value: Value::from(3),
            kind: "TypeError".into(),
            message: "expected a string".into(),
            source: TransformError::new("TypeError", "expected a string").into_boxed(),
        };
        assert_eq!(
            err.to_string(),
            "Error in MapCompose with Strip() value=3 error='TypeError: expected a string'"
        );
    }

    #[test]
    fn test_merge_conflict_names_key_and_values() {
        let err = ContextMergeConflict {
            key: "foo".into(),
            left: Value::from("bar"),
            right: Value::from("baz"),
        };
        let message = err.to_string();
        assert!(message.contains("`foo`"));
        assert!(message.contains("\"bar\""));
        assert!(message.contains("\"baz\""));
    }
}
