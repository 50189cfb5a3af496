//! Testing utilities for itemproc.
//!
//! Processors that make collection behaviour observable.
//!
//! # Features
//!
//! - [`RecordingProcessor`]: passes values through and records every call
//! - [`FailingProcessor`]: fails with a configured error kind and message

use itemproc_core::{
    Context, DefinitionError, LayeredContext, ProcessError, Processor, TransformError, to_values,
};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// ============================================================================
// Recording Processor
// ============================================================================

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Defaults with the call-time overrides layered on top.
    pub context: Context,
    /// The values as received.
    pub values: Value,
}

/// A processor that returns its input and records every call.
///
/// Clones share the same recording, so a clone can be handed to a collection
/// and inspected afterwards.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingProcessor::new().with_default("separator", " ");
/// let pipeline = MapCompose::with_context(stages![recorder.clone()], [("separator", "-")])?;
///
/// pipeline.apply(json!(["a", "b"]), ())?;
/// assert_eq!(recorder.calls()[0].context.get("separator"), Some(&json!("-")));
/// ```
#[derive(Clone)]
pub struct RecordingProcessor {
    name: String,
    defaults: Context,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl RecordingProcessor {
    /// A recorder named `Recording` with an empty default context.
    pub fn new() -> Self {
        Self {
            name: "Recording".into(),
            defaults: Context::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Rename the recorder.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Declare a default context key.
    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(key, value);
        self
    }

    /// Get a clone of the recorded calls.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().clone()
    }

    /// Get the number of recorded calls.
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Clear all recorded calls.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecordedCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RecordingProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for RecordingProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_context(&self) -> Result<Context, DefinitionError> {
        Ok(self.defaults.clone())
    }

    fn process(&self, values: Value, overrides: &Context) -> Result<Value, ProcessError> {
        let context = LayeredContext::new(overrides, &self.defaults).flatten();
        self.lock().push(RecordedCall {
            context,
            values: values.clone(),
        });
        Ok(Value::Array(to_values(values)))
    }
}

// ============================================================================
// Failing Processor
// ============================================================================

/// A processor that fails with a fixed error.
///
/// With [`fail_on`](Self::fail_on) set, only that value fails and every
/// other value passes through.
#[derive(Debug, Clone, PartialEq)]
pub struct FailingProcessor {
    kind: String,
    message: String,
    fail_on: Option<Value>,
}

impl FailingProcessor {
    /// Fail every call with `kind: message`.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            fail_on: None,
        }
    }

    /// Fail only when `value` is among the inputs.
    pub fn fail_on(mut self, value: impl Into<Value>) -> Self {
        self.fail_on = Some(value.into());
        self
    }
}

impl Processor for FailingProcessor {
    fn name(&self) -> &str {
        "Failing"
    }

    fn default_context(&self) -> Result<Context, DefinitionError> {
        Ok(Context::new()
            .with("kind", self.kind.as_str())
            .with("message", self.message.as_str()))
    }

    fn process(&self, values: Value, _overrides: &Context) -> Result<Value, ProcessError> {
        let values = to_values(values);
        let fails = match &self.fail_on {
            Some(target) => values.contains(target),
            None => true,
        };
        if fails {
            return Err(ProcessError::Transform {
                processor: self.name().to_string(),
                error: TransformError::new(self.kind.as_str(), self.message.as_str()),
            });
        }
        Ok(Value::Array(values))
    }
}
