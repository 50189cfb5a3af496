//! # Stages
//!
//! A collection runs a list of [`Stage`]s. A stage is either a processor,
//! which receives the collection's merged context as call-time overrides,
//! or a plain [`Function`] of one value, which receives no context.

use crate::{
    context::Context,
    error::{BoxError, ElementError, TransformError},
    processor::Processor,
};
use serde_json::Value;
use std::{
    any::{TypeId, type_name},
    borrow::Cow,
    fmt,
    sync::Arc,
};

type StageFn = dyn Fn(Value) -> Result<Value, TransformError> + Send + Sync;

#[derive(Clone, Copy)]
enum Identity {
    /// Zero-sized callables (fn items, non-capturing closures) are
    /// identified by their type.
    Type(TypeId),
    /// Everything else is identified by allocation.
    Instance,
}

/// A plain function used as a stage.
#[derive(Clone)]
pub struct Function {
    name: Cow<'static, str>,
    identity: Identity,
    func: Arc<StageFn>,
}

impl Function {
    /// Wrap a fallible function.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(Value) -> Result<Value, TransformError> + Send + Sync + 'static,
    {
        let name = callable_name::<F>();
        let identity = identity_of::<F>();
        Self {
            name: Cow::Borrowed(name),
            identity,
            func: Arc::new(func),
        }
    }

    /// Wrap an infallible function.
    pub fn infallible<F>(func: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        let name = callable_name::<F>();
        let identity = identity_of::<F>();
        Self {
            name: Cow::Borrowed(name),
            identity,
            func: Arc::new(move |value| Ok(func(value))),
        }
    }

    /// Replace the rendered name.
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// The rendered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the function on one value.
    pub fn call(&self, value: Value) -> Result<Value, TransformError> {
        (self.func)(value)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        match (self.identity, other.identity) {
            (Identity::Type(a), Identity::Type(b)) => a == b,
            _ => Arc::ptr_eq(&self.func, &other.func),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Function").field(&self.name).finish()
    }
}

fn identity_of<F: 'static>() -> Identity {
    if size_of::<F>() == 0 {
        Identity::Type(TypeId::of::<F>())
    } else {
        Identity::Instance
    }
}

/// `path::to::function` renders as `function`; a closure renders as the
/// function it was defined in.
fn callable_name<F>() -> &'static str {
    let mut name = type_name::<F>();
    while let Some(outer) = name.strip_suffix("::{{closure}}") {
        name = outer;
    }
    name.rsplit("::").next().unwrap_or(name)
}

/// One step of a collection.
#[derive(Clone)]
pub enum Stage {
    /// A processor, called with the collection's context as overrides.
    Processor(Arc<dyn Processor>),
    /// A plain function of one value.
    Function(Function),
}

impl Stage {
    /// Human-readable rendering used in collection output and errors.
    pub fn describe(&self) -> String {
        match self {
            Stage::Processor(processor) => processor.describe(),
            Stage::Function(function) => function.name().to_string(),
        }
    }

    /// The processor behind this stage, if any.
    pub fn as_processor(&self) -> Option<&dyn Processor> {
        match self {
            Stage::Processor(processor) => Some(processor.as_ref()),
            Stage::Function(_) => None,
        }
    }

    pub(crate) fn run(&self, value: Value, context: &Context) -> Result<Value, StageFailure> {
        match self {
            Stage::Processor(processor) => {
                processor.process(value, context).map_err(|err| StageFailure {
                    kind: err.kind().to_string(),
                    message: err.detail(),
                    source: Box::new(err),
                })
            }
            Stage::Function(function) => function.call(value).map_err(|err| StageFailure {
                kind: err.kind().to_string(),
                message: err.message().to_string(),
                source: err.into_boxed(),
            }),
        }
    }
}

/// A stage's failure before the collection attaches its own details.
pub(crate) struct StageFailure {
    kind: String,
    message: String,
    source: BoxError,
}

impl StageFailure {
    pub(crate) fn into_element(self, collection: &str, stage: &Stage, value: Value) -> ElementError {
        ElementError {
            collection: collection.to_string(),
            stage: stage.describe(),
            value,
            kind: self.kind,
            message: self.message,
            source: self.source,
        }
    }
}

impl PartialEq for Stage {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Stage::Processor(a), Stage::Processor(b)) => a.dyn_eq(b.as_ref()),
            (Stage::Function(a), Stage::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl<P: Processor> From<P> for Stage {
    fn from(processor: P) -> Self {
        Stage::Processor(Arc::new(processor))
    }
}

impl From<Arc<dyn Processor>> for Stage {
    fn from(processor: Arc<dyn Processor>) -> Self {
        Stage::Processor(processor)
    }
}

impl From<Function> for Stage {
    fn from(function: Function) -> Self {
        Stage::Function(function)
    }
}

/// An infallible function as a stage.
pub fn func<F>(func: F) -> Stage
where
    F: Fn(Value) -> Value + Send + Sync + 'static,
{
    Stage::Function(Function::infallible(func))
}

/// A fallible function as a stage.
pub fn try_func<F>(func: F) -> Stage
where
    F: Fn(Value) -> Result<Value, TransformError> + Send + Sync + 'static,
{
    Stage::Function(Function::new(func))
}

/// Build a `Vec<Stage>` from processors, functions and stages.
///
/// ```rust,ignore
/// let stages = stages![Strip::default(), func(to_upper), Lowercase];
/// ```
#[macro_export]
macro_rules! stages {
    () => {
        ::std::vec::Vec::<$crate::Stage>::new()
    };
    ($($stage:expr),+ $(,)?) => {
        ::std::vec![$($crate::Stage::from($stage)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DefinitionError, ProcessError};
    use serde_json::json;

    fn shout(value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(s.to_uppercase()),
            other => other,
        }
    }

    fn whisper(value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(s.to_lowercase()),
            other => other,
        }
    }

    struct Passthrough;

    impl Processor for Passthrough {
        fn name(&self) -> &str {
            "Passthrough"
        }

        fn default_context(&self) -> Result<Context, DefinitionError> {
            Ok(Context::new())
        }

        fn process(&self, values: Value, _: &Context) -> Result<Value, ProcessError> {
            Ok(values)
        }
    }

    #[test]
    fn test_function_names() {
        assert_eq!(Function::infallible(shout).name(), "shout");
        let closure = Function::infallible(|v| v);
        assert_eq!(closure.name(), "test_function_names");
        assert_eq!(closure.named("noop").name(), "noop");
    }

    #[test]
    fn test_function_identity() {
        assert_eq!(func(shout), func(shout));
        assert_ne!(func(shout), func(whisper));

        let suffix = String::from("!");
        let capturing = Function::infallible(move |v| json!(format!("{v}{suffix}")));
        assert_eq!(capturing, capturing.clone());
        let other_suffix = String::from("!");
        let other = Function::infallible(move |v| json!(format!("{v}{other_suffix}")));
        assert_ne!(capturing, other);
    }

    #[test]
    fn test_stage_equality_across_kinds() {
        assert_eq!(Stage::from(Passthrough), Stage::from(Passthrough));
        assert_ne!(Stage::from(Passthrough), func(shout));
    }

    #[test]
    fn test_run_wraps_function_failure() {
        let stage = try_func(|_| Err(TransformError::new("ValueError", "nope")));
        let err = stage
            .run(json!("x"), &Context::new())
            .map_err(|failure| failure.into_element("MapCompose", &stage, json!("x")))
            .unwrap_err();
        assert_eq!(err.kind, "ValueError");
        assert_eq!(err.message, "nope");
        assert_eq!(err.value, json!("x"));
    }

    #[test]
    fn test_stages_macro_converts_each_entry() {
        let stages = stages![Passthrough, func(shout)];
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].describe(), "Passthrough()");
        assert_eq!(stages[1].describe(), "shout");
    }
}
