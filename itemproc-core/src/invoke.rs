//! # Context-injecting invocation
//!
//! Glue between a typed transform and the dynamic [`Processor::process`]
//! entry point. Both helpers layer the call-time overrides over the
//! processor's defaults, unpack the merged view into the processor's own
//! configuration type and hand it to the transform as `&P`, so a transform
//! reads `context.separator` instead of looking keys up by name.
//!
//! - [`each`] runs the transform once per input value and collects the
//!   results into an array.
//! - [`bulk`] hands the whole batch to the transform and returns its result
//!   as-is.
//!
//! Inputs are normalized with [`to_values`] first, so a scalar behaves like
//! a one-element batch.

use crate::{
    context::{Context, LayeredContext},
    error::{ProcessError, TransformError},
    processor::Processor,
    value::to_values,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

/// The processor's configuration with `overrides` applied.
pub fn resolve<P>(processor: &P, overrides: &Context) -> Result<P, ProcessError>
where
    P: Processor + DeserializeOwned,
{
    let defaults = processor.default_context()?;
    Ok(LayeredContext::new(overrides, &defaults).unpack()?)
}

/// Apply `transform` to every input value.
pub fn each<P, I, O, F>(
    processor: &P,
    values: Value,
    overrides: &Context,
    transform: F,
) -> Result<Value, ProcessError>
where
    P: Processor + DeserializeOwned,
    I: DeserializeOwned,
    O: Serialize,
    F: Fn(I, &P) -> Result<O, TransformError>,
{
    let context = resolve(processor, overrides)?;
    let values = to_values(values);

    #[cfg(feature = "tracing")]
    tracing::trace!(processor = processor.name(), count = values.len(), "processing values");

    values
        .into_iter()
        .map(|value| {
            let input = decode(processor, value)?;
            let output = transform(input, &context).map_err(|error| ProcessError::Transform {
                processor: processor.name().to_string(),
                error,
            })?;
            encode(processor, &output)
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

/// Apply `transform` to the whole batch at once.
pub fn bulk<P, I, O, F>(
    processor: &P,
    values: Value,
    overrides: &Context,
    transform: F,
) -> Result<Value, ProcessError>
where
    P: Processor + DeserializeOwned,
    I: DeserializeOwned,
    O: Serialize,
    F: FnOnce(Vec<I>, &P) -> Result<O, TransformError>,
{
    let context = resolve(processor, overrides)?;
    let inputs = to_values(values)
        .into_iter()
        .map(|value| decode(processor, value))
        .collect::<Result<Vec<I>, _>>()?;

    #[cfg(feature = "tracing")]
    tracing::trace!(processor = processor.name(), count = inputs.len(), "processing batch");

    let output = transform(inputs, &context).map_err(|error| ProcessError::Transform {
        processor: processor.name().to_string(),
        error,
    })?;
    encode(processor, &output)
}

fn decode<P, I>(processor: &P, value: Value) -> Result<I, ProcessError>
where
    P: Processor,
    I: DeserializeOwned,
{
    // Deserializing from a borrowed value keeps the original for the error.
    I::deserialize(&value).map_err(|source| ProcessError::InvalidInput {
        processor: processor.name().to_string(),
        value,
        source,
    })
}

fn encode<P, O>(processor: &P, output: &O) -> Result<Value, ProcessError>
where
    P: Processor,
    O: Serialize,
{
    serde_json::to_value(output).map_err(|source| ProcessError::InvalidOutput {
        processor: processor.name().to_string(),
        source,
    })
}
