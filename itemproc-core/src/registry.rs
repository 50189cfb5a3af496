//! Link-time registry of processor definitions.
//!
//! `#[processor(register)]` submits a [`ProcessorDefinition`] for the type.
//! The registry lets a binary list the processors it was built with and
//! check at startup that every default context can be produced.

use crate::{context::Context, error::DefinitionError};

/// Which transform a processor was defined with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    /// `process_value`, called once per value.
    PerValue,
    /// `call`, called once per batch.
    Bulk,
}

/// A registered processor type.
#[derive(Debug)]
pub struct ProcessorDefinition {
    /// Name of the processor.
    pub name: &'static str,
    /// How the transform is invoked.
    pub transform: TransformKind,
    /// Builds the default context of a `Default` instance.
    pub default_context: fn() -> Result<Context, DefinitionError>,
}

inventory::collect!(ProcessorDefinition);

/// Every registered definition, sorted by name.
pub fn definitions() -> Vec<&'static ProcessorDefinition> {
    let mut definitions: Vec<_> = inventory::iter::<ProcessorDefinition>.into_iter().collect();
    definitions.sort_by_key(|definition| definition.name);
    definitions
}

/// The definition registered under `name`.
pub fn find(name: &str) -> Option<&'static ProcessorDefinition> {
    inventory::iter::<ProcessorDefinition>
        .into_iter()
        .find(|definition| definition.name == name)
}

/// Build every registered default context, returning how many succeeded.
pub fn validate_all() -> Result<usize, DefinitionError> {
    let definitions = definitions();
    for definition in &definitions {
        (definition.default_context)()?;

        #[cfg(feature = "tracing")]
        tracing::trace!(processor = definition.name, "validated definition");
    }
    Ok(definitions.len())
}
