//! # itemproc-core
//!
//! Core context protocol for the itemproc data-cleaning framework.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! processor libraries that don't need the full `itemproc-std` set.
//!
//! # Layers
//!
//! ## Context ([`Context`], [`LayeredContext`])
//!
//! Every processor carries a default context: an ordered mapping of setting
//! names to values, derived from its configuration struct. A call may pass
//! overrides, which win over the defaults for that call only.
//!
//! ## Processor ([`Processor`])
//!
//! The unit of work. Takes a value or batch of values plus overrides and
//! returns the result. The `#[processor]` attribute generates the trait from
//! a typed `process_value` or `call` transform; [`invoke`] holds the glue it
//! expands to.
//!
//! ## Collections ([`MapCompose`], [`Compose`])
//!
//! Immutable sequences of [`Stage`]s that are processors themselves. A
//! collection forwards its context to every processor stage, so one
//! setting configures a whole pipeline.
//!
//! # Error Types
//!
//! - [`Error`] - Top-level error type
//! - [`ProcessError`] - Processing failures
//! - [`ElementError`] - A collection stage failed on one value
//! - [`TransformError`] - Returned by user transforms

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod collection;
mod context;
mod error;
pub mod invoke;
mod processor;
pub mod registry;
mod stage;
mod value;

// Re-exports
pub use collection::{Collection, Compose, Extension, MapCompose, MapMode, Mode, ReduceMode};
pub use context::{Context, LayeredContext};
pub use error::{
    BoxError, CollectionError, ContextError, ContextMergeConflict, DefinitionError, ElementError,
    Error, ProcessError, TransformError,
};
pub use processor::{AsAny, Configurable, Processor, ProcessorExt};
pub use stage::{Function, Stage, func, try_func};
pub use value::{is_truthy, to_values};

#[doc(hidden)]
pub mod __private {
    pub use inventory;
    pub use serde;
    pub use serde_json;
}
