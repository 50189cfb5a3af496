//! # itemproc - Context-Aware Data Cleaning
//!
//! `itemproc` cleans scraped values with small, configurable processors.
//! Each processor's settings form a *context*: defaults come from its
//! configuration struct, and any call may override them. Processors compose
//! into collections that forward their own context to every stage, so one
//! setting configures a whole pipeline.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use itemproc::prelude::*;
//! use itemproc::processors::{NormalizeWhitespace, StripQuotes, TakeFirst};
//!
//! let clean = MapCompose::new(stages![NormalizeWhitespace::default(), StripQuotes::default()])?;
//! let cleaned = clean.apply(json!(["  \"Hello ,  world\" "]), ())?;
//! // ["Hello, world"]
//!
//! let first = TakeFirst::default().apply(cleaned, ())?;
//! ```
//!
//! ## Writing a processor
//!
//! ```rust,ignore
//! use itemproc::processor;
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! #[serde(default)]
//! struct Prefix {
//!     prefix: String,
//! }
//!
//! #[processor]
//! impl Prefix {
//!     fn process_value(value: String, context: &Self) -> String {
//!         format!("{}{value}", context.prefix)
//!     }
//! }
//! ```
//!
//! ## Features
//!
//! - `macros` (default): the `#[processor]` attribute
//! - `std` (default): the standard processors in [`processors`]
//! - `tracing`: debug and trace events from invocations and collections

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use itemproc_core::{
    // Processor
    AsAny,
    // Errors
    BoxError,
    // Collections
    Collection,
    CollectionError,
    Compose,
    Configurable,
    // Context
    Context,
    ContextError,
    ContextMergeConflict,
    DefinitionError,
    ElementError,
    Error,
    Extension,
    // Stages
    Function,
    LayeredContext,
    MapCompose,
    MapMode,
    Mode,
    ProcessError,
    Processor,
    ProcessorExt,
    ReduceMode,
    Stage,
    TransformError,
    context,
    func,
    // Values
    is_truthy,
    stages,
    to_values,
    try_func,
};

pub use itemproc_core::{invoke, registry};

pub use serde_json::{Value, json};

#[cfg(feature = "macros")]
pub use itemproc_macros::processor;

/// Standard processors.
#[cfg(feature = "std")]
pub mod processors {
    #![allow(clippy::wildcard_imports)]
    pub use itemproc_std::*;
}

/// Testing utilities.
#[cfg(feature = "std")]
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use itemproc_std::testing::*;
}

/// Prelude module - common imports for itemproc.
///
/// # Usage
///
/// ```rust,ignore
/// use itemproc::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Compose, Configurable, Context, Error, MapCompose, ProcessError, Processor, ProcessorExt,
        Stage, Value, context, func, json, stages, try_func,
    };

    #[cfg(feature = "macros")]
    pub use crate::processor;
}

#[doc(hidden)]
pub mod __private {
    pub use itemproc_core::__private::{inventory, serde, serde_json};
}
