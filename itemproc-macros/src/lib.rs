//! Procedural macros for itemproc.
//!
//! This crate provides:
//! - `#[processor]` - Generates `Processor` for a configuration struct from
//!   its `process_value` or `call` transform

use proc_macro::TokenStream;

mod processor;
mod signature;

/// Turn a configuration struct into a processor.
///
/// The struct's fields are its default context; it must implement
/// `Default`, `Serialize` and `Deserialize` (usually with
/// `#[serde(default)]`). The annotated `impl` block defines exactly one
/// transform:
///
/// ```rust,ignore
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// #[serde(default)]
/// pub struct Join {
///     pub separator: String,
/// }
///
/// #[processor(register)]
/// impl Join {
///     fn call(values: Vec<String>, context: &Self) -> String {
///         values.join(&context.separator)
///     }
/// }
/// ```
///
/// `process_value(value, context)` runs once per value; `call(values,
/// context)` runs once per batch. A transform returning `Result` may fail
/// with any error type, which is kept as the failure's kind.
///
/// # Arguments
///
/// - `name = "..."` - Rendered name (defaults to the type name)
/// - `crate = path` - Where `Processor` lives (defaults to `::itemproc`)
/// - `register` - Add the processor to `itemproc::registry`
#[proc_macro_attribute]
pub fn processor(attr: TokenStream, item: TokenStream) -> TokenStream {
    processor::processor_impl(attr, item)
}
