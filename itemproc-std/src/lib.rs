//! # itemproc-std
//!
//! Standard processors for the itemproc data-cleaning framework.
//!
//! This crate provides:
//! - **Text**: [`NormalizeWhitespace`], [`StripQuotes`], [`UnicodeEscape`], ...
//! - **Numbers**: [`ExtractDigits`], [`ToFloat`], [`NormalizeNumericString`]
//! - **Batches**: [`TakeFirst`], [`TakeFirstTruthy`], [`Coalesce`], [`Join`], ...
//! - **Contact details**: [`Emails`], [`Socials`]
//! - **Dates**: [`DateTime`], [`Date`], [`Time`]
//! - **Testing**: [`testing::RecordingProcessor`], [`testing::FailingProcessor`]
//!
//! Every processor here is registered and can be looked up by name through
//! `itemproc_core::registry`.

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core
pub use itemproc_core;

mod charset;
pub mod contact;
pub mod datetime;
pub mod multi;
pub mod numeric;
pub mod testing;
pub mod text;

pub use charset::CharSet;
pub use contact::{Emails, Socials};
pub use datetime::{Date, DateTime, DateTimeError, Time};
pub use multi::{
    Coalesce, Flatten, Identity, Join, TakeAll, TakeAllTruthy, TakeFirst, TakeFirstTruthy,
};
pub use numeric::{ExtractDigits, NoNumberFound, NormalizeNumericString, ToFloat, parse_number};
pub use text::{
    CharWhitespacePadding, Lowercase, NormalizeWhitespace, RemoveHtmlTags, Strip, StripQuotes,
    UnicodeEscape, UnicodeEscapeError, Uppercase,
};
