//! Rate source abstractions and implementations.
//!
//! This module contains:
//! - The `RateSource` trait that all adapters implement
//! - Locale-tolerant decimal parsing shared by the adapters
//! - Concrete adapters: MNB (SOAP/XML) and ECB (REST/CSV)
//!
//! # Architecture
//!
//! Adapters are:
//! - **Provider-agnostic at the seam**: callers only see `NormalizedRate`
//! - **All-or-nothing**: a fetch yields the full parsed set or a `SourceError`
//! - **Cancellable**: every network call races the shutdown token

mod parse;
mod traits;

pub mod ecb;
pub mod mnb;

pub(crate) use parse::parse_decimal;
pub use traits::RateSource;
