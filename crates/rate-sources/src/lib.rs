//! FxBridge Rate Sources Crate
//!
//! This crate provides provider-agnostic foreign-exchange rate fetching for
//! the FxBridge importer.
//!
//! # Overview
//!
//! The rate sources crate supports:
//! - Multiple interchangeable bank-rate providers: MNB (SOAP), ECB (REST/CSV)
//! - A common [`NormalizedRate`] record regardless of wire format
//! - Case-insensitive source code resolution through a [`SourceRegistry`]
//! - Archiving of raw upstream payloads for audit
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |   Import caller  | --> |  SourceRegistry  |  (code -> adapter)
//! +------------------+     +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |   RateSource     |  (MNB, ECB, ...)
//!                          +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          | NormalizedRate[] |  (date, currency, rate, unit)
//!                          +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`NormalizedRate`] - One rate for one currency on one value date
//! - [`SourceModuleDefinition`] - Code, display name and reference currency of an adapter
//! - [`RateRequest`] - Fetch window plus optional currency filter
//! - [`RateSource`] - Trait implemented by every adapter

pub mod archive;
pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

// Re-export all public types from models
pub use models::{
    normalize_code, CurrencyFilter, FetchWindow, NormalizedRate, RateRequest,
    SourceModuleDefinition,
};

// Re-export provider types
pub use provider::ecb::{EcbSource, DEFAULT_ECB_BASE_URL, ECB_CODE};
pub use provider::mnb::{MnbSource, DEFAULT_MNB_URL, MNB_CODE};
pub use provider::RateSource;

// Re-export registry and archive types
pub use archive::{DirectoryArchive, NoopArchive, PayloadArchive};
pub use errors::{RegistryError, SourceError};
pub use registry::{SourceRegistry, DEFAULT_SOURCE_CODE};
