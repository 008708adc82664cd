//! Source registry module.
//!
//! Indexes the rate source adapters registered at startup by their normalized
//! code and resolves the adapter for a schedule entry or one-shot import.

mod registry;

pub use registry::{SourceRegistry, DEFAULT_SOURCE_CODE};
