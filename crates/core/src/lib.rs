//! FxBridge Core - import pipeline and run scheduling.
//!
//! This crate turns rates fetched by `fxbridge-rate-sources` into per-date
//! import requests for a company, submits them to the Company-Currency
//! Gateway, and runs configured imports once per day per schedule entry.
//!
//! Modules:
//! - [`gateway`] - Company-Currency Gateway trait, wire model and HTTP client
//! - [`transform`] - Filtering, grouping and line construction
//! - [`schedule`] - Schedule file model, validation and store
//! - [`run_state`] - Durable last-run ledger
//! - [`import`] - End-to-end import of one (environment, company, source)
//! - [`scheduler`] - Poll loop deciding which entries are due

pub mod errors;
pub mod gateway;
pub mod import;
pub mod run_state;
pub mod schedule;
pub mod scheduler;
pub mod transform;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
