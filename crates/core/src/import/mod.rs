//! Rate import pipeline.
//!
//! One import resolves the source, loads the company's currencies from the
//! gateway, fetches rates narrowed to those currencies, transforms them and
//! submits one request per value date.

mod options;
mod report;
mod service;

pub use options::{EnvironmentPolicy, ImportOptions, SourceOption};
pub use report::{DateOutcome, DateResult, ImportJob, ImportReport};
pub use service::RateImportService;
