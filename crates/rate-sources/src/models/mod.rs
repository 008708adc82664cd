//! Rate source models
//!
//! This module contains the core data types shared by all adapters:
//! - `rate` - The normalized rate record (NormalizedRate)
//! - `module` - Adapter identity and source code normalization (SourceModuleDefinition)
//! - `request` - Fetch window and currency filter (RateRequest, FetchWindow, CurrencyFilter)

mod module;
mod rate;
mod request;

pub use module::{normalize_code, SourceModuleDefinition};
pub use rate::NormalizedRate;
pub use request::{CurrencyFilter, FetchWindow, RateRequest};
