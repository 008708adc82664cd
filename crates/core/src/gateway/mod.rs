//! Company-Currency Gateway.
//!
//! The gateway is the ERP-facing HTTP service that knows which currencies a
//! company uses and accepts rate imports for a single value date.

mod client;
mod error;
mod model;

pub use client::{CurrencyGateway, HttpCurrencyGateway};
pub use error::GatewayError;
pub use model::{
    CompanyCurrencyDefinition, ImportError, ImportRate, ImportRequest, ImportResponse,
};
