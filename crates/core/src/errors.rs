//! Core error types for the FxBridge importer.

use fxbridge_rate_sources::{RegistryError, SourceError};
use thiserror::Error;

use crate::gateway::GatewayError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the import pipeline and scheduler.
///
/// Per-entry failures (`Source`, `NoMatchingRates`, `Gateway`) abort one
/// run and are logged by the scheduler. `Registry` and `Configuration` are
/// fatal at startup.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Rate source failed: {0}")]
    Source(#[from] SourceError),

    #[error("Source registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("No matching rates: {0}")]
    NoMatchingRates(String),

    #[error("Currency gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Run-state ledger error: {0}")]
    Ledger(String),

    #[error("Invalid schedule: {}", .0.join("; "))]
    Schedule(Vec<String>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Returns true if the operation was abandoned because of shutdown.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Source(e) => e.is_cancelled(),
            Self::Gateway(e) => matches!(e, GatewayError::Cancelled),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_error_lists_every_problem() {
        let err = Error::Schedule(vec![
            "Environment is required.".to_string(),
            "Company is required for environment 'TEST'.".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Invalid schedule: Environment is required.; Company is required for environment 'TEST'."
        );
    }

    #[test]
    fn test_cancellation_is_detected_through_wrappers() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(Error::from(SourceError::Cancelled {
            provider: "MNB".to_string()
        })
        .is_cancelled());
        assert!(Error::from(GatewayError::Cancelled).is_cancelled());
        assert!(!Error::NoMatchingRates("none".to_string()).is_cancelled());
    }
}
