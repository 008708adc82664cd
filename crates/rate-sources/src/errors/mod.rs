//! Error types for the rate sources crate.
//!
//! This module provides:
//! - [`SourceError`]: Failures while fetching or parsing rates from a provider
//! - [`RegistryError`]: Misconfiguration detected by the [`SourceRegistry`](crate::SourceRegistry)

use thiserror::Error;

/// Errors that can occur while fetching rates from a provider.
///
/// Every variant aborts the import for the affected schedule entry.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transport failure or a non-success HTTP status from the provider.
    #[error("Source unavailable: {provider} - {message}")]
    Unavailable {
        /// The provider that failed
        provider: String,
        /// Description of the failure
        message: String,
    },

    /// The provider answered, but the payload could not be parsed.
    #[error("Malformed response from {provider}: {message}")]
    MalformedResponse {
        /// The provider that returned the payload
        provider: String,
        /// Description of the parse failure
        message: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The fetch was abandoned because the process is shutting down.
    #[error("Fetch cancelled: {provider}")]
    Cancelled {
        /// The provider whose fetch was cancelled
        provider: String,
    },
}

impl SourceError {
    /// Classify a transport error from `reqwest`.
    pub fn from_transport(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                provider: provider.to_string(),
            }
        } else {
            Self::Unavailable {
                provider: provider.to_string(),
                message: err.to_string(),
            }
        }
    }

    pub(crate) fn malformed(provider: &str, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// The provider code this error originates from.
    pub fn provider(&self) -> &str {
        match self {
            Self::Unavailable { provider, .. }
            | Self::MalformedResponse { provider, .. }
            | Self::Timeout { provider }
            | Self::Cancelled { provider } => provider,
        }
    }

    /// Returns true if the fetch was abandoned due to shutdown.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Errors raised while building or querying the source registry.
///
/// Both variants indicate misconfiguration; they are fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two or more adapters normalize to the same code.
    #[error("Duplicate rate source registrations detected: {}", codes.join(", "))]
    DuplicateSource {
        /// The offending normalized codes
        codes: Vec<String>,
    },

    /// No adapter is registered under the requested code.
    #[error("Rate source '{0}' is not supported")]
    UnknownSource(String),
}
