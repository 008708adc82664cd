//! Rate source trait definitions.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::SourceError;
use crate::models::{NormalizedRate, RateRequest, SourceModuleDefinition};

/// Trait for bank rate sources.
///
/// Implement this trait to add support for a new rate provider and register
/// the adapter in the [`SourceRegistry`](crate::SourceRegistry).
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use fxbridge_rate_sources::{RateSource, RateRequest, SourceModuleDefinition};
///
/// struct MyBank {
///     module: SourceModuleDefinition,
/// }
///
/// #[async_trait]
/// impl RateSource for MyBank {
///     fn module(&self) -> &SourceModuleDefinition {
///         &self.module
///     }
///
///     // ... implement fetch_rates
/// }
/// ```
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Code, display name and default reference currency of this adapter.
    fn module(&self) -> &SourceModuleDefinition;

    /// Normalized source code.
    fn code(&self) -> &str {
        &self.module().code
    }

    /// Fetch rates for the request.
    ///
    /// # Arguments
    ///
    /// * `request` - Fetch window and optional currency filter. Adapters use the
    ///   filter to narrow the upstream query but callers must not rely on it
    ///   being applied exactly.
    /// * `cancel` - Shutdown token; an in-flight fetch returns
    ///   [`SourceError::Cancelled`] promptly once it fires.
    ///
    /// # Returns
    ///
    /// Every rate in the upstream answer, or a `SourceError`. Partial results
    /// are never returned.
    async fn fetch_rates(
        &self,
        request: &RateRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<NormalizedRate>, SourceError>;
}
