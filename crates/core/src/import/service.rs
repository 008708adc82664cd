use std::sync::Arc;

use fxbridge_rate_sources::{RateRequest, SourceRegistry};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::options::{EnvironmentPolicy, ImportOptions};
use super::report::{DateOutcome, DateResult, ImportJob, ImportReport};
use crate::errors::{Error, Result};
use crate::gateway::{CurrencyGateway, GatewayError, ImportRequest, ImportResponse};
use crate::transform::{CompanyCurrencies, ImportSettings, RateTransformer};

/// Fetches, transforms and submits rates for one (environment, company, source).
pub struct RateImportService {
    registry: Arc<SourceRegistry>,
    gateway: Arc<dyn CurrencyGateway>,
    transformer: RateTransformer,
}

impl RateImportService {
    pub fn new(
        registry: Arc<SourceRegistry>,
        gateway: Arc<dyn CurrencyGateway>,
        settings: ImportSettings,
    ) -> Self {
        Self {
            registry,
            gateway,
            transformer: RateTransformer::new(settings),
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn options(&self, environments: &EnvironmentPolicy) -> ImportOptions {
        ImportOptions::build(environments, &self.registry)
    }

    /// Run the import pipeline.
    ///
    /// Fails before anything is submitted when the source is unknown, the
    /// company currency list cannot be loaded or is empty, the fetch fails,
    /// or no fetched rate matches the company's currencies. Once submission
    /// starts, a failed value date is recorded in the report and the
    /// remaining dates are still submitted.
    pub async fn import(&self, job: &ImportJob, cancel: &CancellationToken) -> Result<ImportReport> {
        let source = self.registry.resolve(job.source_code.as_deref())?;
        let module = source.module().normalized();
        let environment = job.environment.trim();
        let company = job.company.trim();

        info!(
            environment = %environment,
            company = %company,
            source = %module.code,
            date = ?job.date,
            "Starting rate import"
        );

        let definitions = self
            .gateway
            .company_currencies(environment, company, cancel)
            .await?;
        let currencies = CompanyCurrencies::from_definitions(definitions);
        if currencies.is_empty() {
            return Err(Error::NoMatchingRates(format!(
                "company currency list is empty for {} in {}",
                company, environment
            )));
        }

        let request =
            RateRequest::new(job.date, job.date, None).with_currencies(currencies.to_filter());
        let rates = source.fetch_rates(&request, cancel).await?;

        let reference_currency = self.transformer.settings().reference_currency(&module);
        let outcome = self.transformer.transform(
            &rates,
            &currencies,
            &reference_currency,
            &module.code,
            job.date,
        )?;

        if !outcome.missing_currencies.is_empty() {
            warn!(
                environment = %environment,
                company = %company,
                source = %module.code,
                missing = %outcome.missing_currencies.join(","),
                "Company currencies missing from fetched rates"
            );
        }

        let currency_type = self.transformer.settings().currency_type.clone();
        let mut results = Vec::with_capacity(outcome.groups.len());

        for group in outcome.groups {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let request = group.into_request(company, &currency_type);
            let date = request.valid_from.clone();

            let date_outcome = match self.gateway.import_rates(environment, &request, cancel).await {
                Ok(response) => {
                    log_response(environment, &request, &response);
                    DateOutcome::Submitted { response }
                }
                Err(GatewayError::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    error!(
                        environment = %environment,
                        company = %company,
                        source = %module.code,
                        date = %date,
                        "Import submission failed: {}",
                        e
                    );
                    DateOutcome::Failed {
                        message: e.to_string(),
                    }
                }
            };
            results.push(DateResult {
                date,
                outcome: date_outcome,
            });
        }

        Ok(ImportReport {
            environment: environment.to_string(),
            company: company.to_string(),
            source_code: module.code,
            missing_currencies: outcome.missing_currencies,
            results,
        })
    }
}

fn log_response(environment: &str, request: &ImportRequest, response: &ImportResponse) {
    info!(
        environment = %environment,
        company = %request.company,
        date = %request.valid_from,
        total = response.total_rates,
        success = response.successful_rates,
        failed = response.failed_rates,
        "Import response received"
    );

    if !response.messages.is_empty() {
        info!(
            company = %request.company,
            date = %request.valid_from,
            "Import messages: {}",
            response.messages.join(" | ")
        );
    }

    for err in &response.errors {
        warn!(
            company = %request.company,
            date = %request.valid_from,
            currency = %err.currency_code,
            "Import error: {}",
            err.message
        );
    }
}
