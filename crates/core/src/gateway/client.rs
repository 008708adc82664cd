//! HTTP client for the Company-Currency Gateway.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::GatewayError;
use super::model::{CompanyCurrencyDefinition, ImportRequest, ImportResponse};

/// Operations the import pipeline needs from the ERP side.
#[async_trait]
pub trait CurrencyGateway: Send + Sync {
    /// Currencies configured for `company` in `environment`.
    async fn company_currencies(
        &self,
        environment: &str,
        company: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<CompanyCurrencyDefinition>, GatewayError>;

    /// Submit one value date of rates.
    async fn import_rates(
        &self,
        environment: &str,
        request: &ImportRequest,
        cancel: &CancellationToken,
    ) -> Result<ImportResponse, GatewayError>;
}

/// [`CurrencyGateway`] over the gateway's REST API.
pub struct HttpCurrencyGateway {
    client: Client,
    base_url: String,
}

impl HttpCurrencyGateway {
    /// Fails when the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn read_body(response: Response) -> Result<(reqwest::StatusCode, String), GatewayError> {
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    async fn fetch_currencies(
        &self,
        environment: &str,
        company: &str,
    ) -> Result<Vec<CompanyCurrencyDefinition>, GatewayError> {
        let url = self.url(&format!(
            "api/CurrencyRates/currency-codes/{}?company={}",
            urlencoding::encode(environment),
            urlencoding::encode(company)
        ));
        debug!("Loading company currencies from {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "text/plain")
            .send()
            .await?;
        let (status, body) = Self::read_body(response).await?;

        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(parse_currency_list(&body))
    }

    async fn submit(
        &self,
        environment: &str,
        request: &ImportRequest,
    ) -> Result<ImportResponse, GatewayError> {
        let url = self.url(&format!(
            "api/CurrencyRates/import-single/{}",
            urlencoding::encode(environment)
        ));
        debug!(
            "Submitting {} rate(s) for {} on {} to {}",
            request.rates.len(),
            request.company,
            request.valid_from,
            url
        );

        let response = self.client.post(&url).json(request).send().await?;
        let (status, body) = Self::read_body(response).await?;

        if body.trim().is_empty() {
            if !status.is_success() {
                return Err(GatewayError::Status {
                    status: status.as_u16(),
                    body: "empty body".to_string(),
                });
            }
            return Ok(ImportResponse::default());
        }

        match serde_json::from_str::<ImportResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            }),
            Err(e) => Err(GatewayError::InvalidResponse(e.to_string())),
        }
    }
}

/// Parse the currency list: a JSON array of definitions, or failing that a
/// plain list of codes separated by `,` `;` tabs or line breaks.
fn parse_currency_list(body: &str) -> Vec<CompanyCurrencyDefinition> {
    if body.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Option<Vec<CompanyCurrencyDefinition>>>(body) {
        Ok(parsed) => parsed.unwrap_or_default(),
        Err(_) => body
            .split([',', ';', '\r', '\n', '\t'])
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(CompanyCurrencyDefinition::code_only)
            .collect(),
    }
}

#[async_trait]
impl CurrencyGateway for HttpCurrencyGateway {
    async fn company_currencies(
        &self,
        environment: &str,
        company: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<CompanyCurrencyDefinition>, GatewayError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GatewayError::Cancelled),
            result = self.fetch_currencies(environment, company) => result,
        }
    }

    async fn import_rates(
        &self,
        environment: &str,
        request: &ImportRequest,
        cancel: &CancellationToken,
    ) -> Result<ImportResponse, GatewayError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GatewayError::Cancelled),
            result = self.submit(environment, request) => result,
        }
    }
}
