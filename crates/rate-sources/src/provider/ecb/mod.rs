//! European Central Bank (ECB) rate source.
//!
//! Reads the EXR dataflow from the ECB data portal as CSV:
//!
//! ```text
//! GET service/data/EXR/D.USD+GBP.EUR.SP00.A?format=csvdata&startPeriod=..&endPeriod=..
//! GET service/data/EXR/D..EUR.SP00.A?format=csvdata&lastNObservations=1
//! ```
//!
//! All rates are quoted per 1 EUR.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, info};
use reqwest::Client;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use crate::archive::{archive_payload, PayloadArchive};
use crate::errors::SourceError;
use crate::models::{FetchWindow, NormalizedRate, RateRequest, SourceModuleDefinition};
use crate::provider::{parse_decimal, RateSource};

/// Source code of the ECB adapter
pub const ECB_CODE: &str = "ECB";

/// Public ECB data portal
pub const DEFAULT_ECB_BASE_URL: &str = "https://data-api.ecb.europa.eu/";

const BASE_CURRENCY: &str = "EUR";

/// ECB CSV rate source.
pub struct EcbSource {
    client: Client,
    base_url: String,
    archive: Arc<dyn PayloadArchive>,
    module: SourceModuleDefinition,
}

impl EcbSource {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        archive: Arc<dyn PayloadArchive>,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::from_transport(ECB_CODE, e))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            archive,
            module: SourceModuleDefinition::new(ECB_CODE, "European Central Bank", BASE_CURRENCY),
        })
    }

    async fn download(&self, request: &RateRequest) -> Result<String, SourceError> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            build_path(request)
        );
        debug!("Requesting ECB rates from {}", url);

        let response = self
            .client
            .get(&url)
            .query(&build_query(&request.window))
            .send()
            .await
            .map_err(|e| SourceError::from_transport(ECB_CODE, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable {
                provider: ECB_CODE.to_string(),
                message: format!("HTTP status {}", status),
            });
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::from_transport(ECB_CODE, e))
    }
}

#[async_trait]
impl RateSource for EcbSource {
    fn module(&self) -> &SourceModuleDefinition {
        &self.module
    }

    async fn fetch_rates(
        &self,
        request: &RateRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<NormalizedRate>, SourceError> {
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(SourceError::Cancelled {
                    provider: ECB_CODE.to_string(),
                });
            }
            result = self.download(request) => result?,
        };

        archive_payload(&self.archive, ECB_CODE, "csv", body.clone()).await;

        let rates = parse_rates(&body)?;
        info!("Fetched {} rates from ECB", rates.len());
        Ok(rates)
    }
}

/// Series key path, e.g. `service/data/EXR/D.GBP+USD.EUR.SP00.A`.
fn build_path(request: &RateRequest) -> String {
    format!(
        "service/data/EXR/D.{}.{}.SP00.A",
        request.currencies.join("+"),
        BASE_CURRENCY
    )
}

fn build_query(window: &FetchWindow) -> Vec<(&'static str, String)> {
    let mut query = vec![("format", "csvdata".to_string())];
    match window {
        FetchWindow::Latest => query.push(("lastNObservations", "1".to_string())),
        FetchWindow::Range { start, end } => {
            query.push(("startPeriod", start.format("%Y-%m-%d").to_string()));
            query.push(("endPeriod", end.format("%Y-%m-%d").to_string()));
        }
    }
    query
}

fn column(headers: &csv::StringRecord, name: &str) -> Result<usize, SourceError> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| SourceError::malformed(ECB_CODE, format!("missing column {}", name)))
}

/// Parse the CSV body. Rows with a blank date, currency or value are skipped;
/// a present but unparsable date or value fails the whole payload.
fn parse_rates(body: &str) -> Result<Vec<NormalizedRate>, SourceError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| SourceError::malformed(ECB_CODE, e.to_string()))?
        .clone();
    let date_idx = column(&headers, "TIME_PERIOD")?;
    let currency_idx = column(&headers, "CURRENCY")?;
    let value_idx = column(&headers, "OBS_VALUE")?;

    let mut rates = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| SourceError::malformed(ECB_CODE, e.to_string()))?;

        let field = |idx: usize| record.get(idx).map(str::trim).unwrap_or_default();
        let (date_raw, currency, value_raw) = (field(date_idx), field(currency_idx), field(value_idx));
        if date_raw.is_empty() || currency.is_empty() || value_raw.is_empty() {
            continue;
        }

        let value_date = NaiveDate::parse_from_str(date_raw, "%Y-%m-%d").map_err(|_| {
            SourceError::malformed(ECB_CODE, format!("invalid TIME_PERIOD '{}'", date_raw))
        })?;
        let rate = parse_decimal(value_raw).ok_or_else(|| {
            SourceError::malformed(
                ECB_CODE,
                format!("invalid OBS_VALUE '{}' for {}", value_raw, currency),
            )
        })?;

        rates.push(NormalizedRate::new(
            value_date,
            ECB_CODE,
            currency,
            rate,
            Decimal::ONE,
        ));
    }

    Ok(rates)
}
