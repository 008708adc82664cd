#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use fxbridge_core::gateway::{
    CompanyCurrencyDefinition, CurrencyGateway, GatewayError, ImportRequest, ImportResponse,
};
use fxbridge_core::import::RateImportService;
use fxbridge_core::transform::ImportSettings;
use fxbridge_rate_sources::{
    NormalizedRate, RateRequest, RateSource, SourceError, SourceModuleDefinition, SourceRegistry,
};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(day: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
    day.and_hms_opt(h, m, 0).unwrap()
}

/// Rate source returning canned rates and counting fetches.
pub struct MockSource {
    module: SourceModuleDefinition,
    rates: Mutex<Vec<NormalizedRate>>,
    fail: Mutex<bool>,
    cancel_on_fetch: Mutex<Option<CancellationToken>>,
    pub fetches: Mutex<usize>,
}

impl MockSource {
    pub fn new(code: &str, reference: &str) -> Arc<Self> {
        Arc::new(Self {
            module: SourceModuleDefinition::new(code, code, reference),
            rates: Mutex::new(Vec::new()),
            fail: Mutex::new(false),
            cancel_on_fetch: Mutex::new(None),
            fetches: Mutex::new(0),
        })
    }

    pub fn set_rates(&self, rates: Vec<NormalizedRate>) {
        *self.rates.lock().unwrap() = rates;
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    /// Cancel `token` during the next fetch, as a shutdown arriving
    /// mid-request would.
    pub fn cancel_on_next_fetch(&self, token: CancellationToken) {
        *self.cancel_on_fetch.lock().unwrap() = Some(token);
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl RateSource for MockSource {
    fn module(&self) -> &SourceModuleDefinition {
        &self.module
    }

    async fn fetch_rates(
        &self,
        _request: &RateRequest,
        _cancel: &CancellationToken,
    ) -> Result<Vec<NormalizedRate>, SourceError> {
        *self.fetches.lock().unwrap() += 1;
        if let Some(token) = self.cancel_on_fetch.lock().unwrap().take() {
            token.cancel();
            return Err(SourceError::Cancelled {
                provider: self.module.code.clone(),
            });
        }
        if *self.fail.lock().unwrap() {
            return Err(SourceError::Unavailable {
                provider: self.module.code.clone(),
                message: "service down".to_string(),
            });
        }
        Ok(self.rates.lock().unwrap().clone())
    }
}

/// Gateway with fixed company currencies that records submissions.
#[derive(Default)]
pub struct MockGateway {
    currencies: Mutex<Vec<CompanyCurrencyDefinition>>,
    pub submitted: Mutex<Vec<(String, ImportRequest)>>,
}

impl MockGateway {
    pub fn with_currencies(codes: &[&str]) -> Arc<Self> {
        let gateway = Self::default();
        *gateway.currencies.lock().unwrap() = codes
            .iter()
            .map(|code| CompanyCurrencyDefinition::code_only(code))
            .collect();
        Arc::new(gateway)
    }

    pub fn submissions(&self) -> Vec<(String, ImportRequest)> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl CurrencyGateway for MockGateway {
    async fn company_currencies(
        &self,
        _environment: &str,
        _company: &str,
        _cancel: &CancellationToken,
    ) -> Result<Vec<CompanyCurrencyDefinition>, GatewayError> {
        Ok(self.currencies.lock().unwrap().clone())
    }

    async fn import_rates(
        &self,
        environment: &str,
        request: &ImportRequest,
        _cancel: &CancellationToken,
    ) -> Result<ImportResponse, GatewayError> {
        self.submitted
            .lock()
            .unwrap()
            .push((environment.to_string(), request.clone()));
        let count = request.rates.len() as u32;
        Ok(ImportResponse {
            total_rates: count,
            successful_rates: count,
            ..ImportResponse::default()
        })
    }
}

pub fn rate(day: NaiveDate, code: &str, value: Decimal) -> NormalizedRate {
    NormalizedRate::new(day, "MNB", code, value, Decimal::ONE)
}

pub fn importer(sources: Vec<Arc<MockSource>>, gateway: Arc<MockGateway>) -> Arc<RateImportService> {
    let sources: Vec<Arc<dyn RateSource>> = sources
        .into_iter()
        .map(|s| s as Arc<dyn RateSource>)
        .collect();
    let registry = SourceRegistry::register(sources).unwrap();
    Arc::new(RateImportService::new(
        Arc::new(registry),
        gateway,
        ImportSettings::default(),
    ))
}
