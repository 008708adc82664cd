//! Rate transformation.
//!
//! Turns fetched [`NormalizedRate`]s into per-date import lines for one
//! company:
//! 1. keep rates whose currency the company uses (case-insensitive)
//! 2. when a date was requested, keep only that value date
//! 3. fail with [`Error::NoMatchingRates`] if nothing is left
//! 4. group by value date, one [`RateGroup`] per date
//! 5. resolve conversion factor and rounding per line
//!
//! Company currencies absent from the remaining rates are reported as missing
//! and do not fail the transformation.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use fxbridge_rate_sources::{CurrencyFilter, NormalizedRate, SourceModuleDefinition};
use rust_decimal::Decimal;

use crate::errors::{Error, Result};
use crate::gateway::{CompanyCurrencyDefinition, ImportRate, ImportRequest};

/// Settings applied to every import request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportSettings {
    /// Currency type tag sent with each request
    pub currency_type: String,
    /// Reference currency used when a source module declares none
    pub fallback_reference_currency: String,
    /// Rounding precision when the company currency declares none
    pub default_rate_round: u32,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            currency_type: "1".to_string(),
            fallback_reference_currency: "HUF".to_string(),
            default_rate_round: 2,
        }
    }
}

impl ImportSettings {
    /// The module's default reference currency, or the configured fallback.
    pub fn reference_currency(&self, module: &SourceModuleDefinition) -> String {
        let declared = module.default_reference_currency.trim();
        if declared.is_empty() {
            self.fallback_reference_currency.trim().to_uppercase()
        } else {
            declared.to_uppercase()
        }
    }
}

/// A company's currency definitions keyed by upper-cased code.
///
/// Blank codes are dropped and the first definition of a code wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompanyCurrencies {
    definitions: BTreeMap<String, CompanyCurrencyDefinition>,
}

impl CompanyCurrencies {
    pub fn from_definitions(definitions: Vec<CompanyCurrencyDefinition>) -> Self {
        let mut map = BTreeMap::new();
        for definition in definitions {
            let code = definition.currency_code.trim().to_uppercase();
            if code.is_empty() {
                continue;
            }
            map.entry(code).or_insert(definition);
        }
        Self { definitions: map }
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn get(&self, currency_code: &str) -> Option<&CompanyCurrencyDefinition> {
        self.definitions.get(&currency_code.trim().to_uppercase())
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Filter narrowing the upstream query to this company's currencies.
    pub fn to_filter(&self) -> CurrencyFilter {
        CurrencyFilter::from_codes(self.codes())
    }
}

/// Import lines for one value date.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateGroup {
    pub value_date: NaiveDate,
    pub lines: Vec<ImportRate>,
}

impl RateGroup {
    /// Wrap the lines into the gateway request for `company`.
    pub fn into_request(self, company: &str, currency_type: &str) -> ImportRequest {
        ImportRequest {
            company: company.to_string(),
            currency_type: currency_type.to_string(),
            valid_from: self.value_date.format("%Y-%m-%d").to_string(),
            rates: self.lines,
        }
    }
}

/// Result of a successful transformation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransformOutcome {
    /// Groups sorted by value date
    pub groups: Vec<RateGroup>,
    /// Company currencies with no rate in the filtered set, sorted
    pub missing_currencies: Vec<String>,
}

impl TransformOutcome {
    pub fn line_count(&self) -> usize {
        self.groups.iter().map(|g| g.lines.len()).sum()
    }
}

/// Builds import lines from fetched rates.
#[derive(Clone, Debug, Default)]
pub struct RateTransformer {
    settings: ImportSettings,
}

impl RateTransformer {
    pub fn new(settings: ImportSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// Transform `rates` for a company.
    ///
    /// `reference_currency` and `source_code` are written onto every line.
    pub fn transform(
        &self,
        rates: &[NormalizedRate],
        currencies: &CompanyCurrencies,
        reference_currency: &str,
        source_code: &str,
        requested_date: Option<NaiveDate>,
    ) -> Result<TransformOutcome> {
        let matching: Vec<(&NormalizedRate, &CompanyCurrencyDefinition)> = rates
            .iter()
            .filter(|rate| requested_date.map_or(true, |date| rate.value_date == date))
            .filter_map(|rate| currencies.get(&rate.currency_code).map(|def| (rate, def)))
            .collect();

        if matching.is_empty() {
            let message = match requested_date {
                Some(date) => format!(
                    "{} rate(s) fetched, none for the company's currencies on {}",
                    rates.len(),
                    date
                ),
                None => format!(
                    "{} rate(s) fetched, none for the company's currencies",
                    rates.len()
                ),
            };
            return Err(Error::NoMatchingRates(message));
        }

        let mut by_date: BTreeMap<NaiveDate, Vec<ImportRate>> = BTreeMap::new();
        for (rate, definition) in &matching {
            by_date
                .entry(rate.value_date)
                .or_default()
                .push(self.line(rate, definition, reference_currency, source_code));
        }

        let missing_currencies = currencies
            .codes()
            .filter(|code| !matching.iter().any(|(rate, _)| rate.currency_code == *code))
            .map(str::to_string)
            .collect();

        let groups = by_date
            .into_iter()
            .map(|(value_date, lines)| RateGroup { value_date, lines })
            .collect();

        Ok(TransformOutcome {
            groups,
            missing_currencies,
        })
    }

    fn line(
        &self,
        rate: &NormalizedRate,
        definition: &CompanyCurrencyDefinition,
        reference_currency: &str,
        source_code: &str,
    ) -> ImportRate {
        let conv_factor = if definition.conv_factor != Decimal::ZERO {
            definition.conv_factor
        } else {
            rate.rate_unit
        };
        let round = definition
            .decimals_in_rate
            .unwrap_or(self.settings.default_rate_round);

        ImportRate {
            currency_code: rate.currency_code.clone(),
            currency_rate: rate.rate,
            conv_factor,
            ref_currency_code: reference_currency.to_string(),
            direct_currency_rate: rate.rate,
            direct_currency_rate_round: round,
            c_table_no: source_code.to_string(),
        }
    }
}
