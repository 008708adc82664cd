use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One exchange rate for one currency on one value date.
///
/// The rate is quoted against the source's reference currency for
/// `rate_unit` units of `currency_code` (MNB quotes JPY per 100 units).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRate {
    /// Calendar date the rate is valid for
    pub value_date: NaiveDate,

    /// Code of the source that produced the rate (MNB, ECB, ...)
    pub source_code: String,

    /// Upper-case currency code
    pub currency_code: String,

    /// Quoted rate
    pub rate: Decimal,

    /// Quote unit
    pub rate_unit: Decimal,
}

impl NormalizedRate {
    /// Create a rate, normalizing source and currency codes to upper case.
    pub fn new(
        value_date: NaiveDate,
        source_code: &str,
        currency_code: &str,
        rate: Decimal,
        rate_unit: Decimal,
    ) -> Self {
        Self {
            value_date,
            source_code: source_code.trim().to_uppercase(),
            currency_code: currency_code.trim().to_uppercase(),
            rate,
            rate_unit,
        }
    }
}
