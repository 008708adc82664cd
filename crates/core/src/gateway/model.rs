//! Wire model of the Company-Currency Gateway (camelCase JSON).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A currency configured for a company in the ERP.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyCurrencyDefinition {
    #[serde(alias = "CurrencyCode")]
    pub currency_code: String,

    /// Units the rate is quoted per; zero means "take it from the source".
    #[serde(default, alias = "ConvFactor")]
    pub conv_factor: Decimal,

    /// Rounding precision for the direct rate; `None` uses the configured default.
    #[serde(default, alias = "DecimalsInRate")]
    pub decimals_in_rate: Option<u32>,
}

impl CompanyCurrencyDefinition {
    /// A definition with only a code, as produced by the plain-text currency list.
    pub fn code_only(currency_code: &str) -> Self {
        Self {
            currency_code: currency_code.trim().to_string(),
            conv_factor: Decimal::ZERO,
            decimals_in_rate: None,
        }
    }
}

/// One value date of rates for one company.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub company: String,
    pub currency_type: String,
    /// Value date, `yyyy-MM-dd`
    pub valid_from: String,
    pub rates: Vec<ImportRate>,
}

/// One currency line of an [`ImportRequest`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRate {
    pub currency_code: String,
    pub currency_rate: Decimal,
    pub conv_factor: Decimal,
    pub ref_currency_code: String,
    pub direct_currency_rate: Decimal,
    pub direct_currency_rate_round: u32,
    /// Source module code the rate came from
    #[serde(rename = "cTableNo")]
    pub c_table_no: String,
}

/// Gateway verdict for one [`ImportRequest`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportResponse {
    #[serde(alias = "TotalRates")]
    pub total_rates: u32,
    #[serde(alias = "SuccessfulRates")]
    pub successful_rates: u32,
    #[serde(alias = "FailedRates")]
    pub failed_rates: u32,
    #[serde(alias = "Errors")]
    pub errors: Vec<ImportError>,
    #[serde(alias = "Messages")]
    pub messages: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportError {
    #[serde(alias = "CurrencyCode")]
    pub currency_code: String,
    #[serde(alias = "Message")]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_request_wire_names() {
        let request = ImportRequest {
            company: "KFT".to_string(),
            currency_type: "1".to_string(),
            valid_from: "2024-03-01".to_string(),
            rates: vec![ImportRate {
                currency_code: "EUR".to_string(),
                currency_rate: dec!(392.81),
                conv_factor: dec!(1),
                ref_currency_code: "HUF".to_string(),
                direct_currency_rate: dec!(392.81),
                direct_currency_rate_round: 4,
                c_table_no: "MNB".to_string(),
            }],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["validFrom"], "2024-03-01");
        assert_eq!(json["currencyType"], "1");

        let line = &json["rates"][0];
        assert_eq!(line["currencyCode"], "EUR");
        assert_eq!(line["refCurrencyCode"], "HUF");
        assert_eq!(line["directCurrencyRateRound"], 4);
        assert_eq!(line["cTableNo"], "MNB");
        assert!(line["currencyRate"].is_number());
    }

    #[test]
    fn test_definition_defaults() {
        let parsed: Vec<CompanyCurrencyDefinition> =
            serde_json::from_str(r#"[{"currencyCode":"USD"},{"currencyCode":"JPY","convFactor":100,"decimalsInRate":4}]"#)
                .unwrap();

        assert_eq!(parsed[0], CompanyCurrencyDefinition::code_only("USD"));
        assert_eq!(parsed[1].conv_factor, dec!(100));
        assert_eq!(parsed[1].decimals_in_rate, Some(4));
    }

    #[test]
    fn test_response_tolerates_missing_fields() {
        let response: ImportResponse = serde_json::from_str(
            r#"{"totalRates":2,"successfulRates":1,"failedRates":1,"errors":[{"currencyCode":"GBP","message":"Unknown currency"}]}"#,
        )
        .unwrap();

        assert_eq!(response.total_rates, 2);
        assert_eq!(response.errors[0].currency_code, "GBP");
        assert!(response.messages.is_empty());
    }
}
