use chrono::NaiveDate;
use serde::Serialize;

use crate::gateway::ImportResponse;

/// What to import.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportJob {
    pub environment: String,
    pub company: String,
    /// Rate source; the registry default when `None`
    pub source_code: Option<String>,
    /// Value date to import; latest rates when `None`
    pub date: Option<NaiveDate>,
}

impl ImportJob {
    pub fn latest(environment: &str, company: &str, source_code: Option<&str>) -> Self {
        Self {
            environment: environment.to_string(),
            company: company.to_string(),
            source_code: source_code.map(str::to_string),
            date: None,
        }
    }

    pub fn for_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Outcome of submitting one value date.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum DateOutcome {
    Submitted { response: ImportResponse },
    Failed { message: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateResult {
    /// Value date, `yyyy-MM-dd`
    pub date: String,
    pub outcome: DateOutcome,
}

/// Per-date results of one import run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub environment: String,
    pub company: String,
    pub source_code: String,
    pub missing_currencies: Vec<String>,
    pub results: Vec<DateResult>,
}

impl ImportReport {
    pub fn submitted_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, DateOutcome::Submitted { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.submitted_count()
    }

    /// True when at least one value date reached the gateway.
    pub fn is_success(&self) -> bool {
        self.submitted_count() > 0
    }

    /// Rates the gateway accepted, summed over submitted dates.
    pub fn successful_rates(&self) -> u32 {
        self.results
            .iter()
            .filter_map(|r| match &r.outcome {
                DateOutcome::Submitted { response } => Some(response.successful_rates),
                DateOutcome::Failed { .. } => None,
            })
            .sum()
    }
}
