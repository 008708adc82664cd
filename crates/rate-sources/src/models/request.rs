use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;

/// Which rates to fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchWindow {
    /// The latest available rate per currency.
    Latest,

    /// Every published rate between `start` and `end`, both inclusive.
    Range { start: NaiveDate, end: NaiveDate },
}

impl FetchWindow {
    /// Build a window from optional bounds.
    ///
    /// When both are missing the latest rates are requested. When only one is
    /// given the other defaults to it, giving a single-day fetch. Reversed
    /// bounds are swapped.
    pub fn from_bounds(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        match (start, end) {
            (None, None) => Self::Latest,
            (Some(day), None) | (None, Some(day)) => Self::Range {
                start: day,
                end: day,
            },
            (Some(start), Some(end)) if start > end => Self::Range {
                start: end,
                end: start,
            },
            (Some(start), Some(end)) => Self::Range { start, end },
        }
    }

    pub fn single_day(date: NaiveDate) -> Self {
        Self::Range {
            start: date,
            end: date,
        }
    }
}

/// Case-insensitive set of currency codes used to narrow an upstream query.
///
/// Parsed from a comma or semicolon delimited string. Codes are trimmed,
/// upper-cased, de-duplicated and kept sorted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CurrencyFilter {
    codes: BTreeSet<String>,
}

impl CurrencyFilter {
    pub fn parse(raw: &str) -> Self {
        let codes = raw
            .split([',', ';'])
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_uppercase)
            .collect();
        Self { codes }
    }

    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let codes = codes
            .into_iter()
            .map(|code| code.as_ref().trim().to_uppercase())
            .filter(|code| !code.is_empty())
            .collect();
        Self { codes }
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(&code.trim().to_uppercase())
    }

    /// Iterate codes in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }

    pub fn join(&self, separator: &str) -> String {
        self.iter().collect::<Vec<_>>().join(separator)
    }
}

impl fmt::Display for CurrencyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join(","))
    }
}

/// Parameters for a single fetch from a rate source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateRequest {
    pub window: FetchWindow,
    pub currencies: CurrencyFilter,
}

impl RateRequest {
    /// Build a request from optional bounds and an optional delimited currency list.
    pub fn new(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        currency_filter: Option<&str>,
    ) -> Self {
        Self {
            window: FetchWindow::from_bounds(start, end),
            currencies: currency_filter.map(CurrencyFilter::parse).unwrap_or_default(),
        }
    }

    pub fn latest() -> Self {
        Self {
            window: FetchWindow::Latest,
            currencies: CurrencyFilter::default(),
        }
    }

    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            window: FetchWindow::single_day(date),
            currencies: CurrencyFilter::default(),
        }
    }

    pub fn with_currencies(mut self, currencies: CurrencyFilter) -> Self {
        self.currencies = currencies;
        self
    }
}
