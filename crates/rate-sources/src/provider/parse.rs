use std::str::FromStr;

use rust_decimal::Decimal;

/// Parse a decimal written with either `,` or `.` as decimal separator.
///
/// When both separators appear, the right-most one is the decimal separator
/// and the other is treated as a thousands separator.
pub(crate) fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = match (trimmed.rfind(','), trimmed.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => trimmed.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => trimmed.replace(',', ""),
        (Some(_), None) => trimmed.replace(',', "."),
        _ => trimmed,
    };

    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
}
