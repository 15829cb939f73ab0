//! Currency codes and en-US style amount formatting.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// ISO 4217 style currency representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Validates and upper-cases a three-letter code.
    pub fn parse(code: &str) -> Result<Self, ValidationError> {
        let trimmed = code.trim();
        if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(trimmed.to_ascii_uppercase()))
        } else {
            Err(ValidationError::InvalidCurrency(code.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn symbol(&self) -> Option<&'static str> {
        symbol_for(&self.0)
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self("EUR".into())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Currencies offered by the add/edit forms.
pub const SUPPORTED_CURRENCIES: [&str; 3] = ["EUR", "USD", "GBP"];

pub fn symbol_for(code: &str) -> Option<&'static str> {
    match code {
        "EUR" => Some("€"),
        "USD" => Some("$"),
        "GBP" => Some("£"),
        _ => None,
    }
}

/// Renders `amount` with two decimals and thousands grouping, e.g. `€1,234.50`.
pub fn format_amount(amount: f64, code: &CurrencyCode) -> String {
    let body = format_number(amount.abs());
    let sign = if amount < 0.0 { "-" } else { "" };
    match code.symbol() {
        Some(symbol) => format!("{sign}{symbol}{body}"),
        None => format!("{sign}{} {body}", code.as_str()),
    }
}

fn format_number(value: f64) -> String {
    let body = format!("{value:.2}");
    match body.split_once('.') {
        Some((int_part, fraction)) => format!("{}.{}", group_digits(int_part), fraction),
        None => group_digits(&body),
    }
}

fn group_digits(digits: &str) -> String {
    let mut grouped = String::new();
    for (count, ch) in digits.chars().rev().enumerate() {
        if count != 0 && count % 3 == 0 {
            grouped.insert(0, ',');
        }
        grouped.insert(0, ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_case() {
        let code = CurrencyCode::parse(" usd ").expect("valid code");
        assert_eq!(code.as_str(), "USD");
        assert!(CurrencyCode::parse("EURO").is_err());
        assert!(CurrencyCode::parse("E1R").is_err());
    }

    #[test]
    fn format_uses_symbol_when_known() {
        let eur = CurrencyCode::parse("EUR").unwrap();
        assert_eq!(format_amount(1234.5, &eur), "€1,234.50");
        let chf = CurrencyCode::parse("CHF").unwrap();
        assert_eq!(format_amount(9.99, &chf), "CHF 9.99");
        assert_eq!(format_amount(-3.0, &eur), "-€3.00");
    }
}
