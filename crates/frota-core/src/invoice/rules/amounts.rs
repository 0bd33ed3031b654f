//! Currency amounts in Brazilian and international notation.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use super::patterns::{AMOUNT_VALUE, DOT_THOUSANDS};
use super::{ExtractionMatch, FieldExtractor};

/// Finds every monetary amount with two decimal places in a text.
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = ExtractionMatch<Decimal>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        AMOUNT_VALUE
            .captures_iter(text)
            .filter_map(|caps| {
                let m = caps.get(1)?;
                let amount = parse_amount(m.as_str())?;
                Some(
                    ExtractionMatch::new(amount, 0.8, m.as_str())
                        .with_position(m.start(), m.end()),
                )
            })
            .collect()
    }
}

/// Parse an amount such as `R$ 1.234,56`, `1234,56`, `1,234.56` or `1234.56`.
///
/// When both separators appear the last one is the decimal separator. A lone
/// comma is decimal. Dots are thousands separators only in a grouped integer
/// without a leading zero (`1.234`, `12.345.678`); `0.125` stays a decimal.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let comma = cleaned.rfind(',');
    let dot = cleaned.rfind('.');

    let normalized = match (comma, dot) {
        (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => {
            if cleaned.matches(',').count() > 1 {
                cleaned.replace(',', "")
            } else {
                cleaned.replace(',', ".")
            }
        }
        (None, Some(_)) => {
            if DOT_THOUSANDS.is_match(&cleaned) {
                cleaned.replace('.', "")
            } else {
                cleaned
            }
        }
        (None, None) => cleaned,
    };

    Decimal::from_str(&normalized).ok()
}

/// Format an amount with exactly two decimal digits, rounding half away from zero.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

/// Normalize a currency-like value to `1234.56`; unparsable input comes back trimmed.
pub fn normalize_currency(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    match parse_amount(trimmed) {
        Some(amount) => format_amount(amount),
        None => trimmed.to_string(),
    }
}

/// Format in Brazilian style (1.234,56) for display.
pub fn format_brl(amount: Decimal) -> String {
    let s = format_amount(amount);
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.as_str()),
    };

    let (integer_part, decimal_part) = digits.split_once('.').unwrap_or((digits, "00"));

    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::new();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push('.');
        }
        formatted.push(*c);
    }

    format!("{}{},{}", sign, formatted, decimal_part)
}
