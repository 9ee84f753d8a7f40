//! Price parsing and normalization.
//!
//! Catalog data arrives from the admin panel as either a JSON number or a
//! locale-formatted string ("49,90 €"). Both forms normalize to a
//! non-negative [`Decimal`] rounded to two places; anything unparseable or
//! negative clamps to zero.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

/// Parse a raw price value from a catalog document.
///
/// Accepts a JSON number or a locale-formatted string. Strings are cleaned
/// to digits, comma, period and minus, with the first comma treated as a
/// decimal separator. Negative and unparseable values clamp to zero; the
/// result is rounded to 2 decimal places.
///
/// ```
/// use dele_dzina_core::parse_price;
/// use rust_decimal::Decimal;
/// use serde_json::json;
///
/// assert_eq!(parse_price(&json!("49,90 €")), Decimal::new(4990, 2));
/// assert_eq!(parse_price(&json!("-5")), Decimal::ZERO);
/// assert_eq!(parse_price(&json!(12.5)), Decimal::new(1250, 2));
/// ```
#[must_use]
pub fn parse_price(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => n
            .as_f64()
            .and_then(Decimal::from_f64)
            .map_or(Decimal::ZERO, clamp_and_round),
        Value::String(s) => parse_price_str(s),
        _ => Decimal::ZERO,
    }
}

/// Parse a price from a locale-formatted string.
#[must_use]
pub fn parse_price_str(value: &str) -> Decimal {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    let cleaned = cleaned.replacen(',', ".", 1);

    cleaned
        .trim()
        .parse::<Decimal>()
        .map_or(Decimal::ZERO, clamp_and_round)
}

fn clamp_and_round(value: Decimal) -> Decimal {
    if value < Decimal::ZERO {
        Decimal::ZERO
    } else {
        value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_price(&json!(49.9)), dec("49.90"));
        assert_eq!(parse_price(&json!(10)), dec("10.00"));
        assert_eq!(parse_price(&json!(0)), Decimal::ZERO);
    }

    #[test]
    fn test_parse_numeric_rounds_to_two_places() {
        assert_eq!(parse_price(&json!(19.999)), dec("20.00"));
        assert_eq!(parse_price(&json!(19.994)), dec("19.99"));
    }

    #[test]
    fn test_parse_negative_clamps_to_zero() {
        assert_eq!(parse_price(&json!(-5)), Decimal::ZERO);
        assert_eq!(parse_price(&json!("-5")), Decimal::ZERO);
        assert_eq!(parse_price(&json!("-49,90 €")), Decimal::ZERO);
    }

    #[test]
    fn test_parse_locale_string() {
        assert_eq!(parse_price(&json!("49,90 €")), dec("49.90"));
        assert_eq!(parse_price(&json!("1 249,50 EUR")), dec("1249.50"));
        assert_eq!(parse_price(&json!("19.99")), dec("19.99"));
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!(parse_price(&json!("gratuit")), Decimal::ZERO);
        assert_eq!(parse_price(&json!("")), Decimal::ZERO);
        assert_eq!(parse_price(&json!(null)), Decimal::ZERO);
        assert_eq!(parse_price(&json!([1, 2])), Decimal::ZERO);
        assert_eq!(parse_price(&json!(true)), Decimal::ZERO);
    }
}
