//! Exact-decimal money handling shared by every parser.
//!
//! Nothing in this crate accepts, computes, or persists currency as binary
//! floating point (spec Invariant 4 / Design Note "Currency -> exact
//! decimals"). Every monetary value that crosses a parser boundary goes
//! through [`normalize_price`].

use rust_decimal::Decimal;
use std::str::FromStr;

/// A parseable token failed to become a decimal. Carries the original text
/// so the caller can attach it to a `price_parse_failed` warning.
#[derive(Debug, Clone, thiserror::Error)]
#[error("could not parse price from {0:?}")]
pub struct PriceParseError(pub String);

/// Repair common OCR confusions seen in price columns, strip currency
/// symbols and thousands separators, and interpret parens / leading minus
/// as negative, then parse as a two-decimal-place [`Decimal`].
///
/// Returns `Err` rather than panicking on unparseable input; callers emit a
/// `price_parse_failed` warning and skip the value (spec §4.3).
pub fn normalize_price(raw: &str) -> Result<Decimal, PriceParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PriceParseError(raw.to_string()));
    }

    let negative_paren = trimmed.starts_with('(') && trimmed.ends_with(')');
    let inner = if negative_paren {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };

    let mut cleaned = String::with_capacity(inner.len());
    for c in inner.chars() {
        match c {
            '$' | '€' | '£' | ',' | ' ' => continue,
            // Common OCR confusions inside a numeric token.
            'E' | 'e' if cleaned.chars().last().map(|c| c.is_ascii_digit()).unwrap_or(false) => {
                cleaned.push('9')
            }
            'O' | 'o' => cleaned.push('0'),
            other => cleaned.push(other),
        }
    }

    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(PriceParseError(raw.to_string()));
    }

    let leading_minus = cleaned.starts_with('-');
    let digits = cleaned.trim_start_matches('-');

    let value = Decimal::from_str(digits).map_err(|_| PriceParseError(raw.to_string()))?;
    let value = value.round_dp(2);

    Ok(if negative_paren || leading_minus {
        -value
    } else {
        value
    })
}

/// Render a decimal as a plain two-fractional-digit price string, the
/// inverse of [`normalize_price`] for values it could have produced.
pub fn format_price(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

/// `true` if `a` and `b` differ by no more than the given tolerance —
/// the ±$0.02 window every monetary invariant in spec §3 is checked with.
pub fn within_tolerance(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    (a - b).abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn strips_currency_and_thousands_separators() {
        assert_eq!(normalize_price("$1,234.56").unwrap(), dec!(1234.56));
    }

    #[test]
    fn repairs_ocr_letter_confusions() {
        // "1O.0O" -> "10.00" (O -> 0)
        assert_eq!(normalize_price("1O.0O").unwrap(), dec!(10.00));
    }

    #[test]
    fn parens_and_leading_minus_are_negative() {
        assert_eq!(normalize_price("(5.00)").unwrap(), dec!(-5.00));
        assert_eq!(normalize_price("-5.00").unwrap(), dec!(-5.00));
    }

    #[test]
    fn unparseable_strings_error_rather_than_panic() {
        assert!(normalize_price("not a price").is_err());
        assert!(normalize_price("").is_err());
    }

    #[test]
    fn format_then_normalize_round_trips() {
        for v in [dec!(0.00), dec!(12.34), dec!(-3.50), dec!(1999.99)] {
            assert_eq!(normalize_price(&format_price(v)).unwrap(), v);
        }
    }

    #[test]
    fn tolerance_window_matches_two_cent_spec_default() {
        assert!(within_tolerance(dec!(10.00), dec!(10.02), dec!(0.02)));
        assert!(!within_tolerance(dec!(10.00), dec!(10.03), dec!(0.02)));
    }
}
