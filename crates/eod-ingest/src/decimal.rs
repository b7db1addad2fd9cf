//! Decimal string -> 1e-6 fixed point, without floating point.
//!
//! Digits past the sixth decimal place are rounded half away from zero
//! (broker average prices routinely carry more precision than micros).

use std::fmt;

use eod_ledger::{Micros, Qty, MICROS_SCALE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecimalError {
    Empty,
    Invalid(String),
    OutOfRange(String),
}

impl fmt::Display for DecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecimalError::Empty => write!(f, "empty decimal"),
            DecimalError::Invalid(raw) => write!(f, "invalid decimal '{raw}'"),
            DecimalError::OutOfRange(raw) => write!(f, "decimal out of range '{raw}'"),
        }
    }
}

impl std::error::Error for DecimalError {}

/// Parse `[+-]digits[.digits]` into raw micros.
pub fn parse_micros_raw(s: &str) -> Result<i64, DecimalError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(DecimalError::Empty);
    }

    let (negative, digits) = if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = s.strip_prefix('+') {
        (false, rest)
    } else {
        (false, s)
    };

    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    let all_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part)
    {
        return Err(DecimalError::Invalid(s.to_string()));
    }

    let out_of_range = || DecimalError::OutOfRange(s.to_string());

    let int_val: i128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse::<i128>().map_err(|_| out_of_range())?
    };

    let (kept, rest) = frac_part.split_at(frac_part.len().min(6));
    let mut frac_val: i128 = 0;
    for c in kept.chars() {
        frac_val = frac_val * 10 + i128::from(c as u8 - b'0');
    }
    for _ in kept.len()..6 {
        frac_val *= 10;
    }
    if rest.as_bytes().first().is_some_and(|d| *d >= b'5') {
        frac_val += 1;
    }

    let magnitude = int_val
        .checked_mul(MICROS_SCALE as i128)
        .and_then(|v| v.checked_add(frac_val))
        .ok_or_else(out_of_range)?;
    let signed = if negative { -magnitude } else { magnitude };
    i64::try_from(signed).map_err(|_| out_of_range())
}

pub fn parse_micros(s: &str) -> Result<Micros, DecimalError> {
    parse_micros_raw(s).map(Micros::new)
}

pub fn parse_qty(s: &str) -> Result<Qty, DecimalError> {
    parse_micros_raw(s).map(Qty::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_and_fractions() {
        assert_eq!(parse_micros_raw("182.34").unwrap(), 182_340_000);
        assert_eq!(parse_micros_raw("75").unwrap(), 75_000_000);
        assert_eq!(parse_micros_raw(".5").unwrap(), 500_000);
        assert_eq!(parse_micros_raw("-12.000001").unwrap(), -12_000_001);
        assert_eq!(parse_micros_raw(" +3 ").unwrap(), 3_000_000);
    }

    #[test]
    fn excess_precision_rounds_half_away_from_zero() {
        assert_eq!(parse_micros_raw("1.0000005").unwrap(), 1_000_001);
        assert_eq!(parse_micros_raw("1.0000004999").unwrap(), 1_000_000);
        assert_eq!(parse_micros_raw("-1.0000005").unwrap(), -1_000_001);
        assert_eq!(parse_micros_raw("0.9999995").unwrap(), 1_000_000);
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_micros_raw(""), Err(DecimalError::Empty));
        assert!(matches!(parse_micros_raw("abc"), Err(DecimalError::Invalid(_))));
        assert!(matches!(parse_micros_raw("1.2.3"), Err(DecimalError::Invalid(_))));
        assert!(matches!(parse_micros_raw("-"), Err(DecimalError::Invalid(_))));
        assert!(matches!(parse_micros_raw("1e5"), Err(DecimalError::Invalid(_))));
    }

    #[test]
    fn out_of_range_is_rejected() {
        assert!(matches!(
            parse_micros_raw("99999999999999999999"),
            Err(DecimalError::OutOfRange(_))
        ));
    }
}
