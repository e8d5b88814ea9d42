//! Monetary helpers shared by invoices and credit notes.
//!
//! Amounts stay at full precision internally; rounding to cents happens only
//! when a value is presented (JSON, PDF, spreadsheet).

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serializer;
use service_core::error::AppError;
use thiserror::Error;

/// A computed amount left the range `Decimal` can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Der Betrag liegt außerhalb des zulässigen Bereichs.")]
pub struct AmountOverflow;

impl From<AmountOverflow> for AppError {
    fn from(err: AmountOverflow) -> Self {
        AppError::BadRequest(anyhow::Error::new(err))
    }
}

pub fn checked_add(a: Decimal, b: Decimal) -> Result<Decimal, AmountOverflow> {
    a.checked_add(b).ok_or(AmountOverflow)
}

pub fn checked_sub(a: Decimal, b: Decimal) -> Result<Decimal, AmountOverflow> {
    a.checked_sub(b).ok_or(AmountOverflow)
}

pub fn checked_mul(a: Decimal, b: Decimal) -> Result<Decimal, AmountOverflow> {
    a.checked_mul(b).ok_or(AmountOverflow)
}

/// `amount * (100 + rate) / 100`
pub fn tax_inclusive(amount: Decimal, rate: Decimal) -> Result<Decimal, AmountOverflow> {
    let factor = checked_add(Decimal::ONE_HUNDRED, rate)?;
    checked_mul(amount, factor)?
        .checked_div(Decimal::ONE_HUNDRED)
        .ok_or(AmountOverflow)
}

/// Tax portion of a net amount.
pub fn tax_amount(amount: Decimal, rate: Decimal) -> Result<Decimal, AmountOverflow> {
    checked_sub(tax_inclusive(amount, rate)?, amount)
}

/// Round to cents, half away from zero, always carrying two decimal places.
pub fn to_cents(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// German presentation: `1.234,56`.
pub fn format_german(amount: Decimal) -> String {
    let cents = to_cents(amount);
    let negative = cents.is_sign_negative() && !cents.is_zero();
    let plain = cents.abs().to_string();
    let (int_part, dec_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("{}{},{}", if negative { "-" } else { "" }, grouped, dec_part)
}

/// `serialize_with` target for amounts exposed over the API.
pub fn serialize_cents<S: Serializer>(amount: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&to_cents(*amount).to_string())
}

/// Optional variant of [`serialize_cents`].
pub fn serialize_cents_opt<S: Serializer>(
    amount: &Option<Decimal>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match amount {
        Some(value) => serialize_cents(value, serializer),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn tax_inclusive_applies_percentage() {
        assert_eq!(tax_inclusive(d("1000.00"), d("19")), Ok(d("1190")));
        assert_eq!(tax_inclusive(d("125.00"), d("19")), Ok(d("148.75")));
        assert_eq!(tax_amount(d("125.00"), d("19")), Ok(d("23.75")));
    }

    #[test]
    fn oversized_amounts_are_rejected() {
        assert_eq!(tax_inclusive(Decimal::MAX, d("19")), Err(AmountOverflow));
        assert_eq!(tax_inclusive(d("1"), Decimal::MAX), Err(AmountOverflow));
        assert_eq!(checked_sub(Decimal::MIN, d("1")), Err(AmountOverflow));
    }

    #[test]
    fn cents_round_half_away_from_zero() {
        assert_eq!(to_cents(d("0.125")).to_string(), "0.13");
        assert_eq!(to_cents(d("-0.125")).to_string(), "-0.13");
        assert_eq!(to_cents(d("1190")).to_string(), "1190.00");
    }

    #[test]
    fn german_format_groups_thousands() {
        assert_eq!(format_german(d("1234.5")), "1.234,50");
        assert_eq!(format_german(d("148.75")), "148,75");
        assert_eq!(format_german(d("1234567.891")), "1.234.567,89");
        assert_eq!(format_german(d("-1000")), "-1.000,00");
        assert_eq!(format_german(d("0")), "0,00");
    }
}
