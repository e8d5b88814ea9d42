//! Invoice totals.

use super::money::{checked_add, checked_mul, tax_amount, tax_inclusive, AmountOverflow};
use rust_decimal::Decimal;

/// `quantity * unit_price`
pub fn line_sum(quantity: Decimal, unit_price: Decimal) -> Result<Decimal, AmountOverflow> {
    checked_mul(quantity, unit_price)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceTotals {
    pub sum: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl InvoiceTotals {
    /// Totals over `(quantity, unit_price)` pairs.
    pub fn from_lines<I>(lines: I, tax_rate: Decimal) -> Result<Self, AmountOverflow>
    where
        I: IntoIterator<Item = (Decimal, Decimal)>,
    {
        let sum = lines
            .into_iter()
            .try_fold(Decimal::ZERO, |acc, (quantity, unit_price)| {
                checked_add(acc, line_sum(quantity, unit_price)?)
            })?;

        Ok(Self {
            sum,
            tax: tax_amount(sum, tax_rate)?,
            total: tax_inclusive(sum, tax_rate)?,
        })
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
    fn totals_for_two_lines() {
        let totals =
            InvoiceTotals::from_lines([(d("2"), d("50.00")), (d("1"), d("25.00"))], d("19")).unwrap();
        assert_eq!(totals.sum, d("125.00"));
        assert_eq!(totals.tax, d("23.75"));
        assert_eq!(totals.total, d("148.75"));
    }

    #[test]
    fn no_lines_means_zero() {
        let totals = InvoiceTotals::from_lines(Vec::new(), d("19")).unwrap();
        assert_eq!(totals.sum, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn fractional_quantities() {
        assert_eq!(line_sum(d("1.5"), d("80")), Ok(d("120")));
    }

    #[test]
    fn overflowing_lines_fail_instead_of_wrapping() {
        let lines = [(d("2"), Decimal::MAX)];
        assert_eq!(InvoiceTotals::from_lines(lines, d("19")), Err(AmountOverflow));
        let lines = [(d("1"), Decimal::MAX), (d("1"), Decimal::MAX)];
        assert_eq!(InvoiceTotals::from_lines(lines, d("0")), Err(AmountOverflow));
    }
}
