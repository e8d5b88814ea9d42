//! Monthly sales: invoice totals by creation month plus credit-note
//! payments by payment date.

use super::money::{checked_add, serialize_cents, AmountOverflow};
use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySales {
    pub year: i32,
    pub month: u32,
    #[serde(serialize_with = "serialize_cents")]
    pub bills: Decimal,
    #[serde(serialize_with = "serialize_cents")]
    pub payments: Decimal,
    #[serde(serialize_with = "serialize_cents")]
    pub total: Decimal,
}

impl MonthlySales {
    fn empty(first_day: NaiveDate) -> Self {
        Self {
            year: first_day.year(),
            month: first_day.month(),
            bills: Decimal::ZERO,
            payments: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }

    fn covers(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesReport {
    #[serde(serialize_with = "serialize_cents")]
    pub total: Decimal,
    /// The month of `as_of` first, then the eleven before it.
    pub months: Vec<MonthlySales>,
}

pub const REPORTED_MONTHS: u32 = 12;

/// Sales of the twelve months up to and including the month of `as_of`.
/// Amounts dated outside that window are ignored.
pub fn sales_report(
    as_of: NaiveDate,
    bills: impl IntoIterator<Item = (NaiveDate, Decimal)>,
    payments: impl IntoIterator<Item = (NaiveDate, Decimal)>,
) -> Result<SalesReport, AmountOverflow> {
    let current = as_of.with_day(1).unwrap_or(as_of);
    let mut months: Vec<MonthlySales> = (0..REPORTED_MONTHS)
        .filter_map(|back| current.checked_sub_months(Months::new(back)))
        .map(MonthlySales::empty)
        .collect();

    for (date, amount) in bills {
        if let Some(month) = months.iter_mut().find(|m| m.covers(date)) {
            month.bills = checked_add(month.bills, amount)?;
        }
    }
    for (date, amount) in payments {
        if let Some(month) = months.iter_mut().find(|m| m.covers(date)) {
            month.payments = checked_add(month.payments, amount)?;
        }
    }

    let mut total = Decimal::ZERO;
    for month in &mut months {
        month.total = checked_add(month.bills, month.payments)?;
        total = checked_add(total, month.total)?;
    }
    Ok(SalesReport { total, months })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn months_run_backwards_across_the_year_boundary() {
        let report = sales_report(date(2024, 3, 15), [], []).unwrap();
        assert_eq!(report.months.len(), 12);
        assert_eq!((report.months[0].year, report.months[0].month), (2024, 3));
        assert_eq!((report.months[3].year, report.months[3].month), (2023, 12));
        assert_eq!((report.months[11].year, report.months[11].month), (2023, 4));
        assert_eq!(report.total, Decimal::ZERO);
    }

    #[test]
    fn bills_and_payments_are_summed_per_month() {
        let report = sales_report(
            date(2024, 3, 15),
            [
                (date(2024, 3, 1), d("100.50")),
                (date(2024, 3, 20), d("10.00")),
                (date(2024, 1, 31), d("7.25")),
                (date(2023, 3, 31), d("999.00")),
            ],
            [(date(2024, 3, 2), d("40.00")), (date(2023, 4, 1), d("1.00"))],
        )
        .unwrap();

        assert_eq!(report.months[0].bills, d("110.50"));
        assert_eq!(report.months[0].payments, d("40.00"));
        assert_eq!(report.months[0].total, d("150.50"));
        assert_eq!(report.months[2].bills, d("7.25"));
        assert_eq!(report.months[11].payments, d("1.00"));
        assert_eq!(report.total, d("158.75"));
    }

    #[test]
    fn overflowing_sums_are_rejected() {
        let result = sales_report(
            date(2024, 3, 15),
            [(date(2024, 3, 1), Decimal::MAX), (date(2024, 3, 2), Decimal::MAX)],
            [],
        );
        assert_eq!(result, Err(AmountOverflow));
    }
}
