//! Credit-note balance tracking.
//!
//! The stored balance is a materialized view of the gross amount, tax rate
//! and payment ledger: `open + paid == gross * (100 + tax) / 100` holds after
//! every operation below. Operations that would overflow fail without
//! touching the balance.

use super::money::{checked_add, checked_sub, serialize_cents, tax_inclusive, AmountOverflow};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CreditNoteBalance {
    #[serde(serialize_with = "serialize_cents")]
    pub gross_amount: Decimal,
    pub tax_rate: Decimal,
    #[serde(serialize_with = "serialize_cents")]
    pub open_amount: Decimal,
    #[serde(serialize_with = "serialize_cents")]
    pub paid_amount: Decimal,
    pub completed: bool,
    pub completed_date: Option<NaiveDate>,
}

impl CreditNoteBalance {
    /// Fresh balance: everything open, nothing paid.
    pub fn open(gross_amount: Decimal, tax_rate: Decimal) -> Result<Self, AmountOverflow> {
        Ok(Self {
            gross_amount,
            tax_rate,
            open_amount: tax_inclusive(gross_amount, tax_rate)?,
            paid_amount: Decimal::ZERO,
            completed: false,
            completed_date: None,
        })
    }

    /// Tax-inclusive amount owed in total.
    pub fn due(&self) -> Result<Decimal, AmountOverflow> {
        tax_inclusive(self.gross_amount, self.tax_rate)
    }

    /// Apply a payment of any sign. Completion is only ever set here, never
    /// cleared.
    pub fn post_payment(&mut self, amount: Decimal, today: NaiveDate) -> Result<(), AmountOverflow> {
        let open_amount = checked_sub(self.open_amount, amount)?;
        let paid_amount = checked_add(self.paid_amount, amount)?;
        self.open_amount = open_amount;
        self.paid_amount = paid_amount;
        if self.open_amount <= Decimal::ZERO {
            self.completed = true;
            self.completed_date = Some(today);
        }
        Ok(())
    }

    /// Undo a previously posted payment.
    pub fn reverse_payment(&mut self, amount: Decimal, today: NaiveDate) -> Result<(), AmountOverflow> {
        let open_amount = checked_add(self.open_amount, amount)?;
        let paid_amount = checked_sub(self.paid_amount, amount)?;
        self.open_amount = open_amount;
        self.paid_amount = paid_amount;
        self.settle(today);
        Ok(())
    }

    /// Re-derive the open amount after a gross or tax edit. The paid amount
    /// and payment history stay untouched.
    pub fn revalue(
        &mut self,
        gross_amount: Decimal,
        tax_rate: Decimal,
        today: NaiveDate,
    ) -> Result<(), AmountOverflow> {
        let open_amount = checked_sub(tax_inclusive(gross_amount, tax_rate)?, self.paid_amount)?;
        self.gross_amount = gross_amount;
        self.tax_rate = tax_rate;
        self.open_amount = open_amount;
        self.settle(today);
        Ok(())
    }

    fn settle(&mut self, today: NaiveDate) {
        let completed = self.open_amount <= Decimal::ZERO;
        match (self.completed, completed) {
            (false, true) => self.completed_date = Some(today),
            (true, false) => self.completed_date = None,
            _ => {}
        }
        self.completed = completed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn assert_invariant(balance: &CreditNoteBalance) {
        assert_eq!(balance.open_amount + balance.paid_amount, balance.due().unwrap());
    }

    #[test]
    fn new_note_is_fully_open() {
        let balance = CreditNoteBalance::open(d("1000.00"), d("19")).unwrap();
        assert_eq!(balance.open_amount, d("1190.00"));
        assert_eq!(balance.paid_amount, d("0.00"));
        assert!(!balance.completed);
        assert_invariant(&balance);
    }

    #[test]
    fn full_payment_completes_note() {
        let mut balance = CreditNoteBalance::open(d("1000.00"), d("19")).unwrap();
        balance.post_payment(d("1190.00"), today()).unwrap();
        assert_eq!(balance.open_amount, d("0.00"));
        assert_eq!(balance.paid_amount, d("1190.00"));
        assert!(balance.completed);
        assert_eq!(balance.completed_date, Some(today()));
        assert_invariant(&balance);
    }

    #[test]
    fn payments_move_balances_by_exact_amount_regardless_of_sign() {
        let mut balance = CreditNoteBalance::open(d("100"), d("19")).unwrap();
        balance.post_payment(d("50.25"), today()).unwrap();
        assert_eq!(balance.open_amount, d("68.75"));
        assert_eq!(balance.paid_amount, d("50.25"));

        balance.post_payment(d("-10"), today()).unwrap();
        assert_eq!(balance.open_amount, d("78.75"));
        assert_eq!(balance.paid_amount, d("40.25"));
        assert!(!balance.completed);
        assert_invariant(&balance);
    }

    #[test]
    fn overpayment_goes_negative_and_completes() {
        let mut balance = CreditNoteBalance::open(d("100"), d("0")).unwrap();
        balance.post_payment(d("150"), today()).unwrap();
        assert_eq!(balance.open_amount, d("-50"));
        assert!(balance.completed);
    }

    #[test]
    fn negative_payment_after_completion_keeps_completed() {
        let mut balance = CreditNoteBalance::open(d("100"), d("0")).unwrap();
        balance.post_payment(d("100"), today()).unwrap();
        balance.post_payment(d("-20"), today()).unwrap();
        assert_eq!(balance.open_amount, d("20"));
        assert!(balance.completed);
    }

    #[test]
    fn gross_edit_reopens_completed_note() {
        let mut balance = CreditNoteBalance::open(d("1000.00"), d("19")).unwrap();
        balance.post_payment(d("1190.00"), today()).unwrap();
        balance.revalue(d("2000.00"), d("19"), today()).unwrap();
        assert_eq!(balance.open_amount, d("1190.00"));
        assert_eq!(balance.paid_amount, d("1190.00"));
        assert!(!balance.completed);
        assert_eq!(balance.completed_date, None);
        assert_invariant(&balance);
    }

    #[test]
    fn gross_edit_can_complete_note() {
        let mut balance = CreditNoteBalance::open(d("1000.00"), d("19")).unwrap();
        balance.post_payment(d("595.00"), today()).unwrap();
        balance.revalue(d("500.00"), d("19"), today()).unwrap();
        assert_eq!(balance.open_amount, d("0.00"));
        assert!(balance.completed);
        assert_eq!(balance.completed_date, Some(today()));
    }

    #[test]
    fn tax_edit_keeps_invariant() {
        let mut balance = CreditNoteBalance::open(d("1000.00"), d("19")).unwrap();
        balance.post_payment(d("100"), today()).unwrap();
        balance.revalue(d("1000.00"), d("7"), today()).unwrap();
        assert_eq!(balance.open_amount, d("970.00"));
        assert_invariant(&balance);
    }

    #[test]
    fn reversing_payment_restores_open_amount() {
        let mut balance = CreditNoteBalance::open(d("1000.00"), d("19")).unwrap();
        balance.post_payment(d("1190.00"), today()).unwrap();
        balance.reverse_payment(d("1190.00"), today()).unwrap();
        assert_eq!(balance.open_amount, d("1190.00"));
        assert_eq!(balance.paid_amount, d("0.00"));
        assert!(!balance.completed);
        assert_eq!(balance.completed_date, None);
    }

    #[test]
    fn overflowing_payment_leaves_balance_untouched() {
        let mut balance = CreditNoteBalance::open(d("1000.00"), d("19")).unwrap();
        let before = balance.clone();
        assert_eq!(balance.post_payment(-Decimal::MAX, today()), Err(AmountOverflow));
        assert_eq!(balance, before);
        assert_invariant(&balance);

        assert_eq!(balance.revalue(Decimal::MAX, d("19"), today()), Err(AmountOverflow));
        assert_eq!(balance, before);
    }
}
