//! Money advanced to workers and their repayments.
//!
//! Positive amounts are advances, negative amounts are repayments.

use crate::audit::{ChangeSet, Patch};
use crate::billing::money::{checked_add, checked_sub, serialize_cents};
use crate::billing::AmountOverflow;
use crate::query::Identified;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Debt {
    pub id: i64,
    pub worker_id: i64,
    #[serde(serialize_with = "serialize_cents")]
    pub amount: Decimal,
    pub date: NaiveDate,
    pub notes: String,
    pub created_utc: DateTime<Utc>,
}

impl Identified for Debt {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Debt {
    pub fn is_repayment(&self) -> bool {
        self.amount.is_sign_negative()
    }

    pub fn apply_update(&mut self, patch: DebtPatch) -> ChangeSet {
        let mut changes = ChangeSet::new();
        changes.apply("amount", "Betrag", &mut self.amount, patch.amount);
        changes.apply("date", "Datum", &mut self.date, patch.date);
        changes.apply("notes", "Notizen", &mut self.notes, patch.notes);
        changes
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewDebt {
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct DebtPatch {
    pub amount: Patch<Decimal>,
    pub date: Patch<NaiveDate>,
    pub notes: Patch<String>,
}

/// Totals over a worker's ledger; `repaid` is reported positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DebtSummary {
    #[serde(serialize_with = "serialize_cents")]
    pub given: Decimal,
    #[serde(serialize_with = "serialize_cents")]
    pub repaid: Decimal,
    #[serde(serialize_with = "serialize_cents")]
    pub outstanding: Decimal,
}

impl DebtSummary {
    pub fn of(debts: &[Debt]) -> Result<Self, AmountOverflow> {
        let mut given = Decimal::ZERO;
        let mut repaid = Decimal::ZERO;
        for debt in debts {
            if debt.is_repayment() {
                repaid = checked_sub(repaid, debt.amount)?;
            } else {
                given = checked_add(given, debt.amount)?;
            }
        }
        Ok(Self {
            given,
            repaid,
            outstanding: checked_sub(given, repaid)?,
        })
    }
}
