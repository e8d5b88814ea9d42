//! Credit notes ("Gutschriften") and the payments settling them.

use crate::audit::{ChangeSet, Patch};
use crate::billing::money::serialize_cents;
use crate::billing::{AmountOverflow, CreditNoteBalance};
use crate::query::{contains_text, Identified, Range, SortKey};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::cmp::Ordering;
use validator::Validate;

pub const DUPLICATE_DOCUMENT_NR: &str =
    "Es existiert bereits eine Gutschrift mit dieser Dokument Nr.";

/// Category directory for stored credit-note documents.
pub const CREDIT_NOTE_DOCUMENTS: &str = "Gutschriften";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CreditNote {
    pub id: i64,
    pub own_firm_id: i64,
    pub customer_id: i64,
    pub customer_name: String,
    pub document_nr: String,
    pub advice_nr: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub balance: CreditNoteBalance,
    pub creation_date: NaiveDate,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub document_path: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl Identified for CreditNote {
    fn id(&self) -> i64 {
        self.id
    }
}

impl CreditNote {
    /// Applies descriptive fields and re-derives the balance when the gross
    /// amount or tax rate was supplied. Nothing changes when the new balance
    /// cannot be represented.
    pub fn apply_update(
        &mut self,
        patch: CreditNotePatch,
        customer_name: Option<String>,
        today: NaiveDate,
    ) -> Result<ChangeSet, AmountOverflow> {
        let mut balance = self.balance.clone();
        if patch.tax_rate.is_present() || patch.gross_amount.is_present() {
            balance.revalue(
                patch.gross_amount.as_ref().into_option().copied().unwrap_or(balance.gross_amount),
                patch.tax_rate.as_ref().into_option().copied().unwrap_or(balance.tax_rate),
                today,
            )?;
        }

        let mut changes = ChangeSet::new();
        changes.apply("document_nr", "Dokumentnummer", &mut self.document_nr, patch.document_nr);
        if let Patch::Present(customer_id) = patch.customer_id {
            let new_name = customer_name.unwrap_or_default();
            changes.record("customer_id", "Firmenname", self.customer_name.clone(), new_name.clone());
            self.customer_id = customer_id;
            self.customer_name = new_name;
        }
        changes.apply("creation_date", "Eingangsdatum", &mut self.creation_date, patch.creation_date);
        changes.apply("period_start", "Zeitraum-Start", &mut self.period_start, patch.period_start);
        changes.apply("period_end", "Zeitraum-Ende", &mut self.period_end, patch.period_end);

        let mut tax_rate = self.balance.tax_rate;
        let mut gross_amount = self.balance.gross_amount;
        changes.apply("tax_rate", "MwSt.", &mut tax_rate, patch.tax_rate);
        changes.apply("gross_amount", "Brutto", &mut gross_amount, patch.gross_amount);
        self.balance = balance;

        changes.apply("advice_nr", "Avis Nr.", &mut self.advice_nr, patch.advice_nr);
        Ok(changes)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCreditNote {
    pub own_firm_id: i64,
    pub customer_id: i64,
    #[validate(length(min = 1, max = 100))]
    pub document_nr: String,
    pub advice_nr: Option<String>,
    pub gross_amount: Decimal,
    pub tax_rate: Decimal,
    pub creation_date: NaiveDate,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
}

/// Insert-ready credit note with its opening balance.
#[derive(Debug, Clone)]
pub struct CreditNoteDraft {
    pub own_firm_id: i64,
    pub customer_id: i64,
    pub customer_name: String,
    pub document_nr: String,
    pub advice_nr: Option<String>,
    pub balance: CreditNoteBalance,
    pub creation_date: NaiveDate,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
}

impl CreditNoteDraft {
    pub fn new(request: NewCreditNote, customer_name: String) -> Result<Self, AmountOverflow> {
        Ok(Self {
            own_firm_id: request.own_firm_id,
            customer_id: request.customer_id,
            customer_name,
            document_nr: request.document_nr,
            advice_nr: request.advice_nr,
            balance: CreditNoteBalance::open(request.gross_amount, request.tax_rate)?,
            creation_date: request.creation_date,
            period_start: request.period_start,
            period_end: request.period_end,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CreditNotePatch {
    pub document_nr: Patch<String>,
    pub customer_id: Patch<i64>,
    pub creation_date: Patch<NaiveDate>,
    pub period_start: Patch<Option<NaiveDate>>,
    pub period_end: Patch<Option<NaiveDate>>,
    pub tax_rate: Patch<Decimal>,
    pub gross_amount: Patch<Decimal>,
    pub advice_nr: Patch<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CreditNotePayment {
    pub id: i64,
    pub credit_note_id: i64,
    #[serde(serialize_with = "serialize_cents")]
    pub amount: Decimal,
    pub date: NaiveDate,
    pub created_utc: DateTime<Utc>,
}

impl Identified for CreditNotePayment {
    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewPayment {
    pub amount: Decimal,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy)]
pub enum CreditNoteSort {
    AdviceNr,
    DocumentNr,
    Customer,
    OpenAmount,
}

impl SortKey for CreditNoteSort {
    type Record = CreditNote;

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "advice_nr" => Some(CreditNoteSort::AdviceNr),
            "document_nr" => Some(CreditNoteSort::DocumentNr),
            "customer" => Some(CreditNoteSort::Customer),
            "open_amount" => Some(CreditNoteSort::OpenAmount),
            _ => None,
        }
    }

    fn compare(self, a: &CreditNote, b: &CreditNote) -> Ordering {
        match self {
            CreditNoteSort::AdviceNr => a.advice_nr.cmp(&b.advice_nr),
            CreditNoteSort::DocumentNr => a.document_nr.cmp(&b.document_nr),
            CreditNoteSort::Customer => a.customer_name.cmp(&b.customer_name),
            CreditNoteSort::OpenAmount => a.balance.open_amount.cmp(&b.balance.open_amount),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum PaymentSort {
    Amount,
    Date,
}

impl SortKey for PaymentSort {
    type Record = CreditNotePayment;

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "amount" => Some(PaymentSort::Amount),
            "date" => Some(PaymentSort::Date),
            _ => None,
        }
    }

    fn compare(self, a: &CreditNotePayment, b: &CreditNotePayment) -> Ordering {
        match self {
            PaymentSort::Amount => a.amount.cmp(&b.amount),
            PaymentSort::Date => a.date.cmp(&b.date),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreditNoteFilter {
    pub customer_id: Option<i64>,
    pub advice_nr: Option<String>,
    pub document_nr: Option<String>,
    pub paid: Range<Decimal>,
    pub open: Range<Decimal>,
}

impl CreditNoteFilter {
    pub fn matches(&self, note: &CreditNote) -> bool {
        self.customer_id.map_or(true, |id| note.customer_id == id)
            && contains_text(note.advice_nr.as_deref().unwrap_or_default(), self.advice_nr.as_deref())
            && contains_text(&note.document_nr, self.document_nr.as_deref())
            && self.paid.contains(&note.balance.paid_amount)
            && self.open.contains(&note.balance.open_amount)
    }
}
