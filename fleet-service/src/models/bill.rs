//! Invoices ("Rechnungen") and their line items.

use crate::billing::money::serialize_cents;
use crate::billing::{line_sum, AmountOverflow, DocumentNumber, InvoiceTotals};
use crate::query::{Identified, Range, SortKey};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::cmp::Ordering;
use validator::Validate;

/// Category directory for stored invoice documents.
pub const BILL_DOCUMENTS: &str = "Rechnungen";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Bill {
    pub id: i64,
    pub own_firm_id: i64,
    pub customer_id: i64,
    pub customer_name: String,
    pub vat_id: String,
    pub address: String,
    pub number_seq: i32,
    pub number_year: i32,
    pub number: String,
    pub creation_date: NaiveDate,
    pub pay_start: Option<NaiveDate>,
    pub pay_end: Option<NaiveDate>,
    #[serde(serialize_with = "serialize_cents")]
    pub sum: Decimal,
    pub tax_rate: Decimal,
    #[serde(serialize_with = "serialize_cents")]
    pub total: Decimal,
    pub document_path: Option<String>,
    pub created_utc: DateTime<Utc>,
    #[sqlx(skip)]
    pub items: Vec<LineItem>,
}

impl Bill {
    pub fn document_number(&self) -> DocumentNumber {
        DocumentNumber::new(self.number_seq, self.number_year)
    }

    /// `Rechnung -- <firm> -- <number>.pdf`
    pub fn pdf_name(&self, own_firm_name: &str) -> String {
        format!("Rechnung -- {} -- {}.pdf", own_firm_name, self.number)
    }
}

impl Identified for Bill {
    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LineItem {
    pub id: i64,
    pub bill_id: i64,
    pub position: i32,
    pub description: String,
    pub quantity: Decimal,
    pub unit: String,
    #[serde(serialize_with = "serialize_cents")]
    pub unit_price: Decimal,
    #[serde(serialize_with = "serialize_cents")]
    pub line_sum: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LineItemInput {
    /// Printed position; defaults to the item's place in the list.
    #[validate(range(min = 1))]
    pub position: Option<i32>,
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub unit: String,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBillRequest {
    pub own_firm_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub customer_name: String,
    #[serde(default)]
    pub vat_id: String,
    #[serde(default)]
    pub address: String,
    pub creation_date: NaiveDate,
    pub pay_start: Option<NaiveDate>,
    pub pay_end: Option<NaiveDate>,
    pub tax_rate: Decimal,
    #[validate(length(min = 1), nested)]
    pub items: Vec<LineItemInput>,
}

/// A line item priced and positioned, waiting for its bill id.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItemDraft {
    pub position: i32,
    pub description: String,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub line_sum: Decimal,
}

/// Everything needed to insert a bill except its number, which the store
/// assigns while holding the (firm, year) scope.
#[derive(Debug, Clone)]
pub struct BillDraft {
    pub own_firm_id: i64,
    pub customer_id: i64,
    pub customer_name: String,
    pub vat_id: String,
    pub address: String,
    pub creation_date: NaiveDate,
    pub pay_start: Option<NaiveDate>,
    pub pay_end: Option<NaiveDate>,
    pub tax_rate: Decimal,
    pub sum: Decimal,
    pub total: Decimal,
    pub items: Vec<LineItemDraft>,
}

impl BillDraft {
    pub fn new(request: CreateBillRequest, customer_id: i64) -> Result<Self, AmountOverflow> {
        let totals = InvoiceTotals::from_lines(
            request.items.iter().map(|item| (item.quantity, item.unit_price)),
            request.tax_rate,
        )?;
        let mut items = request
            .items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                Ok(LineItemDraft {
                    position: item.position.unwrap_or(index as i32 + 1),
                    line_sum: line_sum(item.quantity, item.unit_price)?,
                    description: item.description,
                    quantity: item.quantity,
                    unit: item.unit,
                    unit_price: item.unit_price,
                })
            })
            .collect::<Result<Vec<_>, AmountOverflow>>()?;
        items.sort_by_key(|item| item.position);

        Ok(Self {
            own_firm_id: request.own_firm_id,
            customer_id,
            customer_name: request.customer_name,
            vat_id: request.vat_id,
            address: request.address,
            creation_date: request.creation_date,
            pay_start: request.pay_start,
            pay_end: request.pay_end,
            tax_rate: request.tax_rate,
            sum: totals.sum,
            total: totals.total,
            items,
        })
    }

    /// Numbering scope year.
    pub fn year(&self) -> i32 {
        self.creation_date.year()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum BillSort {
    Number,
    Customer,
    CreationDate,
    PayBy,
    Sum,
    Total,
}

impl SortKey for BillSort {
    type Record = Bill;

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "number" => Some(BillSort::Number),
            "customer" => Some(BillSort::Customer),
            "creation_date" => Some(BillSort::CreationDate),
            "pay_by" => Some(BillSort::PayBy),
            "sum" => Some(BillSort::Sum),
            "total" => Some(BillSort::Total),
            _ => None,
        }
    }

    fn compare(self, a: &Bill, b: &Bill) -> Ordering {
        match self {
            BillSort::Number => a.document_number().cmp(&b.document_number()),
            BillSort::Customer => a.customer_name.cmp(&b.customer_name),
            BillSort::CreationDate => a.creation_date.cmp(&b.creation_date),
            BillSort::PayBy => a.pay_end.cmp(&b.pay_end),
            BillSort::Sum => a.sum.cmp(&b.sum),
            BillSort::Total => a.total.cmp(&b.total),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BillFilter {
    pub customer_id: Option<i64>,
    pub sum: Range<Decimal>,
    pub total: Range<Decimal>,
    pub created: Range<NaiveDate>,
}

impl BillFilter {
    pub fn matches(&self, bill: &Bill) -> bool {
        self.customer_id.map_or(true, |id| bill.customer_id == id)
            && self.sum.contains(&bill.sum)
            && self.total.contains(&bill.total)
            && self.created.contains(&bill.creation_date)
    }
}
