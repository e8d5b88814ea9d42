//! Customer organizations invoiced by an owning firm.

use crate::audit::{ChangeSet, Patch};
use crate::query::{Identified, SortKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::cmp::Ordering;
use validator::Validate;

pub const DUPLICATE_CUSTOMER: &str = "Es existiert bereits ein Kunde mit diesem Namen.";
pub const CUSTOMER_IN_USE: &str =
    "Der Kunde wird noch von Rechnungen oder Gutschriften verwendet.";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub id: i64,
    pub own_firm_id: i64,
    pub name: String,
    pub vat_id: String,
    pub address: String,
    pub created_utc: DateTime<Utc>,
}

impl Identified for Customer {
    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCustomer {
    pub own_firm_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub vat_id: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CustomerPatch {
    pub name: Patch<String>,
    pub vat_id: Patch<String>,
    pub address: Patch<String>,
}

impl Customer {
    pub fn apply_update(&mut self, patch: CustomerPatch) -> ChangeSet {
        let mut changes = ChangeSet::new();
        changes.apply("name", "Name", &mut self.name, patch.name);
        changes.apply("vat_id", "USt-IdNr.", &mut self.vat_id, patch.vat_id);
        changes.apply("address", "Adresse", &mut self.address, patch.address);
        changes
    }
}

#[derive(Debug, Clone, Copy)]
pub enum CustomerSort {
    Name,
    Vat,
    Address,
}

impl SortKey for CustomerSort {
    type Record = Customer;

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "name" => Some(CustomerSort::Name),
            "vat" => Some(CustomerSort::Vat),
            "address" => Some(CustomerSort::Address),
            _ => None,
        }
    }

    fn compare(self, a: &Customer, b: &Customer) -> Ordering {
        match self {
            CustomerSort::Name => a.name.cmp(&b.name),
            CustomerSort::Vat => a.vat_id.cmp(&b.vat_id),
            CustomerSort::Address => a.address.cmp(&b.address),
        }
    }
}
