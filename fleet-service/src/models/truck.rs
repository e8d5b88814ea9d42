//! Trucks and how they were paid for.

use crate::audit::{AuditValue, ChangeSet, Patch};
use crate::billing::money::serialize_cents_opt;
use crate::query::{contains_text, Identified, SortKey};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::cmp::Ordering;
use validator::Validate;

pub const DUPLICATE_PLATE: &str = "Es existiert bereits ein LKW mit diesem Kennzeichen.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "truck_payment_method", rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Installments,
}

impl AuditValue for PaymentMethod {
    fn audit_value(&self) -> String {
        let label = match self {
            PaymentMethod::Cash => "Barzahlung",
            PaymentMethod::Installments => "Ratenzahlung",
        };
        label.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Truck {
    pub id: i64,
    pub own_firm_id: i64,
    pub plate: String,
    pub manufacturer: String,
    pub model: String,
    #[serde(serialize_with = "serialize_cents_opt")]
    pub price: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
    pub paid_day: Option<NaiveDate>,
    pub is_paid: bool,
    pub installment_months: Option<i32>,
    #[serde(serialize_with = "serialize_cents_opt")]
    pub monthly_installment: Option<Decimal>,
    pub installment_start: Option<NaiveDate>,
    pub installment_end: Option<NaiveDate>,
    pub created_utc: DateTime<Utc>,
}

impl Identified for Truck {
    fn id(&self) -> i64 {
        self.id
    }
}

fn paid_status(paid: &bool) -> String {
    let label = if *paid { "Bezahlt" } else { "Zahlung Läuft" };
    label.to_string()
}

impl Truck {
    pub fn apply_update(&mut self, patch: TruckPatch) -> ChangeSet {
        let mut changes = ChangeSet::new();
        changes.apply("plate", "Kennzeichen", &mut self.plate, patch.plate);
        changes.apply("manufacturer", "Marke", &mut self.manufacturer, patch.manufacturer);
        changes.apply("model", "Modell", &mut self.model, patch.model);
        changes
    }

    pub fn apply_payment_update(&mut self, patch: TruckPaymentPatch) -> ChangeSet {
        let mut changes = ChangeSet::new();
        changes.apply(
            "payment_method",
            "Zahlungsmethode",
            &mut self.payment_method,
            patch.payment_method,
        );
        changes.apply("price", "Preis", &mut self.price, patch.price);
        changes.apply(
            "installment_months",
            "Zeitraum",
            &mut self.installment_months,
            patch.installment_months,
        );
        changes.apply(
            "monthly_installment",
            "Ratenbetrag",
            &mut self.monthly_installment,
            patch.monthly_installment,
        );
        changes.apply_with("is_paid", "Zahlungsstatus", &mut self.is_paid, patch.is_paid, paid_status);
        changes.apply("paid_day", "Bezahltes Datum", &mut self.paid_day, patch.paid_day);
        changes.apply(
            "installment_start",
            "Anfangsdatum",
            &mut self.installment_start,
            patch.installment_start,
        );
        changes.apply(
            "installment_end",
            "Enddatum",
            &mut self.installment_end,
            patch.installment_end,
        );
        changes
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTruck {
    pub own_firm_id: i64,
    #[validate(length(min = 1, max = 20))]
    pub plate: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct TruckPatch {
    pub plate: Patch<String>,
    pub manufacturer: Patch<String>,
    pub model: Patch<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct TruckPaymentPatch {
    pub payment_method: Patch<Option<PaymentMethod>>,
    pub price: Patch<Option<Decimal>>,
    pub installment_months: Patch<Option<i32>>,
    pub monthly_installment: Patch<Option<Decimal>>,
    pub is_paid: Patch<bool>,
    pub paid_day: Patch<Option<NaiveDate>>,
    pub installment_start: Patch<Option<NaiveDate>>,
    pub installment_end: Patch<Option<NaiveDate>>,
}

#[derive(Debug, Clone, Copy)]
pub enum TruckSort {
    Plate,
    Manufacturer,
}

impl SortKey for TruckSort {
    type Record = Truck;

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "plate" => Some(TruckSort::Plate),
            "manufacturer" => Some(TruckSort::Manufacturer),
            _ => None,
        }
    }

    fn compare(self, a: &Truck, b: &Truck) -> Ordering {
        match self {
            TruckSort::Plate => a.plate.cmp(&b.plate),
            TruckSort::Manufacturer => a.manufacturer.cmp(&b.manufacturer),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TruckFilter {
    pub plate: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
}

impl TruckFilter {
    pub fn matches(&self, truck: &Truck) -> bool {
        contains_text(&truck.plate, self.plate.as_deref())
            && contains_text(&truck.manufacturer, self.manufacturer.as_deref())
            && contains_text(&truck.model, self.model.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn truck() -> Truck {
        Truck {
            id: 7,
            own_firm_id: 1,
            plate: "HH-AB-123".into(),
            manufacturer: "MAN".into(),
            model: "TGX".into(),
            price: None,
            payment_method: None,
            paid_day: None,
            is_paid: false,
            installment_months: None,
            monthly_installment: None,
            installment_start: None,
            installment_end: None,
            created_utc: Utc::now(),
        }
    }

    #[test]
    fn plate_change_is_narrated() {
        let mut truck = truck();
        let changes = truck.apply_update(TruckPatch {
            plate: Patch::Present("HH-CD-456".into()),
            ..Default::default()
        });
        assert_eq!(truck.plate, "HH-CD-456");
        assert_eq!(changes.render(), "Kennzeichen: HH-AB-123 => HH-CD-456; ");
    }

    #[test]
    fn payment_status_false_is_applied() {
        let mut truck = truck();
        truck.is_paid = true;
        let changes = truck.apply_payment_update(TruckPaymentPatch {
            is_paid: Patch::Present(false),
            payment_method: Patch::Present(Some(PaymentMethod::Installments)),
            ..Default::default()
        });
        assert!(!truck.is_paid);
        assert_eq!(
            changes.render(),
            "Zahlungsmethode:  => Ratenzahlung; Zahlungsstatus: Bezahlt => Zahlung Läuft; "
        );
    }
}
