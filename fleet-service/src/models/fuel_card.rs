//! Fuel cards and who held them when.

use crate::audit::{ChangeSet, Patch};
use crate::query::{contains_text, Identified, SortKey};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::cmp::Ordering;
use validator::Validate;

pub const DUPLICATE_CARD_NR: &str = "Es existiert bereits eine Tankkarte mit dieser Kartennummer.";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FuelCard {
    pub id: i64,
    pub own_firm_id: i64,
    pub provider: String,
    pub card_nr: String,
    pub holder_id: Option<i64>,
    pub is_active: bool,
    pub notes: String,
    pub created_utc: DateTime<Utc>,
}

impl Identified for FuelCard {
    fn id(&self) -> i64 {
        self.id
    }
}

fn status_label(active: &bool) -> String {
    let label = if *active { "Aktiv" } else { "Inaktiv" };
    label.to_string()
}

impl FuelCard {
    pub fn apply_update(&mut self, patch: FuelCardPatch) -> ChangeSet {
        let mut changes = ChangeSet::new();
        changes.apply("card_nr", "Kartennummer", &mut self.card_nr, patch.card_nr);
        changes.apply("provider", "Anbieter", &mut self.provider, patch.provider);
        changes.apply_with("is_active", "Status", &mut self.is_active, patch.is_active, status_label);
        changes.apply("notes", "Notizen", &mut self.notes, patch.notes);
        changes
    }
}

fn active_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewFuelCard {
    pub own_firm_id: i64,
    #[validate(length(min = 1, max = 100))]
    pub card_nr: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct FuelCardPatch {
    pub card_nr: Patch<String>,
    pub provider: Patch<String>,
    pub is_active: Patch<bool>,
    pub notes: Patch<String>,
}

/// One period a worker held the card.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FuelCardHandover {
    pub id: i64,
    pub fuel_card_id: i64,
    pub worker_id: i64,
    pub received_date: NaiveDate,
    pub returned_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewHandover {
    pub worker_id: i64,
    pub received_date: NaiveDate,
    pub returned_date: Option<NaiveDate>,
}

/// Index of the handover to close when the card changes hands: the one with
/// the latest received date.
pub fn latest_handover(handovers: &[FuelCardHandover]) -> Option<usize> {
    handovers
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            a.received_date
                .cmp(&b.received_date)
                .then(a.id.cmp(&b.id))
        })
        .map(|(index, _)| index)
}

#[derive(Debug, Clone, Copy)]
pub enum FuelCardSort {
    CardNr,
    Provider,
    Holder,
}

impl SortKey for FuelCardSort {
    type Record = FuelCard;

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "card_nr" => Some(FuelCardSort::CardNr),
            "provider" => Some(FuelCardSort::Provider),
            "holder" => Some(FuelCardSort::Holder),
            _ => None,
        }
    }

    fn compare(self, a: &FuelCard, b: &FuelCard) -> Ordering {
        match self {
            FuelCardSort::CardNr => a.card_nr.cmp(&b.card_nr),
            FuelCardSort::Provider => a.provider.cmp(&b.provider),
            FuelCardSort::Holder => a.holder_id.cmp(&b.holder_id),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FuelCardFilter {
    pub provider: Option<String>,
    pub holder_id: Option<i64>,
    pub active_only: bool,
}

impl FuelCardFilter {
    pub fn matches(&self, card: &FuelCard) -> bool {
        contains_text(&card.provider, self.provider.as_deref())
            && self.holder_id.map_or(true, |id| card.holder_id == Some(id))
            && (!self.active_only || card.is_active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handover(id: i64, day: u32) -> FuelCardHandover {
        FuelCardHandover {
            id,
            fuel_card_id: 1,
            worker_id: id,
            received_date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            returned_date: None,
        }
    }

    #[test]
    fn latest_handover_is_by_received_date() {
        let handovers = vec![handover(1, 10), handover(2, 3), handover(3, 7)];
        assert_eq!(latest_handover(&handovers), Some(0));
        assert_eq!(latest_handover(&[]), None);
    }

    #[test]
    fn status_change_uses_labels() {
        let mut card = FuelCard {
            id: 1,
            own_firm_id: 1,
            provider: "DKV".into(),
            card_nr: "7001".into(),
            holder_id: None,
            is_active: true,
            notes: String::new(),
            created_utc: Utc::now(),
        };
        let changes = card.apply_update(FuelCardPatch {
            is_active: Patch::Present(false),
            ..Default::default()
        });
        assert!(!card.is_active);
        assert_eq!(changes.render(), "Status: Aktiv => Inaktiv; ");
    }
}
