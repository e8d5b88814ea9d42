//! Recurring tours and the days they are driven.

use crate::audit::{ChangeSet, Patch};
use crate::query::{Identified, SortKey};
use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use validator::Validate;

pub const DUPLICATE_ROLLER_NR: &str = "Eine Tour mit dieser Roller Nr. existiert bereits.";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tour {
    pub id: i64,
    pub own_firm_id: i64,
    pub roller_nr: String,
    pub customer_id: Option<i64>,
    pub notes: String,
    pub truck_id: Option<i64>,
    pub driver_id: Option<i64>,
    pub created_utc: DateTime<Utc>,
}

impl Identified for Tour {
    fn id(&self) -> i64 {
        self.id
    }
}

/// Display names for the records a tour points at, used to narrate changes.
#[derive(Debug, Clone, Default)]
pub struct TourReferences {
    pub customers: HashMap<i64, String>,
    pub trucks: HashMap<i64, String>,
    pub drivers: HashMap<i64, String>,
}

fn describe(names: &HashMap<i64, String>, id: &Option<i64>) -> String {
    id.and_then(|id| names.get(&id).cloned()).unwrap_or_default()
}

impl Tour {
    pub fn apply_update(&mut self, patch: TourPatch, refs: &TourReferences) -> ChangeSet {
        let mut changes = ChangeSet::new();
        changes.apply("roller_nr", "Roller Nr.", &mut self.roller_nr, patch.roller_nr);
        changes.apply_with("customer_id", "Firma", &mut self.customer_id, patch.customer_id, |id| {
            describe(&refs.customers, id)
        });
        changes.apply("notes", "Notizen", &mut self.notes, patch.notes);
        changes.apply_with("driver_id", "Fahrer", &mut self.driver_id, patch.driver_id, |id| {
            describe(&refs.drivers, id)
        });
        changes.apply_with("truck_id", "LKW", &mut self.truck_id, patch.truck_id, |id| {
            describe(&refs.trucks, id)
        });
        changes
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTour {
    pub own_firm_id: i64,
    #[validate(length(min = 1, max = 50))]
    pub roller_nr: String,
    pub customer_id: Option<i64>,
    #[serde(default)]
    pub notes: String,
    pub truck_id: Option<i64>,
    pub driver_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct TourPatch {
    pub roller_nr: Patch<String>,
    pub customer_id: Patch<Option<i64>>,
    pub notes: Patch<String>,
    pub driver_id: Patch<Option<i64>>,
    pub truck_id: Patch<Option<i64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TourDay {
    pub id: i64,
    pub tour_id: i64,
    pub date: NaiveDate,
    pub status: String,
    pub driver_ids: Vec<i64>,
    pub truck_id: Option<i64>,
    pub note: String,
}

/// Days to schedule on a tour; weekend dates are skipped and an existing
/// day on the same date is replaced.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTourDays {
    #[validate(length(min = 1))]
    pub dates: Vec<NaiveDate>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub note: String,
    pub truck_id: Option<i64>,
    #[serde(default)]
    pub driver_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RemoveTourDays {
    #[validate(length(min = 1))]
    pub day_ids: Vec<i64>,
}

/// Distinct Monday-to-Friday dates in ascending order.
pub fn working_days(dates: &[NaiveDate]) -> Vec<NaiveDate> {
    dates
        .iter()
        .copied()
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// `dd.mm.yyyy, ` for each date, as used in tour-day narrations.
pub fn list_dates(dates: &[NaiveDate]) -> String {
    dates
        .iter()
        .map(|d| format!("{}, ", d.format("%d.%m.%Y")))
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub enum TourSort {
    RollerNr,
    Customer,
}

impl SortKey for TourSort {
    type Record = Tour;

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "roller_nr" => Some(TourSort::RollerNr),
            "customer" => Some(TourSort::Customer),
            _ => None,
        }
    }

    fn compare(self, a: &Tour, b: &Tour) -> Ordering {
        match self {
            TourSort::RollerNr => a.roller_nr.cmp(&b.roller_nr),
            TourSort::Customer => a.customer_id.cmp(&b.customer_id),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TourFilter {
    pub customer_id: Option<i64>,
}

impl TourFilter {
    pub fn matches(&self, tour: &Tour) -> bool {
        self.customer_id
            .map_or(true, |id| tour.customer_id == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekends_are_dropped_and_duplicates_merged() {
        // 2024-03-15 is a Friday.
        let days = working_days(&[
            date(2024, 3, 18),
            date(2024, 3, 16),
            date(2024, 3, 15),
            date(2024, 3, 17),
            date(2024, 3, 18),
        ]);
        assert_eq!(days, vec![date(2024, 3, 15), date(2024, 3, 18)]);
    }

    #[test]
    fn dates_are_listed_german_style() {
        assert_eq!(list_dates(&[date(2024, 3, 15)]), "15.03.2024, ");
    }

    #[test]
    fn reference_changes_use_display_names() {
        let mut tour = Tour {
            id: 1,
            own_firm_id: 1,
            roller_nr: "R-1".into(),
            customer_id: None,
            notes: String::new(),
            truck_id: Some(3),
            driver_id: None,
            created_utc: Utc::now(),
        };
        let refs = TourReferences {
            trucks: HashMap::from([(3, "HH-AB-1".to_string()), (4, "HH-CD-2".to_string())]),
            ..Default::default()
        };
        let changes = tour.apply_update(
            TourPatch {
                truck_id: Patch::Present(Some(4)),
                ..Default::default()
            },
            &refs,
        );
        assert_eq!(tour.truck_id, Some(4));
        assert_eq!(changes.render(), "LKW: HH-AB-1 => HH-CD-2; ");
    }
}
