//! Planned days off and the yearly holiday accounts they are booked against.

use super::tag::{HOLIDAY_TAG, SICK_TAG, UNPAID_HOLIDAY_TAG};
use crate::query::Identified;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Offday {
    pub id: i64,
    pub own_firm_id: i64,
    pub worker_id: i64,
    pub date: NaiveDate,
    pub tag_id: i64,
    /// Booked against the holiday account of the date's year.
    pub is_holiday: bool,
    pub notes: String,
    pub created_utc: DateTime<Utc>,
}

impl Identified for Offday {
    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PlanOffdays {
    #[validate(length(min = 1, max = 366))]
    pub dates: Vec<NaiveDate>,
    pub tag_id: i64,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RemoveOffdays {
    #[validate(length(min = 1))]
    pub ids: Vec<i64>,
}

/// Weekdays to plan with one tag; existing offdays on those dates are replaced.
#[derive(Debug, Clone)]
pub struct OffdayPlan {
    pub dates: Vec<NaiveDate>,
    pub tag_id: i64,
    pub is_holiday: bool,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct HolidayAccount {
    pub worker_id: i64,
    pub year: i32,
    pub used_days: i32,
    pub remaining_days: i32,
}

impl HolidayAccount {
    /// Fresh account holding the worker's full entitlement.
    pub fn opening(worker_id: i64, year: i32, entitlement: i32) -> Self {
        Self {
            worker_id,
            year,
            used_days: 0,
            remaining_days: entitlement,
        }
    }

    /// Books `days` holidays; negative values refund. The remainder may go
    /// below zero.
    pub fn book(&mut self, days: i32) {
        self.used_days += days;
        self.remaining_days -= days;
    }
}

/// Net holiday days per year after removing `released` and adding `booked`.
pub fn holiday_deltas<'a>(
    booked: impl IntoIterator<Item = &'a NaiveDate>,
    released: impl IntoIterator<Item = &'a Offday>,
) -> BTreeMap<i32, i32> {
    let mut deltas = BTreeMap::new();
    for date in booked {
        *deltas.entry(date.year()).or_insert(0) += 1;
    }
    for offday in released.into_iter().filter(|o| o.is_holiday) {
        *deltas.entry(offday.date.year()).or_insert(0) -= 1;
    }
    deltas.retain(|_, days| *days != 0);
    deltas
}

/// `dd.mm.yyyy<sep>Tag ; ` for each offday, as used in planning narrations.
pub fn list_offdays<'a>(
    offdays: impl IntoIterator<Item = (&'a NaiveDate, &'a str)>,
    separator: &str,
) -> String {
    offdays
        .into_iter()
        .map(|(date, tag)| format!("{}{}{} ; ", date.format("%d.%m.%Y"), separator, tag))
        .collect()
}

/// Dates of one month sorted into the kinds the holiday overview reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonthOffdays {
    pub holiday: Vec<NaiveDate>,
    pub sick: Vec<NaiveDate>,
    pub unpaid_holiday: Vec<NaiveDate>,
}

/// Groups `(date, tag name)` pairs by calendar month, January first. Tags
/// other than holiday, sick and unpaid holiday are left out.
pub fn offdays_by_month<'a>(
    offdays: impl IntoIterator<Item = (&'a NaiveDate, &'a str)>,
) -> [MonthOffdays; 12] {
    let mut months: [MonthOffdays; 12] = Default::default();
    for (date, tag) in offdays {
        let month = &mut months[date.month0() as usize];
        let bucket = match tag {
            HOLIDAY_TAG => &mut month.holiday,
            SICK_TAG => &mut month.sick,
            UNPAID_HOLIDAY_TAG => &mut month.unpaid_holiday,
            _ => continue,
        };
        bucket.push(*date);
    }
    for month in &mut months {
        month.holiday.sort();
        month.sick.sort();
        month.unpaid_holiday.sort();
    }
    months
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn offday(day: NaiveDate, is_holiday: bool) -> Offday {
        Offday {
            id: 1,
            own_firm_id: 1,
            worker_id: 2,
            date: day,
            tag_id: 3,
            is_holiday,
            notes: String::new(),
            created_utc: Utc::now(),
        }
    }

    #[test]
    fn booking_moves_days_from_remaining_to_used() {
        let mut account = HolidayAccount::opening(2, 2024, 25);
        account.book(3);
        assert_eq!((account.used_days, account.remaining_days), (3, 22));
        account.book(-1);
        assert_eq!((account.used_days, account.remaining_days), (2, 23));
    }

    #[test]
    fn replacing_a_holiday_with_a_holiday_is_neutral() {
        let day = date(2024, 7, 1);
        let deltas = holiday_deltas([&day], [&offday(day, true)]);
        assert!(deltas.is_empty());
    }

    #[test]
    fn deltas_are_kept_per_year() {
        let booked = [date(2024, 12, 30), date(2025, 1, 2), date(2025, 1, 3)];
        let released = [offday(date(2024, 12, 2), true), offday(date(2024, 12, 3), false)];
        let deltas = holiday_deltas(booked.iter(), released.iter());
        assert_eq!(deltas.get(&2024), None);
        assert_eq!(deltas.get(&2025), Some(&2));
    }

    #[test]
    fn offdays_are_listed_with_their_tags() {
        let first = date(2024, 7, 1);
        let second = date(2024, 7, 2);
        assert_eq!(
            list_offdays([(&first, "Urlaub"), (&second, "Krank")], " - "),
            "01.07.2024 - Urlaub ; 02.07.2024 - Krank ; "
        );
    }

    #[test]
    fn overview_groups_known_kinds_by_month() {
        let days = [date(2024, 3, 5), date(2024, 3, 4), date(2024, 11, 8), date(2024, 3, 6)];
        let months = offdays_by_month([
            (&days[0], "Urlaub"),
            (&days[1], "Urlaub"),
            (&days[2], "Krank"),
            (&days[3], "Fortbildung"),
        ]);
        assert_eq!(months[2].holiday, vec![days[1], days[0]]);
        assert!(months[2].sick.is_empty());
        assert_eq!(months[10].sick, vec![days[2]]);
        assert!(months.iter().all(|m| !m.holiday.contains(&days[3])));
    }
}
