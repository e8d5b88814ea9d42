//! Workers (drivers and staff) employed by an owning firm.

use crate::audit::{ChangeSet, Patch};
use crate::billing::money::serialize_cents;
use crate::query::{contains_text, Identified, SortKey};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::cmp::Ordering;
use validator::Validate;

pub const DUPLICATE_WORKER_NR: &str =
    "Es existiert bereits ein Mitarbeiter mit dieser Personalnummer";

/// Position title that marks a worker as a driver.
pub const DRIVER_POSITION: &str = "Fahrer";

pub const DEFAULT_HOLIDAYS: i32 = 25;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Worker {
    pub id: i64,
    pub own_firm_id: i64,
    pub worker_nr: String,
    pub name: String,
    pub position: String,
    pub is_driver: bool,
    #[serde(serialize_with = "serialize_cents")]
    pub salary: Decimal,
    #[serde(serialize_with = "serialize_cents")]
    pub daily_expense: Decimal,
    pub holidays: i32,
    pub remaining_holidays: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub quit_date: Option<NaiveDate>,
    pub note: String,
    pub created_utc: DateTime<Utc>,
}

impl Worker {
    pub fn has_quit(&self) -> bool {
        self.quit_date.is_some()
    }

    /// Remaining holidays of the current year's account, falling back to the
    /// full entitlement while no account exists.
    pub fn holidays_left(&self) -> i32 {
        self.remaining_holidays.unwrap_or(self.holidays)
    }

    pub fn apply_update(&mut self, patch: WorkerPatch) -> ChangeSet {
        let mut changes = ChangeSet::new();
        changes.apply("worker_nr", "Personalnummer", &mut self.worker_nr, patch.worker_nr);
        changes.apply("name", "Name", &mut self.name, patch.name);
        changes.apply("position", "Position", &mut self.position, patch.position);
        changes.apply("start_date", "Arbeitsbeginn", &mut self.start_date, patch.start_date);
        changes.apply("quit_date", "Kündigung", &mut self.quit_date, patch.quit_date);
        changes.apply("salary", "Lohn", &mut self.salary, patch.salary);
        changes.apply("daily_expense", "Spesen", &mut self.daily_expense, patch.daily_expense);
        changes.apply("holidays", "Urlaubstage", &mut self.holidays, patch.holidays);
        changes.apply(
            "remaining_holidays",
            "Resturlaub",
            &mut self.remaining_holidays,
            patch.remaining_holidays,
        );
        changes.apply("note", "Notizen", &mut self.note, patch.note);
        self.is_driver = is_driver_position(&self.position);
        changes
    }
}

impl Identified for Worker {
    fn id(&self) -> i64 {
        self.id
    }
}

pub fn is_driver_position(position: &str) -> bool {
    position == DRIVER_POSITION
}

fn default_holidays() -> i32 {
    DEFAULT_HOLIDAYS
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewWorker {
    pub own_firm_id: i64,
    #[validate(length(min = 1, max = 50))]
    pub worker_nr: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub salary: Decimal,
    #[serde(default)]
    pub daily_expense: Decimal,
    #[serde(default = "default_holidays")]
    #[validate(range(min = 0, max = 366))]
    pub holidays: i32,
    pub remaining_holidays: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub quit_date: Option<NaiveDate>,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct WorkerPatch {
    pub worker_nr: Patch<String>,
    pub name: Patch<String>,
    pub position: Patch<String>,
    pub start_date: Patch<Option<NaiveDate>>,
    pub quit_date: Patch<Option<NaiveDate>>,
    pub salary: Patch<Decimal>,
    pub daily_expense: Patch<Decimal>,
    pub holidays: Patch<i32>,
    pub remaining_holidays: Patch<Option<i32>>,
    pub note: Patch<String>,
}

#[derive(Debug, Clone, Copy)]
pub enum WorkerSort {
    Name,
    WorkerNr,
    Holidays,
    RemainingHolidays,
    Salary,
    DailyExpense,
}

impl SortKey for WorkerSort {
    type Record = Worker;

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "name" => Some(WorkerSort::Name),
            "worker_nr" => Some(WorkerSort::WorkerNr),
            "holidays" => Some(WorkerSort::Holidays),
            "remaining_holidays" => Some(WorkerSort::RemainingHolidays),
            "salary" => Some(WorkerSort::Salary),
            "daily_expense" => Some(WorkerSort::DailyExpense),
            _ => None,
        }
    }

    fn compare(self, a: &Worker, b: &Worker) -> Ordering {
        match self {
            WorkerSort::Name => a.name.cmp(&b.name),
            WorkerSort::WorkerNr => a.worker_nr.cmp(&b.worker_nr),
            WorkerSort::Holidays => a.holidays.cmp(&b.holidays),
            WorkerSort::RemainingHolidays => a.holidays_left().cmp(&b.holidays_left()),
            WorkerSort::Salary => a.salary.cmp(&b.salary),
            WorkerSort::DailyExpense => a.daily_expense.cmp(&b.daily_expense),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkerFilter {
    pub include_quit: bool,
    pub drivers_only: bool,
    pub name: Option<String>,
}

impl WorkerFilter {
    pub fn matches(&self, worker: &Worker) -> bool {
        (self.include_quit || !worker.has_quit())
            && (!self.drivers_only || worker.is_driver)
            && contains_text(&worker.name, self.name.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker() -> Worker {
        Worker {
            id: 1,
            own_firm_id: 1,
            worker_nr: "P-100".into(),
            name: "Jan Kowalski".into(),
            position: "Lager".into(),
            is_driver: false,
            salary: Decimal::new(250000, 2),
            daily_expense: Decimal::new(28, 0),
            holidays: 25,
            remaining_holidays: None,
            start_date: None,
            quit_date: None,
            note: String::new(),
            created_utc: Utc::now(),
        }
    }

    #[test]
    fn becoming_a_driver_follows_position() {
        let mut worker = worker();
        let changes = worker.apply_update(WorkerPatch {
            position: Patch::Present(DRIVER_POSITION.to_string()),
            ..Default::default()
        });
        assert!(worker.is_driver);
        assert_eq!(changes.render(), "Position: Lager => Fahrer; ");
    }

    #[test]
    fn quit_date_can_be_cleared() {
        let mut worker = worker();
        worker.quit_date = NaiveDate::from_ymd_opt(2024, 6, 30);
        let changes = worker.apply_update(WorkerPatch {
            quit_date: Patch::Present(None),
            ..Default::default()
        });
        assert!(!worker.has_quit());
        assert_eq!(changes.render(), "Kündigung: 30.06.2024 => ; ");
    }

    #[test]
    fn filter_hides_quit_workers_by_default() {
        let mut quit = worker();
        quit.quit_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert!(!WorkerFilter::default().matches(&quit));
        assert!(WorkerFilter { include_quit: true, ..Default::default() }.matches(&quit));
    }

    #[test]
    fn remaining_holidays_fall_back_to_entitlement() {
        let mut worker = worker();
        assert_eq!(worker.holidays_left(), 25);
        worker.remaining_holidays = Some(3);
        assert_eq!(worker.holidays_left(), 3);
    }
}
