//! Daily working times and the expense allowance paid for them.

use crate::billing::money::serialize_cents;
use crate::query::Identified;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkTime {
    pub id: i64,
    pub worker_id: i64,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub pause_minutes: i32,
    pub duration_minutes: i32,
    #[serde(serialize_with = "serialize_cents")]
    pub cost: Decimal,
    pub created_utc: DateTime<Utc>,
}

impl Identified for WorkTime {
    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewWorkTime {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    #[serde(default)]
    #[validate(range(min = 0, max = 1440))]
    pub pause_minutes: i32,
    /// Overrides the worker's daily expense for this day.
    pub daily_expense: Option<Decimal>,
}

/// One worker's day as it is stored; replaces any entry on the same date.
#[derive(Debug, Clone)]
pub struct WorkTimeEntry {
    pub worker_id: i64,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub pause_minutes: i32,
    pub duration_minutes: i32,
    pub cost: Decimal,
}

impl WorkTimeEntry {
    /// `None` when the pause leaves no working time or the shift ends
    /// before it starts.
    pub fn new(worker_id: i64, input: NewWorkTime, default_expense: Decimal) -> Option<Self> {
        let duration_minutes = worked_minutes(input.start, input.end, input.pause_minutes)?;
        Some(Self {
            worker_id,
            date: input.date,
            start: input.start,
            end: input.end,
            pause_minutes: input.pause_minutes,
            duration_minutes,
            cost: input.daily_expense.unwrap_or(default_expense),
        })
    }
}

/// New standard daily expense of a worker.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DailyExpenseChange {
    pub amount: Decimal,
}

pub fn worked_minutes(start: NaiveTime, end: NaiveTime, pause_minutes: i32) -> Option<i32> {
    let minutes = (end - start).num_minutes() - i64::from(pause_minutes);
    if minutes < 0 {
        None
    } else {
        i32::try_from(minutes).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn input(start: NaiveTime, end: NaiveTime, pause: i32) -> NewWorkTime {
        NewWorkTime {
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            start,
            end,
            pause_minutes: pause,
            daily_expense: None,
        }
    }

    #[test]
    fn duration_subtracts_the_pause() {
        assert_eq!(worked_minutes(time(6, 0), time(15, 30), 45), Some(525));
    }

    #[test]
    fn shifts_ending_before_they_start_are_rejected() {
        assert_eq!(worked_minutes(time(15, 0), time(6, 0), 0), None);
        assert_eq!(worked_minutes(time(6, 0), time(6, 30), 45), None);
    }

    #[test]
    fn cost_defaults_to_the_daily_expense() {
        let entry = WorkTimeEntry::new(3, input(time(6, 0), time(14, 0), 30), Decimal::new(28, 0))
            .unwrap();
        assert_eq!(entry.cost, Decimal::new(28, 0));
        assert_eq!(entry.duration_minutes, 450);

        let mut custom = input(time(6, 0), time(14, 0), 30);
        custom.daily_expense = Some(Decimal::new(1400, 2));
        let entry = WorkTimeEntry::new(3, custom, Decimal::new(28, 0)).unwrap();
        assert_eq!(entry.cost, Decimal::new(14, 0));
    }
}
