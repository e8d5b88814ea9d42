//! Meetings held with address book contacts.

use crate::audit::{ChangeSet, Patch};
use crate::query::Identified;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Meeting {
    pub id: i64,
    pub contact_id: i64,
    pub date: NaiveDate,
    pub notes: String,
    pub created_utc: DateTime<Utc>,
}

impl Identified for Meeting {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Meeting {
    pub fn apply_update(&mut self, patch: MeetingPatch) -> ChangeSet {
        let mut changes = ChangeSet::new();
        changes.apply("date", "Datum", &mut self.date, patch.date);
        changes.apply("notes", "Notizen", &mut self.notes, patch.notes);
        changes
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewMeeting {
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct MeetingPatch {
    pub date: Patch<NaiveDate>,
    pub notes: Patch<String>,
}
