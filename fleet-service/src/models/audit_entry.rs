//! Audit log entries: one per administrative mutation.

use crate::audit::{narrate, ChangeSet, FieldChange};
use crate::query::{Identified, Range, SortKey};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use std::cmp::Ordering;

#[derive(Debug, Clone, FromRow)]
pub struct AuditEntry {
    pub id: i64,
    pub admin_id: Option<i64>,
    pub admin_name: String,
    pub own_firm_id: Option<i64>,
    pub summary: String,
    /// `None` for plain events, `Some` (possibly empty) for field updates.
    pub changes: Option<Json<Vec<FieldChange>>>,
    pub recorded_utc: DateTime<Utc>,
}

impl AuditEntry {
    pub fn message(&self) -> String {
        narrate(&self.summary, self.changes.as_ref().map(|c| c.0.as_slice()))
    }
}

impl Identified for AuditEntry {
    fn id(&self) -> i64 {
        self.id
    }
}

/// Audit row ready to insert.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub admin_id: Option<i64>,
    pub admin_name: String,
    pub own_firm_id: Option<i64>,
    pub summary: String,
    pub changes: Option<Vec<FieldChange>>,
}

impl NewAuditEntry {
    pub fn event(summary: impl Into<String>) -> Self {
        Self {
            admin_id: None,
            admin_name: String::new(),
            own_firm_id: None,
            summary: summary.into(),
            changes: None,
        }
    }

    pub fn mutation(summary: impl Into<String>, changes: ChangeSet) -> Self {
        Self {
            changes: Some(changes.into_changes()),
            ..Self::event(summary)
        }
    }
}

/// What the audit endpoint returns.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntryView {
    pub id: i64,
    pub admin_id: Option<i64>,
    pub admin_name: String,
    pub own_firm_id: Option<i64>,
    pub message: String,
    pub changes: Option<Vec<FieldChange>>,
    pub recorded_utc: DateTime<Utc>,
}

impl From<AuditEntry> for AuditEntryView {
    fn from(entry: AuditEntry) -> Self {
        Self {
            message: entry.message(),
            id: entry.id,
            admin_id: entry.admin_id,
            admin_name: entry.admin_name,
            own_firm_id: entry.own_firm_id,
            changes: entry.changes.map(|c| c.0),
            recorded_utc: entry.recorded_utc,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum AuditSort {
    Admin,
    Date,
}

impl SortKey for AuditSort {
    type Record = AuditEntry;

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "admin" => Some(AuditSort::Admin),
            "date" => Some(AuditSort::Date),
            _ => None,
        }
    }

    fn compare(self, a: &AuditEntry, b: &AuditEntry) -> Ordering {
        match self {
            AuditSort::Admin => a.admin_name.cmp(&b.admin_name),
            AuditSort::Date => a.recorded_utc.cmp(&b.recorded_utc),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub admin_id: Option<i64>,
    pub recorded: Range<DateTime<Utc>>,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.admin_id.map_or(true, |id| entry.admin_id == Some(id))
            && self.recorded.contains(&entry.recorded_utc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(changes: Option<Vec<FieldChange>>) -> AuditEntry {
        AuditEntry {
            id: 1,
            admin_id: Some(1),
            admin_name: "Admin".into(),
            own_firm_id: Some(1),
            summary: "Daten zum LKW HH-1 wurden verändert.".into(),
            changes: changes.map(Json),
            recorded_utc: Utc::now(),
        }
    }

    #[test]
    fn message_includes_rendered_changes() {
        let mut changes = ChangeSet::new();
        changes.record("model", "Modell", "TGX", "TGS");
        let view = AuditEntryView::from(entry(Some(changes.into_changes())));
        assert_eq!(
            view.message,
            "Daten zum LKW HH-1 wurden verändert. Veränderungen: Modell: TGX => TGS; "
        );
    }

    #[test]
    fn event_has_no_change_list() {
        let view = AuditEntryView::from(entry(None));
        assert_eq!(view.message, "Daten zum LKW HH-1 wurden verändert.");
        assert!(view.changes.is_none());
    }
}
