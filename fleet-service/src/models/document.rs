//! Expiring documents and appointments kept for workers and trucks.

use crate::audit::{ChangeSet, Patch};
use crate::query::{Identified, SortKey};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::cmp::Ordering;
use validator::Validate;

pub const WORKER_DOCUMENTS: &str = "Mitarbeiter_Dokumente";
pub const TRUCK_DOCUMENTS: &str = "LKW_Dokumente";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "document_owner", rename_all = "snake_case")]
pub enum DocumentOwner {
    Worker,
    Truck,
}

impl DocumentOwner {
    /// Storage category the attached files are filed under.
    pub fn category(self) -> &'static str {
        match self {
            DocumentOwner::Worker => WORKER_DOCUMENTS,
            DocumentOwner::Truck => TRUCK_DOCUMENTS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentOwner::Worker => "Mitarbeiter-Dokument",
            DocumentOwner::Truck => "LKW-Dokument",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: i64,
    pub own_firm_id: i64,
    pub owner: DocumentOwner,
    pub owner_id: i64,
    pub name: String,
    pub expiry_date: Option<NaiveDate>,
    pub done: bool,
    pub file_path: Option<String>,
    pub upload_date: Option<NaiveDate>,
    pub created_utc: DateTime<Utc>,
}

impl Identified for Document {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Document {
    /// An appointment still waiting on its expiry date.
    pub fn is_pending(&self) -> bool {
        !self.done && self.expiry_date.is_some()
    }

    pub fn apply_update(&mut self, patch: DocumentPatch) -> ChangeSet {
        let mut changes = ChangeSet::new();
        changes.apply("name", "Name", &mut self.name, patch.name);
        changes.apply("expiry_date", "Verfallsdatum", &mut self.expiry_date, patch.expiry_date);
        changes.apply("done", "Erledigt", &mut self.done, patch.done);
        changes
    }
}

/// Pending appointments first, earliest expiry first.
pub fn sort_by_expiry(documents: &mut [Document]) {
    documents.sort_by(|a, b| match (a.expiry_date, b.expiry_date) {
        (Some(x), Some(y)) => x.cmp(&y).then(a.id.cmp(&b.id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    });
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct NewDocument {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub expiry_date: Option<NaiveDate>,
    pub done: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct DocumentPatch {
    pub name: Patch<String>,
    pub expiry_date: Patch<Option<NaiveDate>>,
    pub done: Patch<bool>,
}

#[derive(Debug, Clone, Copy)]
pub enum DocumentSort {
    Name,
    ExpiryDate,
}

impl SortKey for DocumentSort {
    type Record = Document;

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "name" => Some(DocumentSort::Name),
            "expiry_date" => Some(DocumentSort::ExpiryDate),
            _ => None,
        }
    }

    fn compare(self, a: &Document, b: &Document) -> Ordering {
        match self {
            DocumentSort::Name => a.name.cmp(&b.name),
            DocumentSort::ExpiryDate => a.expiry_date.cmp(&b.expiry_date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(id: i64, expiry: Option<NaiveDate>) -> Document {
        Document {
            id,
            own_firm_id: 1,
            owner: DocumentOwner::Truck,
            owner_id: 4,
            name: format!("TÜV {}", id),
            expiry_date: expiry,
            done: false,
            file_path: None,
            upload_date: None,
            created_utc: Utc::now(),
        }
    }

    #[test]
    fn undated_documents_sort_last() {
        let mut documents = vec![
            document(1, None),
            document(2, NaiveDate::from_ymd_opt(2024, 9, 1)),
            document(3, NaiveDate::from_ymd_opt(2024, 2, 1)),
        ];
        sort_by_expiry(&mut documents);
        let ids: Vec<i64> = documents.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn done_documents_are_no_longer_pending() {
        let mut doc = document(1, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert!(doc.is_pending());
        let changes = doc.apply_update(DocumentPatch {
            done: Patch::Present(true),
            ..Default::default()
        });
        assert!(!doc.is_pending());
        assert_eq!(changes.render(), "Erledigt: Nein => Ja; ");
    }

    #[test]
    fn expiry_can_be_cleared() {
        let mut doc = document(1, NaiveDate::from_ymd_opt(2024, 2, 1));
        let changes = doc.apply_update(DocumentPatch {
            expiry_date: Patch::Present(None),
            ..Default::default()
        });
        assert_eq!(doc.expiry_date, None);
        assert_eq!(changes.render(), "Verfallsdatum: 01.02.2024 => ; ");
    }
}
