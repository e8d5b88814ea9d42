//! Address book entries.

use crate::audit::{ChangeSet, Patch};
use crate::query::{contains_text, Identified, SortKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::cmp::Ordering;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contact {
    pub id: i64,
    pub own_firm_id: i64,
    pub name: String,
    pub company: String,
    pub label: String,
    pub phone: String,
    pub fax: String,
    pub mail: String,
    pub address: String,
    pub note: String,
    pub created_utc: DateTime<Utc>,
}

impl Identified for Contact {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Contact {
    pub fn apply_update(&mut self, patch: ContactPatch) -> ChangeSet {
        let mut changes = ChangeSet::new();
        changes.apply("name", "Name", &mut self.name, patch.name);
        changes.apply("company", "Firma", &mut self.company, patch.company);
        changes.apply("label", "Etikett", &mut self.label, patch.label);
        changes.apply("phone", "Telefonnummer", &mut self.phone, patch.phone);
        changes.apply("fax", "Fax", &mut self.fax, patch.fax);
        changes.apply("mail", "E-Mail", &mut self.mail, patch.mail);
        changes.apply("address", "Adresse", &mut self.address, patch.address);
        changes.apply("note", "Notizen", &mut self.note, patch.note);
        changes
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct NewContact {
    #[validate(range(min = 1))]
    pub own_firm_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub company: String,
    pub label: String,
    pub phone: String,
    pub fax: String,
    pub mail: String,
    pub address: String,
    pub note: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ContactPatch {
    pub name: Patch<String>,
    pub company: Patch<String>,
    pub label: Patch<String>,
    pub phone: Patch<String>,
    pub fax: Patch<String>,
    pub mail: Patch<String>,
    pub address: Patch<String>,
    pub note: Patch<String>,
}

#[derive(Debug, Clone, Copy)]
pub enum ContactSort {
    Name,
    Company,
    Phone,
    Mail,
}

impl SortKey for ContactSort {
    type Record = Contact;

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "name" => Some(ContactSort::Name),
            "company" => Some(ContactSort::Company),
            "phone" => Some(ContactSort::Phone),
            "mail" => Some(ContactSort::Mail),
            _ => None,
        }
    }

    fn compare(self, a: &Contact, b: &Contact) -> Ordering {
        match self {
            ContactSort::Name => a.name.cmp(&b.name),
            ContactSort::Company => a.company.cmp(&b.company),
            ContactSort::Phone => a.phone.cmp(&b.phone),
            ContactSort::Mail => a.mail.cmp(&b.mail),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContactFilter {
    pub name: Option<String>,
    pub company: Option<String>,
}

impl ContactFilter {
    pub fn matches(&self, contact: &Contact) -> bool {
        contains_text(&contact.name, self.name.as_deref())
            && contains_text(&contact.company, self.company.as_deref())
    }
}
