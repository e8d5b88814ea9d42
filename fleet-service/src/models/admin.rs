//! Administrators and their access to owning organizations.

use crate::audit::{ChangeSet, Patch};
use crate::query::{Identified, SortKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::cmp::Ordering;
use uuid::Uuid;
use validator::Validate;

pub const DUPLICATE_USERNAME: &str = "Es existiert bereits ein Admin mit diesem Benutzernamen.";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub token: Uuid,
    pub is_superuser: bool,
    pub own_firm_ids: Vec<i64>,
    pub created_utc: DateTime<Utc>,
}

impl Admin {
    pub fn role(&self) -> &'static str {
        if self.is_superuser {
            "superuser"
        } else {
            "admin"
        }
    }

    pub fn can_access(&self, own_firm_id: i64) -> bool {
        self.is_superuser || self.own_firm_ids.contains(&own_firm_id)
    }

    /// Applies every field except the password, which is hashed by the caller.
    pub fn apply_update(&mut self, patch: AdminPatch) -> ChangeSet {
        let mut changes = ChangeSet::new();
        changes.apply("name", "Name", &mut self.name, patch.name);
        changes.apply("username", "Benutzername", &mut self.username, patch.username);
        changes.apply("is_superuser", "Superuser", &mut self.is_superuser, patch.is_superuser);
        changes.apply("own_firm_ids", "Firmen", &mut self.own_firm_ids, patch.own_firm_ids);
        changes
    }
}

impl Identified for Admin {
    fn id(&self) -> i64 {
        self.id
    }
}

/// Admin row ready to insert; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub username: String,
    pub name: String,
    pub password_hash: String,
    pub token: Uuid,
    pub is_superuser: bool,
    pub own_firm_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAdminRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub own_firm_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct AdminPatch {
    pub name: Patch<String>,
    pub username: Patch<String>,
    pub password: Patch<String>,
    pub is_superuser: Patch<bool>,
    pub own_firm_ids: Patch<Vec<i64>>,
}

#[derive(Debug, Clone, Copy)]
pub enum AdminSort {
    Name,
    Username,
}

impl SortKey for AdminSort {
    type Record = Admin;

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "name" => Some(AdminSort::Name),
            "username" => Some(AdminSort::Username),
            _ => None,
        }
    }

    fn compare(self, a: &Admin, b: &Admin) -> Ordering {
        match self {
            AdminSort::Name => a.name.cmp(&b.name),
            AdminSort::Username => a.username.cmp(&b.username),
        }
    }
}
