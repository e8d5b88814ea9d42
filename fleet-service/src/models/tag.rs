//! Coloured labels offered for tour-day statuses, contact labels and
//! offday kinds.

use crate::audit::{ChangeSet, Patch};
use crate::query::Identified;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError, ValidationErrors};

pub const DUPLICATE_TAG: &str = "Ein Tag mit diesem Namen existiert bereits.";
pub const TAG_IN_USE: &str = "Der Tag wird noch von geplanten Tagen verwendet.";

/// Offday tag whose days are booked against the holiday account.
pub const HOLIDAY_TAG: &str = "Urlaub";
pub const SICK_TAG: &str = "Krank";
pub const UNPAID_HOLIDAY_TAG: &str = "Unbezahlter Urlaub";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "tag_section", rename_all = "snake_case")]
pub enum TagSection {
    Tour,
    Contact,
    Offday,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: i64,
    pub section: TagSection,
    pub name: String,
    pub colour: String,
    pub created_utc: DateTime<Utc>,
}

impl Identified for Tag {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Tag {
    pub fn is_holiday(&self) -> bool {
        self.section == TagSection::Offday && self.name == HOLIDAY_TAG
    }

    pub fn apply_update(&mut self, patch: TagPatch) -> ChangeSet {
        let mut changes = ChangeSet::new();
        changes.apply("name", "Name", &mut self.name, patch.name);
        changes.apply("colour", "Farbe", &mut self.colour, patch.colour);
        changes
    }
}

/// `#rgb` or `#rrggbb`.
fn validate_colour(colour: &str) -> Result<(), ValidationError> {
    let digits = colour.strip_prefix('#').unwrap_or_default();
    let valid = matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("colour"))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTag {
    pub section: TagSection,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(custom(function = "validate_colour"))]
    pub colour: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TagPatch {
    pub name: Patch<String>,
    pub colour: Patch<String>,
}

impl Validate for TagPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Patch::Present(name) = &self.name {
            if name.trim().is_empty() || name.chars().count() > 100 {
                errors.add("name", ValidationError::new("length"));
            }
        }
        if let Patch::Present(colour) = &self.colour {
            if let Err(err) = validate_colour(colour) {
                errors.add("colour", err);
            }
        }
        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colours_are_hex_triplets() {
        assert!(validate_colour("#1a2b3c").is_ok());
        assert!(validate_colour("#fff").is_ok());
        assert!(validate_colour("1a2b3c").is_err());
        assert!(validate_colour("#12345g").is_err());
    }

    #[test]
    fn only_the_offday_holiday_tag_books_holidays() {
        let mut tag = Tag {
            id: 1,
            section: TagSection::Offday,
            name: HOLIDAY_TAG.into(),
            colour: "#00ff00".into(),
            created_utc: Utc::now(),
        };
        assert!(tag.is_holiday());
        tag.section = TagSection::Tour;
        assert!(!tag.is_holiday());
    }

    #[test]
    fn patch_rejects_bad_colour() {
        let patch = TagPatch {
            colour: Patch::Present("red".into()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
        assert!(TagPatch::default().validate().is_ok());
    }
}
