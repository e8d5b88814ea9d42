//! Structured change records for the audit log.

use super::patch::Patch;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One field mutation, kept structured until presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub label: String,
    pub old: String,
    pub new: String,
}

impl FieldChange {
    pub fn render(&self) -> String {
        format!("{}: {} => {}; ", self.label, self.old, self.new)
    }
}

/// How a value reads in the audit narration.
pub trait AuditValue {
    fn audit_value(&self) -> String;
}

impl AuditValue for String {
    fn audit_value(&self) -> String {
        self.clone()
    }
}

impl AuditValue for bool {
    fn audit_value(&self) -> String {
        let label = if *self { "Ja" } else { "Nein" };
        label.to_string()
    }
}

impl AuditValue for i32 {
    fn audit_value(&self) -> String {
        self.to_string()
    }
}

impl AuditValue for i64 {
    fn audit_value(&self) -> String {
        self.to_string()
    }
}

impl AuditValue for Decimal {
    fn audit_value(&self) -> String {
        self.to_string()
    }
}

impl AuditValue for NaiveDate {
    fn audit_value(&self) -> String {
        self.format("%d.%m.%Y").to_string()
    }
}

impl<T: AuditValue> AuditValue for Option<T> {
    fn audit_value(&self) -> String {
        self.as_ref().map(AuditValue::audit_value).unwrap_or_default()
    }
}

impl<T: AuditValue> AuditValue for Vec<T> {
    fn audit_value(&self) -> String {
        self.iter()
            .map(AuditValue::audit_value)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Ordered list of changes produced by one update call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet(Vec<FieldChange>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a patch to `target`, recording the change when the field was
    /// supplied.
    pub fn apply<T>(&mut self, field: &str, label: &str, target: &mut T, patch: Patch<T>)
    where
        T: AuditValue,
    {
        self.apply_with(field, label, target, patch, AuditValue::audit_value);
    }

    /// Like [`ChangeSet::apply`] with a custom rendering of old and new values.
    pub fn apply_with<T, F>(
        &mut self,
        field: &str,
        label: &str,
        target: &mut T,
        patch: Patch<T>,
        render: F,
    ) where
        F: Fn(&T) -> String,
    {
        if let Patch::Present(value) = patch {
            let old = render(target);
            let new = render(&value);
            *target = value;
            self.record(field, label, old, new);
        }
    }

    pub fn record(
        &mut self,
        field: impl Into<String>,
        label: impl Into<String>,
        old: impl Into<String>,
        new: impl Into<String>,
    ) {
        self.0.push(FieldChange {
            field: field.into(),
            label: label.into(),
            old: old.into(),
            new: new.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.0.iter().any(|c| c.field == field)
    }

    pub fn changes(&self) -> &[FieldChange] {
        &self.0
    }

    pub fn into_changes(self) -> Vec<FieldChange> {
        self.0
    }

    pub fn render(&self) -> String {
        render_changes(&self.0)
    }
}

/// `"<Label>: <old> => <new>; "` for each change, in order.
pub fn render_changes(changes: &[FieldChange]) -> String {
    changes.iter().map(FieldChange::render).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_and_records_supplied_fields_in_order() {
        let mut plate = "HH-AB-1".to_string();
        let mut model = "Actros".to_string();
        let mut changes = ChangeSet::new();

        changes.apply("plate", "Kennzeichen", &mut plate, Patch::Present("HH-CD-2".into()));
        changes.apply("model", "Modell", &mut model, Patch::Absent);

        assert_eq!(plate, "HH-CD-2");
        assert_eq!(model, "Actros");
        assert_eq!(changes.render(), "Kennzeichen: HH-AB-1 => HH-CD-2; ");
    }

    #[test]
    fn unchanged_value_is_still_recorded() {
        let mut paid = false;
        let mut changes = ChangeSet::new();
        changes.apply("paid", "Bezahlt", &mut paid, Patch::Present(false));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.render(), "Bezahlt: Nein => Nein; ");
    }

    #[test]
    fn dates_and_empty_options_render_plainly() {
        let mut start: Option<NaiveDate> = None;
        let mut changes = ChangeSet::new();
        changes.apply(
            "start",
            "Zeitraum-Start",
            &mut start,
            Patch::Present(NaiveDate::from_ymd_opt(2024, 1, 5)),
        );
        assert_eq!(changes.render(), "Zeitraum-Start:  => 05.01.2024; ");
    }

    #[test]
    fn custom_rendering() {
        let mut paid = false;
        let mut changes = ChangeSet::new();
        changes.apply_with("paid", "Zahlungsstatus", &mut paid, Patch::Present(true), |p| {
            let label = if *p { "Bezahlt" } else { "Zahlung Läuft" };
            label.to_string()
        });
        assert_eq!(changes.render(), "Zahlungsstatus: Zahlung Läuft => Bezahlt; ");
    }

    #[test]
    fn empty_set_renders_empty_string() {
        assert_eq!(ChangeSet::new().render(), "");
    }
}
