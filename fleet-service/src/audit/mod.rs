//! Presence-aware updates and the change records they produce.

pub mod change;
pub mod patch;

pub use change::{render_changes, AuditValue, ChangeSet, FieldChange};
pub use patch::Patch;

/// Joins the summary sentence with the rendered change body.
pub fn narrate(summary: &str, changes: Option<&[FieldChange]>) -> String {
    match changes {
        Some(changes) => format!("{} Veränderungen: {}", summary, render_changes(changes)),
        None => summary.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_event_is_summary_only() {
        assert_eq!(narrate("LKW HH-1 wurde gelöscht.", None), "LKW HH-1 wurde gelöscht.");
    }

    #[test]
    fn mutation_with_no_changes_has_empty_body() {
        assert_eq!(
            narrate("Daten zum LKW HH-1 wurden verändert.", Some(&[])),
            "Daten zum LKW HH-1 wurden verändert. Veränderungen: "
        );
    }
}
