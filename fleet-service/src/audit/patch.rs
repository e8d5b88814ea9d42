//! Presence-aware partial updates.
//!
//! A field left out of the request body is `Absent`; a field that is present
//! is applied even when it is `false`, `0` or `""`. Nullable columns use
//! `Patch<Option<T>>` so that an explicit `null` clears the value.

use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Absent,
    Present(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Patch::Present(_))
    }

    pub fn as_ref(&self) -> Patch<&T> {
        match self {
            Patch::Absent => Patch::Absent,
            Patch::Present(value) => Patch::Present(value),
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Patch::Absent => None,
            Patch::Present(value) => Some(value),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Patch<U> {
        match self {
            Patch::Absent => Patch::Absent,
            Patch::Present(value) => Patch::Present(f(value)),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Patch::Absent, Patch::Present)
    }
}

/// Only called when the key is in the body; missing keys fall back to
/// `Default` through `#[serde(default)]` on the containing struct.
impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Patch::Present)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Sample {
        name: Patch<String>,
        paid: Patch<bool>,
        note: Patch<Option<String>>,
    }

    #[test]
    fn missing_fields_are_absent() {
        let sample: Sample = serde_json::from_str("{}").unwrap();
        assert_eq!(sample.name, Patch::Absent);
        assert_eq!(sample.paid, Patch::Absent);
        assert_eq!(sample.note, Patch::Absent);
    }

    #[test]
    fn falsey_values_are_present() {
        let sample: Sample = serde_json::from_str(r#"{"name": "", "paid": false}"#).unwrap();
        assert_eq!(sample.name, Patch::Present(String::new()));
        assert_eq!(sample.paid, Patch::Present(false));
    }

    #[test]
    fn explicit_null_clears_nullable_field() {
        let sample: Sample = serde_json::from_str(r#"{"note": null}"#).unwrap();
        assert_eq!(sample.note, Patch::Present(None));
    }
}
