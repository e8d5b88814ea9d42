//! Year-scoped sequential document numbers (`NNN/YYYY`).

use std::fmt;
use std::str::FromStr;

/// A document number: sequence within (owning firm, year) plus the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentNumber {
    pub year: i32,
    pub sequence: i32,
}

impl DocumentNumber {
    pub fn new(sequence: i32, year: i32) -> Self {
        Self { year, sequence }
    }

    /// Number following the highest sequence already used in the scope.
    /// An empty scope starts at 1.
    pub fn following(last: Option<i32>, year: i32) -> Self {
        Self::new(last.unwrap_or(0) + 1, year)
    }

    /// Next number given every sequence already issued in the scope.
    pub fn next_in_scope<I>(existing: I, year: i32) -> Self
    where
        I: IntoIterator<Item = i32>,
    {
        Self::following(existing.into_iter().max(), year)
    }
}

impl fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}/{:04}", self.sequence, self.year)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid document number '{0}', expected NNN/YYYY")]
pub struct InvalidDocumentNumber(pub String);

impl FromStr for DocumentNumber {
    type Err = InvalidDocumentNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidDocumentNumber(s.to_string());
        let (seq, year) = s.split_once('/').ok_or_else(invalid)?;
        let sequence: i32 = seq.parse().map_err(|_| invalid())?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        if sequence < 1 || year.to_string().len() != 4 {
            return Err(invalid());
        }
        Ok(Self { year, sequence })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_three_digit_sequence() {
        assert_eq!(DocumentNumber::new(1, 2024).to_string(), "001/2024");
        assert_eq!(DocumentNumber::new(14, 2024).to_string(), "014/2024");
        assert_eq!(DocumentNumber::new(1234, 2024).to_string(), "1234/2024");
    }

    #[test]
    fn empty_scope_starts_at_one() {
        assert_eq!(DocumentNumber::next_in_scope(Vec::new(), 2025).sequence, 1);
    }

    #[test]
    fn next_is_max_plus_one() {
        let next = DocumentNumber::next_in_scope([3, 1, 7, 2], 2024);
        assert_eq!(next, DocumentNumber::new(8, 2024));
    }

    #[test]
    fn parses_formatted_number() {
        assert_eq!("014/2024".parse(), Ok(DocumentNumber::new(14, 2024)));
        assert!("14-2024".parse::<DocumentNumber>().is_err());
        assert!("000/2024".parse::<DocumentNumber>().is_err());
        assert!("001/24".parse::<DocumentNumber>().is_err());
    }

    #[test]
    fn orders_by_year_then_sequence() {
        assert!(DocumentNumber::new(99, 2023) < DocumentNumber::new(1, 2024));
        assert!(DocumentNumber::new(2, 2024) < DocumentNumber::new(10, 2024));
    }
}
