//! Sorting and filtering of listings.
//!
//! Every listing has a fixed set of sortable fields. Anything outside that
//! set, including no field at all, falls back to newest first (id
//! descending).

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// `des` and `desc` sort descending; anything else ascending.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("des") | Some("desc") => Direction::Desc,
            _ => Direction::Asc,
        }
    }

    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }
}

/// Records with a stable, insertion-ordered id.
pub trait Identified {
    fn id(&self) -> i64;
}

/// A sortable field of `Record`.
pub trait SortKey: Copy {
    type Record;

    fn parse(raw: &str) -> Option<Self>;

    fn compare(self, a: &Self::Record, b: &Self::Record) -> Ordering;
}

/// Sort in place by an allow-listed field or fall back to id descending.
pub fn sort_records<K>(records: &mut [K::Record], sort: Option<&str>, direction: Option<&str>)
where
    K: SortKey,
    K::Record: Identified,
{
    match sort.and_then(K::parse) {
        Some(key) => {
            let direction = Direction::parse(direction);
            records.sort_by(|a, b| direction.apply(key.compare(a, b)).then(a.id().cmp(&b.id())));
        }
        None => records.sort_by(|a, b| b.id().cmp(&a.id())),
    }
}

/// Inclusive range with independently optional bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range<T> {
    pub from: Option<T>,
    pub to: Option<T>,
}

impl<T: PartialOrd> Range<T> {
    pub fn new(from: Option<T>, to: Option<T>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, value: &T) -> bool {
        self.from.as_ref().map_or(true, |from| value >= from)
            && self.to.as_ref().map_or(true, |to| value <= to)
    }
}

impl<T> Default for Range<T> {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
        }
    }
}

/// Case-sensitive substring match; no needle matches everything.
pub fn contains_text(haystack: &str, needle: Option<&str>) -> bool {
    needle.map_or(true, |needle| haystack.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Row {
        id: i64,
        name: &'static str,
    }

    impl Identified for Row {
        fn id(&self) -> i64 {
            self.id
        }
    }

    #[derive(Debug, Clone, Copy)]
    enum RowSort {
        Name,
    }

    impl SortKey for RowSort {
        type Record = Row;

        fn parse(raw: &str) -> Option<Self> {
            match raw {
                "name" => Some(RowSort::Name),
                _ => None,
            }
        }

        fn compare(self, a: &Row, b: &Row) -> Ordering {
            match self {
                RowSort::Name => a.name.cmp(b.name),
            }
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { id: 1, name: "b" },
            Row { id: 2, name: "a" },
            Row { id: 3, name: "c" },
        ]
    }

    fn ids(rows: &[Row]) -> Vec<i64> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn sorts_by_allowed_field() {
        let mut rows = rows();
        sort_records::<RowSort>(&mut rows, Some("name"), Some("asc"));
        assert_eq!(ids(&rows), vec![2, 1, 3]);

        sort_records::<RowSort>(&mut rows, Some("name"), Some("des"));
        assert_eq!(ids(&rows), vec![3, 1, 2]);
    }

    #[test]
    fn unknown_field_falls_back_to_newest_first() {
        let mut rows = rows();
        sort_records::<RowSort>(&mut rows, Some("salary"), Some("asc"));
        assert_eq!(ids(&rows), vec![3, 2, 1]);

        let mut rows = self::rows();
        sort_records::<RowSort>(&mut rows, None, None);
        assert_eq!(ids(&rows), vec![3, 2, 1]);
    }

    #[test]
    fn unknown_direction_is_ascending() {
        assert_eq!(Direction::parse(Some("sideways")), Direction::Asc);
        assert_eq!(Direction::parse(None), Direction::Asc);
        assert_eq!(Direction::parse(Some("desc")), Direction::Desc);
    }

    #[test]
    fn range_bounds_are_inclusive_and_optional() {
        let range = Range::new(Some(10), Some(20));
        assert!(range.contains(&10));
        assert!(range.contains(&20));
        assert!(!range.contains(&21));

        assert!(Range::new(None, Some(5)).contains(&-100));
        assert!(Range::new(Some(5), None).contains(&1_000));
        assert!(Range::<i32>::default().contains(&0));
    }

    #[test]
    fn substring_filter_is_case_sensitive() {
        assert!(contains_text("Spedition Müller", Some("Müller")));
        assert!(!contains_text("Spedition Müller", Some("müller")));
        assert!(contains_text("anything", None));
    }
}
