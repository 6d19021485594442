use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-schedule set of skipped occurrence dates (schedule-local).
///
/// A date absent from the set is not skipped. Serializes as a sorted JSON
/// array of `YYYY-MM-DD` strings.
///
/// Skipping never removes an occurrence from expansion output — occurrences
/// on skipped dates are flagged instead, so the calendar can render them
/// struck-through and a later restore loses nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExceptionSet {
    skipped: BTreeSet<NaiveDate>,
}

impl ExceptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `date` skipped. Idempotent — skipping an already-skipped date is
    /// a no-op. Returns whether the set changed.
    pub fn skip(&mut self, date: NaiveDate) -> bool {
        self.skipped.insert(date)
    }

    /// Clear the skip mark on `date`. Idempotent — restoring a date that was
    /// never skipped is a no-op. Returns whether the set changed.
    pub fn restore(&mut self, date: NaiveDate) -> bool {
        self.skipped.remove(&date)
    }

    pub fn is_skipped(&self, date: NaiveDate) -> bool {
        self.skipped.contains(&date)
    }

    pub fn is_empty(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn len(&self) -> usize {
        self.skipped.len()
    }

    /// Skipped dates in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.skipped.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn skip_is_idempotent() {
        let mut set = ExceptionSet::new();
        assert!(set.skip(d("2024-03-05")));
        let after_first = set.clone();
        assert!(!set.skip(d("2024-03-05")));
        assert_eq!(set, after_first);
    }

    #[test]
    fn restore_without_skip_is_noop() {
        let mut set = ExceptionSet::new();
        assert!(!set.restore(d("2024-03-05")));
        assert!(set.is_empty());
    }

    #[test]
    fn skip_then_restore_returns_to_exact_prior_state() {
        let mut set = ExceptionSet::new();
        set.skip(d("2024-01-01"));
        let before = set.clone();

        set.skip(d("2024-03-05"));
        set.restore(d("2024-03-05"));
        assert_eq!(set, before);
    }

    #[test]
    fn serializes_as_date_array() {
        let mut set = ExceptionSet::new();
        set.skip(d("2024-03-05"));
        set.skip(d("2024-01-01"));
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["2024-01-01","2024-03-05"]"#);
        let back: ExceptionSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
