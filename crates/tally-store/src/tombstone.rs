// ABOUTME: Tombstone bookkeeping: marking entries deleted, finding the undo candidate, and clearing marks.
// ABOUTME: Pure functions over the decoded entry sequence; file I/O lives in the store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tally_core::Entry;

use crate::index::{self, OutOfBounds};

/// A tombstoned entry as listed in the trash view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedEntry {
    /// 1-based ordinal among tombstones, in file order.
    pub deleted_index: usize,
    pub position: usize,
    pub entry: Entry,
}

/// Tombstone the entry currently shown at `active_index`. Returns its
/// physical position.
pub fn mark_deleted(
    entries: &mut [Entry],
    active_index: usize,
    now: DateTime<Utc>,
) -> Result<usize, OutOfBounds> {
    let position = index::resolve_active(entries, active_index)?;
    entries[position].deleted_at = Some(now);
    Ok(position)
}

/// Position of the tombstone with the latest `deleted_at`. Ties go to the
/// later physical position.
pub fn most_recently_deleted(entries: &[Entry]) -> Option<usize> {
    entries
        .iter()
        .enumerate()
        .filter_map(|(position, entry)| entry.deleted_at.map(|at| (at, position)))
        .max()
        .map(|(_, position)| position)
}

/// Clear the tombstone on `entry`. Returns false if it was not deleted.
pub fn clear_deleted(entry: &mut Entry) -> bool {
    entry.deleted_at.take().is_some()
}

pub fn list_deleted(entries: &[Entry]) -> Vec<DeletedEntry> {
    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.is_deleted())
        .enumerate()
        .map(|(i, (position, entry))| DeletedEntry {
            deleted_index: i + 1,
            position,
            entry: entry.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap()
    }

    fn entries(names: &[&str]) -> Vec<Entry> {
        names.iter().map(|n| Entry::new(base(), *n, 30)).collect()
    }

    #[test]
    fn mark_deleted_targets_visible_entry() {
        let mut log = entries(&["a", "b", "c"]);
        log[0].deleted_at = Some(base());

        let position = mark_deleted(&mut log, 1, base()).unwrap();

        assert_eq!(position, 1);
        assert!(log[1].is_deleted());
        assert!(log[2].is_active());
    }

    #[test]
    fn mark_deleted_out_of_bounds_changes_nothing() {
        let mut log = entries(&["a"]);
        let before = log.clone();

        let err = mark_deleted(&mut log, 2, base()).unwrap_err();

        assert_eq!(err.available, 1);
        assert_eq!(log, before);
    }

    #[test]
    fn most_recently_deleted_prefers_latest_timestamp() {
        let mut log = entries(&["a", "b", "c"]);
        log[0].deleted_at = Some(base() + Duration::minutes(5));
        log[2].deleted_at = Some(base());

        assert_eq!(most_recently_deleted(&log), Some(0));
    }

    #[test]
    fn most_recently_deleted_breaks_ties_by_position() {
        let mut log = entries(&["a", "b", "c"]);
        log[0].deleted_at = Some(base());
        log[1].deleted_at = Some(base());

        assert_eq!(most_recently_deleted(&log), Some(1));
    }

    #[test]
    fn most_recently_deleted_none_without_tombstones() {
        assert_eq!(most_recently_deleted(&entries(&["a", "b"])), None);
    }

    #[test]
    fn clear_deleted_reports_whether_it_changed() {
        let mut log = entries(&["a"]);
        assert!(!clear_deleted(&mut log[0]));

        log[0].deleted_at = Some(base());
        assert!(clear_deleted(&mut log[0]));
        assert!(log[0].is_active());
    }

    #[test]
    fn list_deleted_numbers_tombstones() {
        let mut log = entries(&["a", "b", "c", "d"]);
        log[1].deleted_at = Some(base());
        log[3].deleted_at = Some(base());

        let trash = list_deleted(&log);

        let view: Vec<(usize, usize)> = trash
            .iter()
            .map(|d| (d.deleted_index, d.position))
            .collect();
        assert_eq!(view, vec![(1, 1), (2, 3)]);
        assert_eq!(trash[1].entry.description, "d");
    }
}
