// ABOUTME: Translates user-facing 1-based active indices to physical log positions and back.
// ABOUTME: Active indices are derived on every read by counting non-tombstoned entries in file order.

use tally_core::{Entry, IndexedEntry};
use thiserror::Error;

/// An index or position that does not address any entry right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("index {requested} is out of bounds ({available} available)")]
pub struct OutOfBounds {
    pub requested: usize,
    pub available: usize,
}

/// Resolve a 1-based active index to the physical position of the entry
/// the user currently sees there.
pub fn resolve_active(entries: &[Entry], active_index: usize) -> Result<usize, OutOfBounds> {
    resolve_nth(entries, active_index, Entry::is_active)
}

/// Resolve a 1-based index among tombstoned entries (the trash view) to a
/// physical position.
pub fn resolve_deleted(entries: &[Entry], deleted_index: usize) -> Result<usize, OutOfBounds> {
    resolve_nth(entries, deleted_index, Entry::is_deleted)
}

/// Check a raw 0-based physical position against the full decoded log.
pub fn check_position(entries: &[Entry], position: usize) -> Result<usize, OutOfBounds> {
    if position < entries.len() {
        Ok(position)
    } else {
        Err(OutOfBounds {
            requested: position,
            available: entries.len(),
        })
    }
}

/// The active index of the entry at `position`, or `None` if it is a
/// tombstone or past the end.
pub fn active_index_of(entries: &[Entry], position: usize) -> Option<usize> {
    let entry = entries.get(position)?;
    if !entry.is_active() {
        return None;
    }
    Some(entries[..position].iter().filter(|e| e.is_active()).count() + 1)
}

pub fn active_count(entries: &[Entry]) -> usize {
    entries.iter().filter(|e| e.is_active()).count()
}

/// Project every active entry with its active index and physical position.
pub fn index_active(entries: &[Entry]) -> Vec<IndexedEntry> {
    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.is_active())
        .enumerate()
        .map(|(i, (position, entry))| IndexedEntry {
            active_index: i + 1,
            position,
            entry: entry.clone(),
        })
        .collect()
}

fn resolve_nth(
    entries: &[Entry],
    wanted: usize,
    counts: impl Fn(&Entry) -> bool,
) -> Result<usize, OutOfBounds> {
    if wanted >= 1 {
        let mut seen = 0;
        for (position, entry) in entries.iter().enumerate() {
            if counts(entry) {
                seen += 1;
                if seen == wanted {
                    return Ok(position);
                }
            }
        }
    }

    Err(OutOfBounds {
        requested: wanted,
        available: entries.iter().filter(|&e| counts(e)).count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn log(layout: &[(&str, bool)]) -> Vec<Entry> {
        layout
            .iter()
            .map(|(name, deleted)| {
                let mut e = Entry::new(Utc::now(), *name, 10);
                if *deleted {
                    e.deleted_at = Some(Utc::now());
                }
                e
            })
            .collect()
    }

    #[test]
    fn resolve_skips_tombstones() {
        let entries = log(&[("a", false), ("b", true), ("c", false), ("d", false)]);

        assert_eq!(resolve_active(&entries, 1), Ok(0));
        assert_eq!(resolve_active(&entries, 2), Ok(2));
        assert_eq!(resolve_active(&entries, 3), Ok(3));
    }

    #[test]
    fn resolve_out_of_bounds_reports_active_count() {
        let entries = log(&[("a", false), ("b", true), ("c", false)]);

        assert_eq!(
            resolve_active(&entries, 3),
            Err(OutOfBounds {
                requested: 3,
                available: 2
            })
        );
        assert_eq!(
            resolve_active(&entries, 0),
            Err(OutOfBounds {
                requested: 0,
                available: 2
            })
        );
        assert_eq!(
            resolve_active(&[], 1),
            Err(OutOfBounds {
                requested: 1,
                available: 0
            })
        );
    }

    #[test]
    fn resolve_deleted_counts_only_tombstones() {
        let entries = log(&[("a", true), ("b", false), ("c", true)]);

        assert_eq!(resolve_deleted(&entries, 1), Ok(0));
        assert_eq!(resolve_deleted(&entries, 2), Ok(2));
        assert!(resolve_deleted(&entries, 3).is_err());
    }

    #[test]
    fn check_position_uses_full_length() {
        let entries = log(&[("a", false), ("b", true)]);

        assert_eq!(check_position(&entries, 1), Ok(1));
        assert_eq!(
            check_position(&entries, 2),
            Err(OutOfBounds {
                requested: 2,
                available: 2
            })
        );
    }

    #[test]
    fn active_index_of_inverts_resolve() {
        let entries = log(&[("a", true), ("b", false), ("c", true), ("d", false)]);

        for idx in 1..=active_count(&entries) {
            let position = resolve_active(&entries, idx).unwrap();
            assert_eq!(active_index_of(&entries, position), Some(idx));
        }
        assert_eq!(active_index_of(&entries, 0), None);
        assert_eq!(active_index_of(&entries, 9), None);
    }

    #[test]
    fn index_active_numbers_visible_entries() {
        let entries = log(&[("a", false), ("b", true), ("c", false)]);

        let indexed = index_active(&entries);

        let view: Vec<(usize, usize, &str)> = indexed
            .iter()
            .map(|ie| (ie.active_index, ie.position, ie.entry.description.as_str()))
            .collect();
        assert_eq!(view, vec![(1, 0, "a"), (2, 2, "c")]);
    }

    #[test]
    fn earlier_indices_are_stable_when_a_later_entry_is_deleted() {
        let mut entries = log(&[("a", false), ("b", false), ("c", false), ("d", false)]);

        let position = resolve_active(&entries, 3).unwrap();
        entries[position].deleted_at = Some(Utc::now());

        let names: Vec<String> = index_active(&entries)
            .into_iter()
            .map(|ie| ie.entry.description)
            .collect();
        assert_eq!(names, vec!["a", "b", "d"]);
    }
}
