// ABOUTME: Compaction rules deciding which tombstoned entries are dropped from the log.
// ABOUTME: Explicit purges drop every tombstone; retention purges drop only expired ones.

use chrono::{DateTime, Duration, Utc};
use tally_core::Entry;

/// How long a tombstone stays recoverable before a retention purge drops it.
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

pub fn default_retention() -> Duration {
    Duration::days(DEFAULT_RETENTION_DAYS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeMode {
    /// User-requested: every tombstone goes, regardless of age.
    Explicit,
    /// Opportunistic: only tombstones older than the retention window.
    Retention,
}

pub fn is_eligible(
    entry: &Entry,
    mode: PurgeMode,
    now: DateTime<Utc>,
    retention: Duration,
) -> bool {
    match (entry.deleted_at, mode) {
        (None, _) => false,
        (Some(_), PurgeMode::Explicit) => true,
        (Some(deleted_at), PurgeMode::Retention) => now - deleted_at > retention,
    }
}

/// Split off eligible tombstones, keeping the survivors in file order.
/// Returns the survivors and the number of entries dropped.
pub fn compact(
    entries: Vec<Entry>,
    mode: PurgeMode,
    now: DateTime<Utc>,
    retention: Duration,
) -> (Vec<Entry>, usize) {
    let before = entries.len();
    let kept: Vec<Entry> = entries
        .into_iter()
        .filter(|entry| !is_eligible(entry, mode, now, retention))
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}
