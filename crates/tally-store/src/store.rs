// ABOUTME: EntryStore, the read/write/delete/restore contract the CLI consumes.
// ABOUTME: Every mutation decodes the log, changes it in memory, backs up, then rewrites it whole.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tally_core::{Entry, EntryFilter, EntryPatch, IndexedEntry, ValidationError};
use thiserror::Error;

use crate::backup::{BackupError, BackupManager};
use crate::codec::{Decoded, Warning};
use crate::index::{self, OutOfBounds};
use crate::log::{EntryLog, LogError};
use crate::purge::{self, PurgeMode};
use crate::tombstone::{self, DeletedEntry};

/// Errors surfaced by store operations. Corrupted lines never show up
/// here; they come back as warnings next to a successful result.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Log(#[from] LogError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error(transparent)]
    OutOfBounds(#[from] OutOfBounds),

    #[error("invalid edit: {0}")]
    Validation(#[from] ValidationError),

    #[error("no deleted entry to restore")]
    NothingDeleted,

    #[error("entry at position {position} is not deleted")]
    NotDeleted { position: usize },
}

/// Result of checking every line of the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub total_lines: usize,
    pub valid: usize,
    pub corrupted: usize,
    pub warnings: Vec<Warning>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.corrupted == 0
    }
}

/// Result of rewriting the log without its corrupted lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RepairOutcome {
    pub kept: usize,
    pub dropped: usize,
}

/// The durable entry store for one log file.
///
/// Nothing is cached: each call re-reads the file, so changes made by
/// another process show up on the next call. Mutations are not locked
/// against concurrent writers; the last rewrite wins.
#[derive(Debug, Clone)]
pub struct EntryStore {
    path: PathBuf,
    backups: BackupManager,
    retention: Duration,
}

impl EntryStore {
    /// A store with the default 3 backup slots and 7-day retention.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_options(path, BackupManager::default(), purge::default_retention())
    }

    pub fn with_options(
        path: impl Into<PathBuf>,
        backups: BackupManager,
        retention: Duration,
    ) -> Self {
        Self {
            path: path.into(),
            backups,
            retention,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /* ------------------------------- reads ------------------------------- */

    pub fn append(&self, entry: &Entry) -> Result<(), StoreError> {
        EntryLog::append(&self.path, entry)?;
        tracing::info!("appended entry '{}' to {}", entry.description, self.path.display());
        Ok(())
    }

    /// Every decodable entry, tombstones included, in file order.
    pub fn read_all(&self) -> Result<Vec<Entry>, StoreError> {
        Ok(EntryLog::read_entries(&self.path)?)
    }

    pub fn read_all_with_warnings(&self) -> Result<Decoded, StoreError> {
        Ok(EntryLog::read(&self.path)?)
    }

    /// Active entries with their active indices.
    pub fn list(&self) -> Result<Vec<IndexedEntry>, StoreError> {
        Ok(index::index_active(&self.read_all()?))
    }

    /// Active entries matching `filter`. Results keep their unfiltered
    /// active index, so they can be handed straight back to `edit` or
    /// `soft_delete`.
    pub fn query(&self, filter: &EntryFilter) -> Result<Vec<IndexedEntry>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|indexed| filter.matches(&indexed.entry))
            .collect())
    }

    pub fn get(&self, active_index: usize) -> Result<IndexedEntry, StoreError> {
        let entries = self.read_all()?;
        let position = index::resolve_active(&entries, active_index)?;
        Ok(IndexedEntry {
            active_index,
            position,
            entry: entries[position].clone(),
        })
    }

    /// Tombstoned entries, in file order.
    pub fn list_deleted(&self) -> Result<Vec<DeletedEntry>, StoreError> {
        Ok(tombstone::list_deleted(&self.read_all()?))
    }

    /// The entry `undo` would bring back, with its physical position.
    pub fn most_recently_deleted(&self) -> Result<(Entry, usize), StoreError> {
        let entries = self.read_all()?;
        let position =
            tombstone::most_recently_deleted(&entries).ok_or(StoreError::NothingDeleted)?;
        Ok((entries[position].clone(), position))
    }

    pub fn validate(&self) -> Result<ValidationReport, StoreError> {
        let decoded = self.read_all_with_warnings()?;
        Ok(ValidationReport {
            total_lines: decoded.total_lines,
            valid: decoded.entries.len(),
            corrupted: decoded.warnings.len(),
            warnings: decoded.warnings,
        })
    }

    /* ----------------------------- mutations ----------------------------- */

    /// Apply `patch` to the entry shown at `active_index`, in place.
    pub fn edit(&self, active_index: usize, patch: &EntryPatch) -> Result<Entry, StoreError> {
        let decoded = self.read_all_with_warnings()?;
        let mut entries = decoded.entries.clone();
        let position = index::resolve_active(&entries, active_index)?;

        let updated = patch.apply(&entries[position])?;
        entries[position] = updated.clone();

        self.rewrite(&decoded, &entries, "edit")?;
        Ok(updated)
    }

    /// Tombstone the entry shown at `active_index`.
    pub fn soft_delete(&self, active_index: usize) -> Result<Entry, StoreError> {
        let decoded = self.read_all_with_warnings()?;
        let mut entries = decoded.entries.clone();
        let position = tombstone::mark_deleted(&mut entries, active_index, Utc::now())?;

        self.rewrite(&decoded, &entries, "soft delete")?;
        Ok(entries[position].clone())
    }

    /// Permanently remove the entry at 0-based physical `position`,
    /// counting tombstones. Not undoable except through a backup.
    pub fn hard_delete(&self, position: usize) -> Result<Entry, StoreError> {
        let decoded = self.read_all_with_warnings()?;
        let mut entries = decoded.entries.clone();
        index::check_position(&entries, position)?;

        let removed = entries.remove(position);
        self.rewrite(&decoded, &entries, "hard delete")?;
        Ok(removed)
    }

    /// Clear the tombstone on the entry at physical `position`.
    pub fn restore(&self, position: usize) -> Result<Entry, StoreError> {
        let decoded = self.read_all_with_warnings()?;
        let entries = decoded.entries.clone();
        index::check_position(&entries, position)?;
        self.restore_at(&decoded, entries, position)
    }

    /// Restore by 1-based index into the trash view.
    pub fn restore_deleted(&self, deleted_index: usize) -> Result<Entry, StoreError> {
        let decoded = self.read_all_with_warnings()?;
        let entries = decoded.entries.clone();
        let position = index::resolve_deleted(&entries, deleted_index)?;
        self.restore_at(&decoded, entries, position)
    }

    /// Restore the most recently deleted entry.
    pub fn undo(&self) -> Result<Entry, StoreError> {
        let decoded = self.read_all_with_warnings()?;
        let entries = decoded.entries.clone();
        let position =
            tombstone::most_recently_deleted(&entries).ok_or(StoreError::NothingDeleted)?;
        self.restore_at(&decoded, entries, position)
    }

    pub fn purge(&self, mode: PurgeMode) -> Result<usize, StoreError> {
        self.purge_at(mode, Utc::now())
    }

    /// Drop eligible tombstones as of `now`. Returns how many were removed.
    /// When nothing is eligible the file is not touched and no backup is
    /// taken.
    pub fn purge_at(&self, mode: PurgeMode, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let decoded = self.read_all_with_warnings()?;
        let (kept, removed) = purge::compact(decoded.entries.clone(), mode, now, self.retention);
        if removed == 0 {
            tracing::debug!("purge ({:?}): nothing eligible in {}", mode, self.path.display());
            return Ok(0);
        }

        self.rewrite(&decoded, &kept, "purge")?;
        tracing::info!("purged {} deleted entries ({:?})", removed, mode);
        Ok(removed)
    }

    /// Rewrite the log keeping only the lines that decode. Does nothing if
    /// every line is already valid.
    pub fn repair(&self) -> Result<RepairOutcome, StoreError> {
        let decoded = self.read_all_with_warnings()?;
        let outcome = RepairOutcome {
            kept: decoded.entries.len(),
            dropped: decoded.warnings.len(),
        };
        if outcome.dropped > 0 {
            self.rewrite(&decoded, &decoded.entries, "repair")?;
        }
        Ok(outcome)
    }

    /* ------------------------------ backups ------------------------------ */

    pub fn create_backup(&self) -> Result<(), StoreError> {
        Ok(self.backups.create_backup(&self.path)?)
    }

    pub fn list_backups(&self) -> Result<Vec<usize>, StoreError> {
        Ok(BackupManager::list_backups(&self.path)?)
    }

    /// Replace the live log with backup `slot`. Re-read entries afterwards.
    pub fn restore_backup(&self, slot: usize) -> Result<(), StoreError> {
        Ok(BackupManager::restore_backup(&self.path, slot)?)
    }

    /* ------------------------------ helpers ------------------------------ */

    fn restore_at(
        &self,
        decoded: &Decoded,
        mut entries: Vec<Entry>,
        position: usize,
    ) -> Result<Entry, StoreError> {
        if !tombstone::clear_deleted(&mut entries[position]) {
            return Err(StoreError::NotDeleted { position });
        }
        self.rewrite(decoded, &entries, "restore")?;
        Ok(entries[position].clone())
    }

    /// Back up the current file, then replace it with `entries`.
    fn rewrite(
        &self,
        decoded: &Decoded,
        entries: &[Entry],
        action: &str,
    ) -> Result<(), StoreError> {
        if !decoded.warnings.is_empty() {
            tracing::warn!(
                "{} rewrites {} and drops {} corrupted lines (kept in backup slot 1)",
                action,
                self.path.display(),
                decoded.warnings.len()
            );
        }

        self.backups.create_backup(&self.path)?;
        EntryLog::write_all(&self.path, entries)?;
        tracing::info!(
            "{}: rewrote {} with {} entries",
            action,
            self.path.display(),
            entries.len()
        );
        Ok(())
    }
}
