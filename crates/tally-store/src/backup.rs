// ABOUTME: Rotating byte-for-byte backups of the entry log, taken before every destructive rewrite.
// ABOUTME: Slots live next to the log as <log>.bak.<n>; slot 1 is always the newest copy.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::log::staging_path;

/// Number of backup slots kept unless configured otherwise.
pub const DEFAULT_BACKUP_SLOTS: usize = 3;

/// Errors that can occur during backup operations.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("backup slot {slot} not found")]
    NotFound { slot: usize },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> BackupError + '_ {
    move |source| BackupError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// One filesystem step of a rotation, in the order it must run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStep {
    Discard(usize),
    Shift { from: usize, to: usize },
}

/// Work out how to free slot 1 given the slots that exist right now.
/// Slots at or beyond `max_slots` are discarded; the rest move up by one,
/// highest first so no rename overwrites a slot that still has to move.
pub fn plan_rotation(existing: &[usize], max_slots: usize) -> Vec<RotationStep> {
    let mut slots = existing.to_vec();
    slots.sort_unstable_by(|a, b| b.cmp(a));
    slots.dedup();

    slots
        .into_iter()
        .map(|slot| {
            if slot >= max_slots {
                RotationStep::Discard(slot)
            } else {
                RotationStep::Shift {
                    from: slot,
                    to: slot + 1,
                }
            }
        })
        .collect()
}

/// `entries.jsonl` + 2 -> `entries.jsonl.bak.2`
pub fn backup_path(path: &Path, slot: usize) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".bak.{slot}"));
    path.with_file_name(name)
}

/// Creates, lists, and restores the rotating backups of one log file.
#[derive(Debug, Clone)]
pub struct BackupManager {
    max_slots: usize,
}

impl Default for BackupManager {
    fn default() -> Self {
        Self::new(DEFAULT_BACKUP_SLOTS)
    }
}

impl BackupManager {
    /// A manager retaining `max_slots` backups (at least one).
    pub fn new(max_slots: usize) -> Self {
        Self {
            max_slots: max_slots.max(1),
        }
    }

    pub fn max_slots(&self) -> usize {
        self.max_slots
    }

    /// Copy the live log into slot 1, rotating older slots up and dropping
    /// the oldest. Does nothing if the log does not exist yet.
    pub fn create_backup(&self, path: &Path) -> Result<(), BackupError> {
        if !path.exists() {
            tracing::debug!("no log at {}, skipping backup", path.display());
            return Ok(());
        }

        let existing = Self::list_backups(path)?;
        for step in plan_rotation(&existing, self.max_slots) {
            match step {
                RotationStep::Discard(slot) => {
                    let target = backup_path(path, slot);
                    tracing::debug!("discarding oldest backup {}", target.display());
                    fs::remove_file(&target).map_err(io_error(&target))?;
                }
                RotationStep::Shift { from, to } => {
                    let source = backup_path(path, from);
                    fs::rename(&source, backup_path(path, to)).map_err(io_error(&source))?;
                }
            }
        }

        let newest = backup_path(path, 1);
        copy_atomically(path, &newest)?;
        tracing::info!("backed up {} to {}", path.display(), newest.display());
        Ok(())
    }

    /// Slot numbers that currently have a backup file, newest (1) first.
    pub fn list_backups(path: &Path) -> Result<Vec<usize>, BackupError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut prefix = path.file_name().unwrap_or_default().to_os_string();
        prefix.push(".bak.");
        let prefix = prefix.to_string_lossy().into_owned();

        let mut slots = Vec::new();
        for entry in fs::read_dir(&dir).map_err(io_error(&dir))? {
            let entry = entry.map_err(io_error(&dir))?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            // Match pattern: <log name>.bak.<slot>
            if let Some(rest) = name_str.strip_prefix(prefix.as_str())
                && let Ok(slot) = rest.parse::<usize>()
                && slot >= 1
                && entry.path().is_file()
            {
                slots.push(slot);
            }
        }

        slots.sort_unstable();
        Ok(slots)
    }

    /// Overwrite the live log with the bytes of `slot`. Slots are left as
    /// they are, so restoring slot 2 after slot 1 still works.
    pub fn restore_backup(path: &Path, slot: usize) -> Result<(), BackupError> {
        let source = backup_path(path, slot);
        if !source.is_file() {
            return Err(BackupError::NotFound { slot });
        }

        copy_atomically(&source, path)?;
        tracing::info!("restored {} from backup slot {}", path.display(), slot);
        Ok(())
    }
}

/// Copy `from` to a temp sibling of `to`, then rename it into place.
fn copy_atomically(from: &Path, to: &Path) -> Result<(), BackupError> {
    let tmp_path = staging_path(to);
    if let Err(e) = fs::copy(from, &tmp_path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_error(from)(e));
    }
    if let Err(e) = fs::rename(&tmp_path, to) {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_error(to)(e));
    }
    Ok(())
}
