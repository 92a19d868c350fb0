// ABOUTME: Persistence layer for tally, storing time entries in a line-oriented JSONL log.
// ABOUTME: Provides corruption-tolerant reads, tombstones with undo, rotating backups, and compaction.

pub mod backup;
pub mod codec;
pub mod index;
pub mod log;
pub mod purge;
pub mod store;
pub mod tombstone;

pub use backup::{BackupError, BackupManager, DEFAULT_BACKUP_SLOTS};
pub use codec::{CorruptionError, Decoded, Warning};
pub use index::OutOfBounds;
pub use log::{EntryLog, LogError};
pub use purge::{DEFAULT_RETENTION_DAYS, PurgeMode};
pub use store::{EntryStore, RepairOutcome, StoreError, ValidationReport};
pub use tombstone::DeletedEntry;
