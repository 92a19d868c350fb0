// ABOUTME: Configuration loading and validation for the tally CLI.
// ABOUTME: Reads TALLY_* environment variables and builds the EntryStore they describe.

use std::path::PathBuf;

use chrono::Duration;
use tally_store::{BackupManager, DEFAULT_BACKUP_SLOTS, DEFAULT_RETENTION_DAYS, EntryStore};
use thiserror::Error;

/// Highest accepted TALLY_BACKUP_SLOTS value.
const MAX_BACKUP_SLOTS: usize = 9;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not a valid number: {value}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("TALLY_BACKUP_SLOTS must be between 1 and 9, got {0}")]
    BackupSlotsOutOfRange(usize),

    #[error("TALLY_RETENTION_DAYS must not be negative, got {0}")]
    NegativeRetention(i64),

    #[error("TALLY_RETENTION_DAYS is too large, got {0}")]
    RetentionOutOfRange(i64),
}

/// CLI configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct TallyConfig {
    pub home: PathBuf,
    pub file: PathBuf,
    pub backup_slots: usize,
    pub retention: Duration,
}

impl TallyConfig {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Environment variables:
    /// - TALLY_HOME: data directory (default: ~/.tally)
    /// - TALLY_FILE: entry log path (default: $TALLY_HOME/entries.jsonl)
    /// - TALLY_BACKUP_SLOTS: backups kept before destructive rewrites (default: 3)
    /// - TALLY_RETENTION_DAYS: days a deleted entry stays recoverable (default: 7)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let home = var("TALLY_HOME").map(PathBuf::from).unwrap_or_else(|| {
            var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".tally")
        });

        let file = var("TALLY_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("entries.jsonl"));

        let backup_slots = match var("TALLY_BACKUP_SLOTS") {
            Some(value) => parse_number::<usize>("TALLY_BACKUP_SLOTS", value)?,
            None => DEFAULT_BACKUP_SLOTS,
        };
        if !(1..=MAX_BACKUP_SLOTS).contains(&backup_slots) {
            return Err(ConfigError::BackupSlotsOutOfRange(backup_slots));
        }

        let retention_days = match var("TALLY_RETENTION_DAYS") {
            Some(value) => parse_number::<i64>("TALLY_RETENTION_DAYS", value)?,
            None => DEFAULT_RETENTION_DAYS,
        };
        if retention_days < 0 {
            return Err(ConfigError::NegativeRetention(retention_days));
        }
        let retention = Duration::try_days(retention_days)
            .ok_or(ConfigError::RetentionOutOfRange(retention_days))?;

        Ok(Self {
            home,
            file,
            backup_slots,
            retention,
        })
    }

    pub fn store(&self) -> EntryStore {
        EntryStore::with_options(
            self.file.clone(),
            BackupManager::new(self.backup_slots),
            self.retention,
        )
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|_| ConfigError::InvalidNumber { var, value })
}
