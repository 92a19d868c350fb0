// ABOUTME: Command-line surface for tally: argument definitions and one handler per subcommand.
// ABOUTME: Handlers only call into EntryStore and format results; warnings go to stderr.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, Utc};
use clap::{Args, Parser, Subcommand};
use tally_core::{Entry, EntryFilter, EntryPatch, IndexedEntry, format_duration};
use tally_store::index::index_active;
use tally_store::{EntryStore, PurgeMode, Warning};

use crate::config::TallyConfig;

#[derive(Debug, Parser)]
#[command(name = "tally", about = "Log timed activities and query them", version)]
pub struct Cli {
    /// Entry log to use instead of TALLY_FILE.
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log a new activity.
    Add(AddArgs),

    /// List active entries, optionally filtered.
    List(ListArgs),

    /// Show one entry by its active index.
    Show { index: usize },

    /// Change an entry in place.
    Edit(EditArgs),

    /// Move an entry to the trash (recoverable with undo/restore).
    Delete {
        index: usize,
        #[arg(long)]
        yes: bool,
    },

    /// Permanently remove the entry at a 0-based physical position.
    RemoveAt {
        position: usize,
        #[arg(long)]
        yes: bool,
    },

    /// Restore the most recently deleted entry.
    Undo,

    /// List deleted entries that can still be restored.
    Trash,

    /// Restore a deleted entry by its trash index.
    Restore { index: usize },

    /// Permanently drop every deleted entry.
    Purge {
        #[arg(long)]
        yes: bool,
    },

    /// List available backup slots (1 = newest).
    Backups,

    /// Replace the entry log with a backup slot.
    RestoreBackup { slot: usize },

    /// Check every line of the entry log.
    Validate {
        /// Emit the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Rewrite the entry log without its corrupted lines.
    Repair,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    pub description: String,
    /// Duration in minutes (1-1440).
    #[arg(short, long)]
    pub minutes: u32,
    #[arg(short, long)]
    pub project: Option<String>,
    /// Tag to attach; repeat for several.
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,
    /// When the work happened (RFC 3339). Defaults to now.
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Include deleted entries.
    #[arg(long)]
    pub all: bool,
    #[arg(short, long)]
    pub project: Option<String>,
    #[arg(short, long)]
    pub tag: Option<String>,
    /// Inclusive lower bound (RFC 3339).
    #[arg(long)]
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound (RFC 3339).
    #[arg(long)]
    pub until: Option<DateTime<Utc>>,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    pub index: usize,
    #[arg(short, long)]
    pub description: Option<String>,
    #[arg(short, long)]
    pub minutes: Option<u32>,
    #[arg(short, long, conflicts_with = "clear_project")]
    pub project: Option<String>,
    #[arg(long)]
    pub clear_project: bool,
    /// Replace all tags; repeat for several.
    #[arg(short, long = "tag", conflicts_with = "clear_tags")]
    pub tags: Vec<String>,
    #[arg(long)]
    pub clear_tags: bool,
}

impl EditArgs {
    fn patch(&self) -> EntryPatch {
        let project = if self.clear_project {
            Some(None)
        } else {
            self.project.clone().map(Some)
        };
        let tags = if self.clear_tags {
            Some(Vec::new())
        } else if self.tags.is_empty() {
            None
        } else {
            Some(self.tags.clone())
        };
        EntryPatch {
            description: self.description.clone(),
            duration_minutes: self.minutes,
            project,
            tags,
        }
    }
}

pub fn run(cli: Cli, config: &TallyConfig) -> Result<()> {
    let mut config = config.clone();
    if let Some(file) = cli.file {
        config.file = file;
    }
    let store = config.store();

    match cli.command {
        Commands::Add(args) => handle_add(&store, args),
        Commands::List(args) => handle_list(&store, args),
        Commands::Show { index } => {
            let indexed = store.get(index)?;
            println!("{}", render(&indexed));
            println!("    raw: {}", indexed.entry.raw_input);
            Ok(())
        }
        Commands::Edit(args) => {
            let updated = store.edit(args.index, &args.patch())?;
            println!("updated: {}", render_entry(&updated));
            Ok(())
        }
        Commands::Delete { index, yes } => {
            confirm(yes, "delete")?;
            let deleted = store.soft_delete(index)?;
            println!("deleted: {} (undo to restore)", render_entry(&deleted));
            Ok(())
        }
        Commands::RemoveAt { position, yes } => {
            confirm(yes, "remove")?;
            let removed = store.hard_delete(position)?;
            println!("removed permanently: {}", render_entry(&removed));
            Ok(())
        }
        Commands::Undo => {
            let restored = store.undo()?;
            println!("restored: {}", render_entry(&restored));
            Ok(())
        }
        Commands::Trash => handle_trash(&store),
        Commands::Restore { index } => {
            let restored = store.restore_deleted(index)?;
            println!("restored: {}", render_entry(&restored));
            Ok(())
        }
        Commands::Purge { yes } => {
            confirm(yes, "purge")?;
            let removed = store.purge(PurgeMode::Explicit)?;
            println!("purged {} deleted entries", removed);
            Ok(())
        }
        Commands::Backups => {
            let slots = store.list_backups()?;
            if slots.is_empty() {
                println!("no backups");
            }
            for slot in slots {
                println!("slot {}", slot);
            }
            Ok(())
        }
        Commands::RestoreBackup { slot } => {
            store.restore_backup(slot)?;
            println!("restored {} from backup slot {}", store.path().display(), slot);
            Ok(())
        }
        Commands::Validate { json } => handle_validate(&store, json),
        Commands::Repair => {
            let outcome = store.repair()?;
            println!("kept {} entries, dropped {} corrupted lines", outcome.kept, outcome.dropped);
            Ok(())
        }
    }
}

fn handle_add(store: &EntryStore, args: AddArgs) -> Result<()> {
    if let Some(parent) = store.path().parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }

    let mut entry = Entry::new(args.at.unwrap_or_else(Utc::now), args.description, args.minutes)
        .with_tags(args.tags);
    entry.project = args.project;
    store.append(&entry)?;

    println!("logged: {}", render_entry(&entry));
    Ok(())
}

fn handle_list(store: &EntryStore, args: ListArgs) -> Result<()> {
    let purged = store.purge(PurgeMode::Retention)?;
    if purged > 0 {
        tracing::info!("compacted {} expired deleted entries", purged);
    }

    let decoded = store.read_all_with_warnings()?;
    print_warnings(&decoded.warnings);

    let filter = EntryFilter {
        since: args.since,
        until: args.until,
        project: args.project,
        tag: args.tag,
    };

    let mut total = 0;
    for indexed in index_active(&decoded.entries) {
        if filter.matches(&indexed.entry) {
            total += indexed.entry.duration_minutes;
            println!("{}", render(&indexed));
        }
    }
    if args.all {
        for entry in decoded.entries.iter().filter(|e| e.is_deleted()) {
            if filter.matches(entry) {
                println!("  -  {} (deleted)", render_entry(entry));
            }
        }
    }
    println!("total: {}", format_duration(total));
    Ok(())
}

fn handle_trash(store: &EntryStore) -> Result<()> {
    let trash = store.list_deleted()?;
    if trash.is_empty() {
        println!("trash is empty");
    }
    for deleted in trash {
        let when = deleted
            .entry
            .deleted_at
            .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "{:>3}  {}  (deleted {})",
            deleted.deleted_index,
            render_entry(&deleted.entry),
            when
        );
    }
    Ok(())
}

fn handle_validate(store: &EntryStore, json: bool) -> Result<()> {
    let report = store.validate()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_warnings(&report.warnings);
        println!(
            "{} lines: {} valid, {} corrupted",
            report.total_lines, report.valid, report.corrupted
        );
    }
    if !report.is_clean() {
        bail!("{} corrupted lines in {}", report.corrupted, store.path().display());
    }
    Ok(())
}

fn confirm(yes: bool, action: &str) -> Result<()> {
    if !yes {
        bail!("refusing to {} without --yes", action);
    }
    Ok(())
}

fn print_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!(
            "warning: skipped line {}: {} ({})",
            warning.line_number, warning.message, warning.content
        );
    }
}

fn render(indexed: &IndexedEntry) -> String {
    format!("{:>3}  {}", indexed.active_index, render_entry(&indexed.entry))
}

fn render_entry(entry: &Entry) -> String {
    let mut line = format!(
        "{}  {:>6}  {}",
        entry.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        format_duration(entry.duration_minutes),
        entry.description
    );
    if let Some(project) = &entry.project {
        line.push_str(&format!("  @{}", project));
    }
    for tag in &entry.tags {
        line.push_str(&format!(" #{}", tag));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_add_with_repeated_tags() {
        let cli = Cli::try_parse_from([
            "tally", "add", "Code review", "-m", "45", "-p", "acme", "-t", "review", "-t", "pr",
        ])
        .unwrap();

        let Commands::Add(args) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(args.description, "Code review");
        assert_eq!(args.minutes, 45);
        assert_eq!(args.project.as_deref(), Some("acme"));
        assert_eq!(args.tags, vec!["review", "pr"]);
        assert!(args.at.is_none());
    }

    #[test]
    fn parses_rfc3339_timestamps() {
        let cli = Cli::try_parse_from([
            "tally",
            "list",
            "--since",
            "2026-03-01T00:00:00Z",
        ])
        .unwrap();

        let Commands::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(
            args.since,
            Some(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn edit_args_build_patch() {
        let cli =
            Cli::try_parse_from(["tally", "edit", "2", "-m", "30", "--clear-project"]).unwrap();
        let Commands::Edit(args) = cli.command else {
            panic!("expected edit");
        };

        let patch = args.patch();

        assert_eq!(patch.duration_minutes, Some(30));
        assert_eq!(patch.project, Some(None));
        assert!(patch.tags.is_none());
        assert!(patch.description.is_none());
    }

    #[test]
    fn edit_rejects_conflicting_project_flags() {
        let result = Cli::try_parse_from(["tally", "edit", "1", "-p", "x", "--clear-project"]);
        assert!(result.is_err());
    }

    #[test]
    fn destructive_commands_need_confirmation() {
        assert!(confirm(false, "purge").is_err());
        assert!(confirm(true, "purge").is_ok());
    }

    #[test]
    fn add_then_list_through_run() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = TallyConfig::from_lookup(|key| match key {
            "TALLY_HOME" => Some(dir.path().join("home").to_string_lossy().into_owned()),
            _ => None,
        })
        .unwrap();

        let add = Cli::try_parse_from(["tally", "add", "Standup", "-m", "15"]).unwrap();
        run(add, &config).unwrap();

        let entries = config.store().list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry.description, "Standup");

        let delete = Cli::try_parse_from(["tally", "delete", "1"]).unwrap();
        assert!(run(delete, &config).is_err());
        assert_eq!(config.store().list().unwrap().len(), 1);
    }
}
