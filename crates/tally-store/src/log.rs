// ABOUTME: Physical JSONL entry log: sequential append, full scan, and atomic whole-file rewrite.
// ABOUTME: Rewrites stage the new content in a sibling temp file and rename it over the log.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tally_core::{Entry, ValidationError};
use thiserror::Error;

use crate::codec::{self, Decoded};

/// Errors that can occur during entry log operations.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("storage error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not encode entry: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("refusing to write invalid entry: {0}")]
    Invalid(#[from] ValidationError),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> LogError + '_ {
    move |source| LogError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// The entry log file. Every operation takes the log path and re-reads or
/// rewrites the file; nothing is cached between calls.
pub struct EntryLog;

impl EntryLog {
    /// Append one entry as a single line and sync it to disk. Creates the
    /// file (mode 0644) if needed, but never its parent directory.
    ///
    /// If the log ends in a partial line, a newline is written first so the
    /// fragment stays a corrupted line of its own and the new entry is kept.
    pub fn append(path: &Path, entry: &Entry) -> Result<(), LogError> {
        entry.validate()?;
        let mut line = codec::encode(entry)?;
        line.push('\n');

        let mut file = new_file_options()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(io_error(path))?;
        if ends_mid_line(&mut file).map_err(io_error(path))? {
            tracing::warn!(
                "{} ends with an incomplete line; starting the new entry on a fresh line",
                path.display()
            );
            line.insert(0, '\n');
        }
        file.write_all(line.as_bytes()).map_err(io_error(path))?;
        file.flush().map_err(io_error(path))?;
        file.sync_all().map_err(io_error(path))?;
        Ok(())
    }

    /// Scan the whole log. A missing file reads as an empty log.
    pub fn read(path: &Path) -> Result<Decoded, LogError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Decoded::default()),
            Err(e) => return Err(io_error(path)(e)),
        };

        let decoded = codec::decode_all(BufReader::new(file)).map_err(io_error(path))?;
        tracing::debug!(
            "read {} entries from {} ({} corrupted lines)",
            decoded.entries.len(),
            path.display(),
            decoded.warnings.len()
        );
        Ok(decoded)
    }

    /// Valid entries only; corrupted lines are skipped silently.
    pub fn read_entries(path: &Path) -> Result<Vec<Entry>, LogError> {
        Ok(Self::read(path)?.entries)
    }

    /// Replace the log with `entries`, one per line, in the given order.
    ///
    /// All lines are encoded before the filesystem is touched. The content
    /// is written to `<log>.tmp`, synced, and renamed over the log, so a
    /// failure at any step leaves the previous file intact.
    pub fn write_all(path: &Path, entries: &[Entry]) -> Result<(), LogError> {
        let mut buf = String::new();
        for entry in entries {
            buf.push_str(&codec::encode(entry)?);
            buf.push('\n');
        }

        let tmp_path = staging_path(path);
        if let Err(e) = stage(&tmp_path, buf.as_bytes()) {
            let _ = fs::remove_file(&tmp_path);
            return Err(io_error(&tmp_path)(e));
        }
        if let Err(e) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(io_error(path)(e));
        }

        // Make the rename durable. Best-effort: the data is already consistent.
        if let Some(parent) = path.parent()
            && let Ok(dir) = File::open(parent)
        {
            let _ = dir.sync_all();
        }

        Ok(())
    }
}

fn ends_mid_line(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

fn stage(tmp_path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = new_file_options()
        .create(true)
        .write(true)
        .truncate(true)
        .open(tmp_path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// `entries.jsonl` -> `entries.jsonl.tmp`, next to the log.
pub(crate) fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

pub(crate) fn new_file_options() -> OpenOptions {
    #[allow(unused_mut)]
    let mut options = OpenOptions::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    options
}
