// ABOUTME: Line codec for the entry log: one JSON-serialized Entry per line.
// ABOUTME: Decodes each line independently so a corrupted line only yields a warning.

use std::io::{self, BufRead};

use serde::Serialize;
use tally_core::{Entry, ValidationError};
use thiserror::Error;

/// Longest line excerpt carried in a warning before it is cut with "...".
pub const WARNING_PREVIEW_CHARS: usize = 50;

/// Why a single line could not be decoded. Never aborts a read.
#[derive(Debug, Error)]
pub enum CorruptionError {
    #[error("empty line")]
    Empty,

    #[error("line is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),

    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid entry: {0}")]
    Invalid(#[from] ValidationError),
}

/// A skipped line, reported back to the caller alongside the good entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    /// 1-based line number in the file.
    pub line_number: usize,
    /// The offending line, cut to `WARNING_PREVIEW_CHARS` characters.
    pub content: String,
    pub message: String,
}

impl Warning {
    fn new(line_number: usize, line: &str, error: &CorruptionError) -> Self {
        Self {
            line_number,
            content: preview(line),
            message: error.to_string(),
        }
    }
}

/// Everything a full scan of the log produced.
#[derive(Debug, Clone, Default)]
pub struct Decoded {
    /// Valid entries in file order. Their indices are physical positions.
    pub entries: Vec<Entry>,
    pub warnings: Vec<Warning>,
    /// Every line seen, valid or not.
    pub total_lines: usize,
}

/// Decode one line of the log.
pub fn decode_line(line: &str) -> Result<Entry, CorruptionError> {
    if line.trim().is_empty() {
        return Err(CorruptionError::Empty);
    }
    let entry: Entry = serde_json::from_str(line)?;
    entry.validate()?;
    Ok(entry)
}

/// Encode an entry as a single JSON line, without the trailing newline.
pub fn encode(entry: &Entry) -> Result<String, serde_json::Error> {
    serde_json::to_string(entry)
}

/// Decode every line from `reader`. Only I/O failures are returned as
/// errors; undecodable lines become warnings and the scan continues.
pub fn decode_all<R: BufRead>(reader: R) -> io::Result<Decoded> {
    let mut decoded = Decoded::default();

    for (idx, raw) in reader.split(b'\n').enumerate() {
        let mut raw = raw?;
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        let line_number = idx + 1;
        decoded.total_lines = line_number;

        let result = std::str::from_utf8(&raw)
            .map_err(CorruptionError::from)
            .and_then(decode_line);

        match result {
            Ok(entry) => decoded.entries.push(entry),
            Err(error) => {
                let line = String::from_utf8_lossy(&raw);
                decoded
                    .warnings
                    .push(Warning::new(line_number, &line, &error));
            }
        }
    }

    Ok(decoded)
}

fn preview(line: &str) -> String {
    if line.chars().count() <= WARNING_PREVIEW_CHARS {
        return line.to_string();
    }
    let mut cut: String = line.chars().take(WARNING_PREVIEW_CHARS).collect();
    cut.push_str("...");
    cut
}
