// ABOUTME: Defines the Entry struct representing one logged, timed activity.
// ABOUTME: Covers validation, edit patches, raw-input rendering, and the indexed read projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound for a single entry: one full day.
pub const MAX_DURATION_MINUTES: u32 = 1440;

/// Reasons an entry (or a patch applied to one) is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("description must not be empty")]
    EmptyDescription,

    #[error("duration must be between 1 and 1440 minutes, got {0}")]
    DurationOutOfRange(u32),

    #[error("project and tag labels must not be blank")]
    BlankLabel,

    #[error("edit patch changes nothing")]
    EmptyPatch,
}

/// A single logged activity. One entry is stored per line of the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// When the work happened. Never touched by edits.
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub duration_minutes: u32,
    /// The textual form the entry was created from.
    pub raw_input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Set when the entry is soft-deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entry {
    /// Create an active entry with no project or tags. `raw_input` is
    /// rendered from the description and duration; callers that parsed the
    /// entry from user text can override it with `with_raw_input`.
    pub fn new(
        timestamp: DateTime<Utc>,
        description: impl Into<String>,
        duration_minutes: u32,
    ) -> Self {
        let description = description.into();
        let raw_input = render_raw_input(&description, duration_minutes);
        Self {
            timestamp,
            description,
            duration_minutes,
            raw_input,
            project: None,
            tags: Vec::new(),
            deleted_at: None,
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_raw_input(mut self, raw_input: impl Into<String>) -> Self {
        self.raw_input = raw_input.into();
        self
    }

    /// True while the entry has not been soft-deleted.
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Check the entry's field invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        if self.duration_minutes == 0 || self.duration_minutes > MAX_DURATION_MINUTES {
            return Err(ValidationError::DurationOutOfRange(self.duration_minutes));
        }
        let blank_project = self.project.as_deref().is_some_and(|p| p.trim().is_empty());
        if blank_project || self.tags.iter().any(|t| t.trim().is_empty()) {
            return Err(ValidationError::BlankLabel);
        }
        Ok(())
    }
}

/// A partial update to an entry. `None` fields are left as they are.
/// `project: Some(None)` clears the project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPatch {
    pub description: Option<String>,
    pub duration_minutes: Option<u32>,
    pub project: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.duration_minutes.is_none()
            && self.project.is_none()
            && self.tags.is_none()
    }

    /// Produce the patched copy of `entry`. The timestamp and tombstone are
    /// kept; `raw_input` is re-rendered when the description or duration is
    /// part of the patch. The result is validated before it is returned.
    pub fn apply(&self, entry: &Entry) -> Result<Entry, ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }

        let mut updated = entry.clone();
        if let Some(description) = &self.description {
            updated.description = description.clone();
        }
        if let Some(minutes) = self.duration_minutes {
            updated.duration_minutes = minutes;
        }
        if let Some(project) = &self.project {
            updated.project = project.clone();
        }
        if let Some(tags) = &self.tags {
            updated.tags = tags.clone();
        }
        if self.description.is_some() || self.duration_minutes.is_some() {
            updated.raw_input = render_raw_input(&updated.description, updated.duration_minutes);
        }

        updated.validate()?;
        Ok(updated)
    }
}

/// An entry as seen by a reader: its 1-based active index (derived, never
/// stored) and its 0-based physical position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexedEntry {
    pub active_index: usize,
    pub position: usize,
    pub entry: Entry,
}

/// Render minutes the way users type them: `45m`, `2h`, `1h30m`.
pub fn format_duration(minutes: u32) -> String {
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h{m}m"),
    }
}

pub fn render_raw_input(description: &str, duration_minutes: u32) -> String {
    format!("{} {}", description, format_duration(duration_minutes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
    }

    #[test]
    fn new_entry_is_active_and_renders_raw_input() {
        let entry = Entry::new(ts(), "Write report", 90);

        assert!(entry.is_active());
        assert_eq!(entry.raw_input, "Write report 1h30m");
        assert!(entry.project.is_none());
        assert!(entry.tags.is_empty());
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_description() {
        let entry = Entry::new(ts(), "   ", 30);
        assert_eq!(entry.validate(), Err(ValidationError::EmptyDescription));
    }

    #[test]
    fn validate_enforces_duration_bounds() {
        assert_eq!(
            Entry::new(ts(), "x", 0).validate(),
            Err(ValidationError::DurationOutOfRange(0))
        );
        assert_eq!(
            Entry::new(ts(), "x", 1441).validate(),
            Err(ValidationError::DurationOutOfRange(1441))
        );
        assert!(Entry::new(ts(), "x", 1).validate().is_ok());
        assert!(Entry::new(ts(), "x", 1440).validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_labels() {
        let entry = Entry::new(ts(), "x", 10).with_tags(["ok", " "]);
        assert_eq!(entry.validate(), Err(ValidationError::BlankLabel));

        let entry = Entry::new(ts(), "x", 10).with_project("");
        assert_eq!(entry.validate(), Err(ValidationError::BlankLabel));
    }

    #[test]
    fn tags_keep_order_and_duplicates() {
        let entry = Entry::new(ts(), "x", 10).with_tags(["b", "a", "b"]);
        assert_eq!(entry.tags, vec!["b", "a", "b"]);
    }

    #[test]
    fn optional_fields_are_omitted_from_json() {
        let json = serde_json::to_string(&Entry::new(ts(), "Standup", 15)).unwrap();

        assert!(!json.contains("project"));
        assert!(!json.contains("tags"));
        assert!(!json.contains("deleted_at"));
        assert!(json.contains(r#""duration_minutes":15"#));
    }

    #[test]
    fn patch_rerenders_raw_input_and_keeps_timestamp() {
        let entry = Entry::new(ts(), "Review", 30).with_raw_input("review 30m");
        let patch = EntryPatch {
            duration_minutes: Some(120),
            ..Default::default()
        };

        let updated = patch.apply(&entry).unwrap();

        assert_eq!(updated.duration_minutes, 120);
        assert_eq!(updated.raw_input, "Review 2h");
        assert_eq!(updated.timestamp, entry.timestamp);
    }

    #[test]
    fn patch_of_labels_leaves_raw_input_alone() {
        let entry = Entry::new(ts(), "Review", 30)
            .with_project("acme")
            .with_raw_input("review 30m @acme");
        let patch = EntryPatch {
            project: Some(None),
            tags: Some(vec!["urgent".to_string()]),
            ..Default::default()
        };

        let updated = patch.apply(&entry).unwrap();

        assert!(updated.project.is_none());
        assert_eq!(updated.tags, vec!["urgent"]);
        assert_eq!(updated.raw_input, "review 30m @acme");
    }

    #[test]
    fn patch_rejects_invalid_result_and_empty_patch() {
        let entry = Entry::new(ts(), "Review", 30);

        let bad = EntryPatch {
            description: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(bad.apply(&entry), Err(ValidationError::EmptyDescription));
        assert_eq!(
            EntryPatch::default().apply(&entry),
            Err(ValidationError::EmptyPatch)
        );
    }

    #[test]
    fn format_duration_variants() {
        assert_eq!(format_duration(45), "45m");
        assert_eq!(format_duration(120), "2h");
        assert_eq!(format_duration(95), "1h35m");
    }
}
