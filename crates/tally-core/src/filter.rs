// ABOUTME: Query filters for selecting entries by period, project, or tag.
// ABOUTME: Filters are pure predicates over Entry and never look at tombstones.

use chrono::{DateTime, Utc};

use crate::entry::Entry;

/// Selects entries whose timestamp lies in `[since, until)` and that carry
/// the given project and tag. Unset fields match everything. Label
/// comparisons ignore ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub project: Option<String>,
    pub tag: Option<String>,
}

impl EntryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        if self.since.is_some_and(|since| entry.timestamp < since) {
            return false;
        }
        if self.until.is_some_and(|until| entry.timestamp >= until) {
            return false;
        }
        if let Some(project) = &self.project {
            let same = entry
                .project
                .as_deref()
                .is_some_and(|p| p.eq_ignore_ascii_case(project));
            if !same {
                return false;
            }
        }
        if let Some(tag) = &self.tag
            && !entry.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = EntryFilter::new();
        assert!(filter.is_empty());
        assert!(filter.matches(&Entry::new(at(1), "x", 5)));
    }

    #[test]
    fn period_is_half_open() {
        let filter = EntryFilter::new().since(at(2)).until(at(4));

        assert!(!filter.matches(&Entry::new(at(1), "x", 5)));
        assert!(filter.matches(&Entry::new(at(2), "x", 5)));
        assert!(filter.matches(&Entry::new(at(3), "x", 5)));
        assert!(!filter.matches(&Entry::new(at(4), "x", 5)));
    }

    #[test]
    fn project_and_tag_match_case_insensitively() {
        let entry = Entry::new(at(1), "x", 5)
            .with_project("Acme")
            .with_tags(["Billing", "call"]);

        assert!(EntryFilter::new().project("acme").matches(&entry));
        assert!(EntryFilter::new().tag("billing").matches(&entry));
        assert!(!EntryFilter::new().project("other").matches(&entry));
        assert!(!EntryFilter::new().tag("meeting").matches(&entry));
        assert!(!EntryFilter::new().project("acme").matches(&Entry::new(at(1), "y", 5)));
    }
}
