// ABOUTME: Core library for tally, containing the entry model and query filters.
// ABOUTME: This crate defines the data types shared by the store and the CLI.

pub mod entry;
pub mod filter;

pub use entry::{
    Entry, EntryPatch, IndexedEntry, MAX_DURATION_MINUTES, ValidationError, format_duration,
    render_raw_input,
};
pub use filter::EntryFilter;
