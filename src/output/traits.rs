//! Document writer trait and types
//!
//! This module defines the interface the orchestrator flushes buffered
//! posts through, and the associated error types.

use crate::state::PostRecord;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Nothing to write for part {part} of {name}")]
    EmptyPart { name: String, part: u32 },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Everything needed to render one part file
#[derive(Debug, Clone, Copy)]
pub struct PartDocument<'a> {
    /// Target file name, e.g. `Some_thread_p3.html`
    pub filename: &'a str,

    /// Posts in page order
    pub posts: &'a [PostRecord],

    /// Directory the file is written into
    pub output_dir: &'a Path,

    /// URL of the first page covered by this part
    pub start_url: &'a str,

    /// 1-based part number
    pub part: u32,

    /// Human readable thread name
    pub display_name: &'a str,

    /// Base filename the neighbouring part names are derived from
    pub base_filename: &'a str,

    /// Whether a following part exists or is expected
    pub has_next: bool,
}

/// Trait for document writers
///
/// A writer turns one slice of a thread into a single self-contained file.
/// Each call is one complete write; files are never reopened for append.
pub trait DocumentWriter {
    /// Writes one part file
    ///
    /// # Returns
    ///
    /// The path of the written file
    fn write_part(&self, part: &PartDocument<'_>) -> OutputResult<PathBuf>;
}
