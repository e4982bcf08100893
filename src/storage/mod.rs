//! Storage module for persisting archive progress
//!
//! This module handles all database operations for a job, including:
//! - SQLite database initialization and schema management
//! - Per-thread progress records keyed by seed URL
//! - Job metadata used to detect recipe changes on resume

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use std::path::Path;

/// File name of the progress database inside a job's output directory
pub const PROGRESS_DB_FILE: &str = "progress.db";

/// Opens (or creates) the progress database of a job
///
/// # Arguments
///
/// * `output_dir` - The job's output directory
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully opened storage
/// * `Err(StorageError)` - Failed to open storage
pub fn open_storage(output_dir: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(&output_dir.join(PROGRESS_DB_FILE))
}
