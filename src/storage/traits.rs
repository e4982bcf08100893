//! Storage traits and error types
//!
//! This module defines the keyed-store interface the orchestrator persists
//! thread progress through, and the associated error types.

use crate::state::ThreadState;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Corrupt record for {key}: {message}")]
    Corrupt { key: String, message: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Keyed store of thread progress records for one job
///
/// Records are keyed by the thread's seed URL. Any backend that can load
/// everything, save one record, and save everything atomically can stand
/// in for the SQLite implementation.
pub trait Storage {
    // ===== Thread Records =====

    /// Loads every stored thread record, keyed by seed URL
    fn load_threads(&self) -> StorageResult<HashMap<String, ThreadState>>;

    /// Loads one thread record
    fn get_thread(&self, url: &str) -> StorageResult<Option<ThreadState>>;

    /// Inserts or replaces one thread record
    fn save_thread(&mut self, url: &str, state: &ThreadState) -> StorageResult<()>;

    /// Inserts or replaces many thread records in a single atomic write
    fn save_threads(&mut self, states: &HashMap<String, ThreadState>) -> StorageResult<()>;

    /// Returns stored seed URLs in the order they were first saved
    fn thread_urls(&self) -> StorageResult<Vec<String>>;

    // ===== Job Metadata =====

    /// Reads a job-level value
    fn get_meta(&self, key: &str) -> StorageResult<Option<String>>;

    /// Writes a job-level value
    fn set_meta(&mut self, key: &str, value: &str) -> StorageResult<()>;
}
