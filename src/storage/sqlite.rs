//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::ThreadState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use url::Url;

const THREAD_COLUMNS: &str = "url, title, base_filename, current_url, total_pages, file_part,
     done, missing_strikes, stalled";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file; created if absent
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Raw column values of a `threads` row
struct ThreadRow {
    url: String,
    title: String,
    base_filename: String,
    current_url: Option<String>,
    total_pages: u32,
    file_part: u32,
    done: bool,
    missing_strikes: u32,
    stalled: bool,
}

impl ThreadRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            url: row.get(0)?,
            title: row.get(1)?,
            base_filename: row.get(2)?,
            current_url: row.get(3)?,
            total_pages: row.get(4)?,
            file_part: row.get(5)?,
            done: row.get(6)?,
            missing_strikes: row.get(7)?,
            stalled: row.get(8)?,
        })
    }

    fn into_state(self) -> StorageResult<(String, ThreadState)> {
        let current_url = match self.current_url {
            Some(raw) => Some(Url::parse(&raw).map_err(|e| StorageError::Corrupt {
                key: self.url.clone(),
                message: format!("unparseable cursor '{}': {}", raw, e),
            })?),
            None => None,
        };

        let state = ThreadState {
            title: self.title,
            base_filename: self.base_filename,
            current_url,
            total_pages: self.total_pages,
            file_part: self.file_part,
            done: self.done,
            missing_strikes: self.missing_strikes,
            stalled: self.stalled,
        };

        Ok((self.url, state))
    }
}

fn upsert_thread(conn: &Connection, url: &str, state: &ThreadState) -> StorageResult<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO threads
         (url, title, base_filename, current_url, total_pages, file_part, done,
          missing_strikes, stalled, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(url) DO UPDATE SET
            title = excluded.title,
            base_filename = excluded.base_filename,
            current_url = excluded.current_url,
            total_pages = excluded.total_pages,
            file_part = excluded.file_part,
            done = excluded.done,
            missing_strikes = excluded.missing_strikes,
            stalled = excluded.stalled,
            updated_at = excluded.updated_at",
        params![
            url,
            state.title,
            state.base_filename,
            state.current_url.as_ref().map(Url::as_str),
            state.total_pages,
            state.file_part,
            state.done,
            state.missing_strikes,
            state.stalled,
            now,
        ],
    )?;
    Ok(())
}

impl Storage for SqliteStorage {
    // ===== Thread Records =====

    fn load_threads(&self) -> StorageResult<HashMap<String, ThreadState>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM threads", THREAD_COLUMNS))?;

        let rows = stmt
            .query_map([], ThreadRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(ThreadRow::into_state).collect()
    }

    fn get_thread(&self, url: &str) -> StorageResult<Option<ThreadState>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM threads WHERE url = ?1",
            THREAD_COLUMNS
        ))?;

        let row = stmt
            .query_row(params![url], ThreadRow::from_row)
            .optional()?;

        row.map(|r| r.into_state().map(|(_, state)| state))
            .transpose()
    }

    fn save_thread(&mut self, url: &str, state: &ThreadState) -> StorageResult<()> {
        upsert_thread(&self.conn, url, state)
    }

    fn save_threads(&mut self, states: &HashMap<String, ThreadState>) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        for (url, state) in states {
            upsert_thread(&tx, url, state)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn thread_urls(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT url FROM threads ORDER BY rowid")?;
        let urls = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(urls)
    }

    // ===== Job Metadata =====

    fn get_meta(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM job_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_meta(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO job_meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}
