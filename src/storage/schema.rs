//! Database schema definitions
//!
//! This module contains the SQL schema for a job's progress database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per thread, keyed by the thread's seed URL
CREATE TABLE IF NOT EXISTS threads (
    url TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    base_filename TEXT NOT NULL,
    current_url TEXT,
    total_pages INTEGER NOT NULL DEFAULT 0,
    file_part INTEGER NOT NULL DEFAULT 1,
    done INTEGER NOT NULL DEFAULT 0,
    missing_strikes INTEGER NOT NULL DEFAULT 0,
    stalled INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL,
    CHECK ((done = 1) = (current_url IS NULL)),
    CHECK (file_part >= 1)
);

-- Job-level facts (recipe name, recipe fingerprint, first start)
CREATE TABLE IF NOT EXISTS job_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
