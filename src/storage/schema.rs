//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Saunter database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- One row per fetch attempt, keyed by address
CREATE TABLE IF NOT EXISTS visits (
    address TEXT PRIMARY KEY,
    title TEXT,
    text TEXT,
    links TEXT,
    status INTEGER NOT NULL,
    fetched_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_visits_status ON visits(status);

-- Pending addresses, persisted so an interrupted crawl can resume.
-- Dispatch order is priority ascending, then rowid (insertion order).
CREATE TABLE IF NOT EXISTS frontier (
    address TEXT PRIMARY KEY,
    priority INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_frontier_priority ON frontier(priority);
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
