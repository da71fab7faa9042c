//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Store trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Store, StoreError, StoreResult};
use crate::storage::{RunRecord, RunStatus, VisitRecord};
use crate::SaunterError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

// Links are stored as one newline-joined column. A newline can never occur
// inside a valid URL, unlike a comma.
const LINK_SEPARATOR: &str = "\n";

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(SaunterError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SaunterError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        // Initialize schema
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, SaunterError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn read_run_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
        Ok(RunRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            config_hash: row.get(3)?,
            status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                .unwrap_or(RunStatus::Running),
        })
    }
}

impl Store for SqliteStore {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StoreResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_latest_run(&self) -> StoreResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
        )?;

        let run = stmt.query_row([], Self::read_run_row).optional()?;

        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;

        if updated == 0 {
            return Err(StoreError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Visit Records =====

    fn save_visit_record(
        &mut self,
        address: &str,
        title: Option<&str>,
        text: Option<&str>,
        links: &[String],
        status: i32,
    ) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let joined = if links.is_empty() {
            None
        } else {
            Some(links.join(LINK_SEPARATOR))
        };

        self.conn.execute(
            "INSERT OR REPLACE INTO visits (address, title, text, links, status, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![address, title, text, joined, status, now],
        )?;
        Ok(())
    }

    fn get_visit(&self, address: &str) -> StoreResult<Option<VisitRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT address, title, text, links, status, fetched_at FROM visits WHERE address = ?1",
        )?;

        let record = stmt
            .query_row(params![address], |row| {
                let links: Option<String> = row.get(3)?;
                Ok(VisitRecord {
                    address: row.get(0)?,
                    title: row.get(1)?,
                    text: row.get(2)?,
                    links: links
                        .map(|joined| {
                            joined
                                .split(LINK_SEPARATOR)
                                .map(|s| s.to_string())
                                .collect()
                        })
                        .unwrap_or_default(),
                    status: row.get(4)?,
                    fetched_at: row.get(5)?,
                })
            })
            .optional()?;

        Ok(record)
    }

    fn load_visited_addresses(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT address FROM visits")?;

        let addresses = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(addresses)
    }

    fn count_visits(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM visits", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn status_breakdown(&self) -> StoreResult<Vec<(i32, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*) as count FROM visits GROUP BY status ORDER BY count DESC",
        )?;

        let breakdown = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(breakdown)
    }

    fn clear_visits(&mut self) -> StoreResult<()> {
        self.conn.execute("DELETE FROM visits", [])?;
        Ok(())
    }

    // ===== Frontier Persistence =====

    fn upsert_frontier_entry(&mut self, address: &str, priority: u32) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO frontier (address, priority) VALUES (?1, ?2)",
            params![address, priority],
        )?;
        Ok(())
    }

    fn load_frontier(&self) -> StoreResult<Vec<(String, u32)>> {
        // rowid preserves insertion order within one priority level
        let mut stmt = self
            .conn
            .prepare("SELECT address, priority FROM frontier ORDER BY priority ASC, rowid ASC")?;

        let frontier = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(frontier)
    }

    fn clear_frontier(&mut self) -> StoreResult<()> {
        self.conn.execute("DELETE FROM frontier", [])?;
        Ok(())
    }

    fn count_frontier(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM frontier", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
