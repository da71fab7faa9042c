//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{RunRecord, RunStatus, VisitRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Run not found: {0}")]
    RunNotFound(i64),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for storage backend implementations
///
/// The store is a single-writer resource: during a crawl it is owned
/// exclusively by the scheduler's control loop, which appends as results
/// arrive and reads back only at startup for resumption.
pub trait Store {
    // ===== Run Management =====

    /// Creates a new crawl run in the `running` state
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file, kept so a resume
    ///   under a changed configuration can be flagged
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StoreResult<i64>;

    /// Gets the most recent run, if any
    fn get_latest_run(&self) -> StoreResult<Option<RunRecord>>;

    /// Marks a run finished with the given status and a finish timestamp
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StoreResult<()>;

    // ===== Visit Records =====

    /// Persists the outcome of one fetch attempt
    ///
    /// Idempotent upsert keyed by address. `status` carries the HTTP status
    /// code, or -1 for a transport failure.
    fn save_visit_record(
        &mut self,
        address: &str,
        title: Option<&str>,
        text: Option<&str>,
        links: &[String],
        status: i32,
    ) -> StoreResult<()>;

    /// Fetches the visit record for an address, if one exists
    fn get_visit(&self, address: &str) -> StoreResult<Option<VisitRecord>>;

    /// All addresses with a visit record, used to preload the visit ledger
    /// at startup so resumed crawls never re-dispatch finished work
    fn load_visited_addresses(&self) -> StoreResult<Vec<String>>;

    /// Total number of visit records
    fn count_visits(&self) -> StoreResult<u64>;

    /// Visit counts grouped by status code, most frequent first
    fn status_breakdown(&self) -> StoreResult<Vec<(i32, u64)>>;

    /// Deletes every visit record (fresh-crawl reset)
    fn clear_visits(&mut self) -> StoreResult<()>;

    // ===== Frontier Persistence =====

    /// Records a pending address, replacing any previous priority for it
    fn upsert_frontier_entry(&mut self, address: &str, priority: u32) -> StoreResult<()>;

    /// Loads the persisted frontier in dispatch order (priority ascending,
    /// insertion order within one priority)
    ///
    /// Called once at startup; an empty result means the caller should seed
    /// the frontier from its configuration instead.
    fn load_frontier(&self) -> StoreResult<Vec<(String, u32)>>;

    /// Removes all persisted frontier entries
    ///
    /// The shutdown flush clears first, then upserts every live entry, so
    /// popped addresses never linger in the persisted frontier.
    fn clear_frontier(&mut self) -> StoreResult<()>;

    /// Number of persisted frontier entries
    fn count_frontier(&self) -> StoreResult<u64>;
}
