//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Visit record persistence (one row per fetch attempt)
//! - Frontier persistence for resumption after restart
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use schema::{initialize_schema, SCHEMA_SQL};
pub use sqlite::SqliteStore;
pub use traits::{Store, StoreError, StoreResult};

use crate::SaunterError;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStore)` - Successfully initialized storage
/// * `Err(SaunterError)` - Failed to open the database; fatal at startup
pub fn open_store(path: &Path) -> Result<SqliteStore, SaunterError> {
    SqliteStore::new(path)
}

/// The durable record of one fetch attempt
///
/// Exactly one row exists per address that ever concluded a fetch, whether it
/// succeeded or failed. Written once and never mutated afterward.
#[derive(Debug, Clone)]
pub struct VisitRecord {
    pub address: String,
    pub title: Option<String>,
    pub text: Option<String>,
    pub links: Vec<String>,
    /// HTTP status code, or -1 for a transport failure
    pub status: i32,
    pub fetched_at: String,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
