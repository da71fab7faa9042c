//! Saunter: a polite, resumable web crawler
//!
//! This crate implements the crawl frontier and scheduler for a breadth-leaning
//! crawler: a deduplicated priority queue of pending addresses, a per-host
//! politeness controller, and a bounded-concurrency dispatch loop that can be
//! interrupted and resumed without losing queued work.

pub mod config;
pub mod crawler;
pub mod frontier;
pub mod ledger;
pub mod politeness;
pub mod storage;

use thiserror::Error;

/// Main error type for Saunter operations
///
/// Fetch failures never surface here: they fold into visit records with a
/// status sentinel instead. This enum covers the failures that actually end
/// a crawl.
#[derive(Debug, Error)]
pub enum SaunterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("Frontier error: {0}")]
    Frontier(#[from] frontier::FrontierError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid seed URL in config: {0}")]
    InvalidSeed(String),
}

/// Result type alias for Saunter operations
pub type Result<T> = std::result::Result<T, SaunterError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use frontier::{FrontierEntry, PriorityFrontier};
pub use ledger::VisitLedger;
pub use politeness::PolitenessController;
