//! Configuration module for Saunter
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every setting has a default, so a missing or empty config file still produces
//! a usable free-tier setup.
//!
//! # Example
//!
//! ```no_run
//! use saunter::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("saunter.toml")).unwrap();
//! println!("Crawling with {} workers", config.crawler.max_workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
