//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching and outcome classification
//! - HTML extraction (title, text, links)
//! - The scheduling loop with its bounded worker pool

mod extractor;
mod fetcher;
mod scheduler;

pub use extractor::{extract_page, ExtractedPage};
pub use fetcher::{build_http_client, fetch_url, FetchOutcome};
pub use scheduler::{run_crawl, Scheduler, DISCOVERED_PRIORITY, SEED_PRIORITY};
