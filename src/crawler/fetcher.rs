//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch page content
//! - Error classification (HTTP status vs. transport failure)

use crate::config::UserAgentConfig;
use reqwest::Client;
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchOutcome {
    /// Successfully fetched the page (any 2xx status)
    Success {
        /// HTTP status code
        status: u16,
        /// Page body content
        body: String,
    },

    /// The server answered with a non-2xx status
    HttpError {
        /// The HTTP status code
        status: u16,
    },

    /// The request never produced an HTTP response (DNS failure, connection
    /// refused, timeout, TLS error)
    Transport {
        /// Error description
        error: String,
    },
}

impl FetchOutcome {
    /// The status code to record for this outcome
    ///
    /// Transport failures have no HTTP status; they are recorded as -1 so
    /// they stay distinguishable from every real status code.
    pub fn record_status(&self) -> i32 {
        match self {
            FetchOutcome::Success { status, .. } => i32::from(*status),
            FetchOutcome::HttpError { status } => i32::from(*status),
            FetchOutcome::Transport { .. } => -1,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Per-request timeout covering the whole fetch
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use saunter::config::UserAgentConfig;
/// use saunter::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "saunter".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(10)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and classifies the result
///
/// Redirects are followed by the client (up to its default hop limit); the
/// status and body describe the final response. Non-2xx responses are not
/// errors at this layer, they are outcomes the caller records.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
///
/// # Returns
///
/// A FetchOutcome indicating success or the type of failure
pub async fn fetch_url(client: &Client, url: &str) -> FetchOutcome {
    match client.get(url).send().await {
        Ok(response) => {
            let status = response.status();

            if !status.is_success() {
                return FetchOutcome::HttpError {
                    status: status.as_u16(),
                };
            }

            match response.text().await {
                Ok(body) => FetchOutcome::Success {
                    status: status.as_u16(),
                    body,
                },
                Err(e) => FetchOutcome::Transport {
                    error: e.to_string(),
                },
            }
        }
        Err(e) => {
            // Classify error
            if e.is_timeout() {
                FetchOutcome::Transport {
                    error: "Request timeout".to_string(),
                }
            } else if e.is_connect() {
                FetchOutcome::Transport {
                    error: "Connection refused".to_string(),
                }
            } else {
                FetchOutcome::Transport {
                    error: e.to_string(),
                }
            }
        }
    }
}
