use serde::Deserialize;

/// Main configuration structure for Saunter
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
}

/// Crawler behavior configuration
///
/// Every field has a conservative default, so an empty `[crawler]` table (or
/// none at all) yields a working free-tier setup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of addresses admitted for fetching across the whole
    /// crawl, including prior runs resumed from the same database
    #[serde(rename = "max-urls")]
    pub max_urls: usize,

    /// Maximum number of fetch tasks in flight at once
    #[serde(rename = "max-workers")]
    pub max_workers: usize,

    /// Minimum time between consecutive requests to the same host
    /// (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Per-request timeout for fetches (seconds)
    #[serde(rename = "fetch-timeout-secs")]
    pub fetch_timeout_secs: u64,

    /// How long in-flight fetches may run after a shutdown request before
    /// they are abandoned (seconds)
    #[serde(rename = "shutdown-grace-secs")]
    pub shutdown_grace_secs: u64,

    /// Path to the SQLite database file holding crawl results and the
    /// persisted frontier
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Addresses the crawl starts from when the persisted frontier is empty
    pub seeds: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        CrawlerConfig {
            max_urls: 10_000,
            max_workers: 4,
            request_delay_ms: 1_000,
            fetch_timeout_secs: 10,
            shutdown_grace_secs: 10,
            database_path: "crawler.db".to_string(),
            seeds: default_seeds(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        UserAgentConfig {
            crawler_name: "saunter".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "http://example.com/bot".to_string(),
            contact_email: "crawler@example.com".to_string(),
        }
    }
}

/// Seed list used when the config names none and no persisted frontier
/// exists. A small cross-section of stable, crawl-tolerant sites.
fn default_seeds() -> Vec<String> {
    [
        "https://www.bbc.com/",
        "https://www.reuters.com/",
        "https://www.npr.org/",
        "https://www.theguardian.com/",
        "https://en.wikipedia.org/wiki/Computer_science",
        "https://en.wikipedia.org/wiki/Artificial_intelligence",
        "https://www.mit.edu/",
        "https://www.stanford.edu/",
        "https://www.usa.gov/",
        "https://www.nasa.gov/",
        "https://github.com/",
        "https://stackoverflow.com/",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
