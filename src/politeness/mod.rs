//! Per-host politeness control
//!
//! Tracks the last contact time for every host and makes workers wait out the
//! configured delay before touching the same host again. The controller bounds
//! the *rate* of contacts per host, not their concurrency: once the delay has
//! elapsed, a second request may overlap an earlier one still in flight.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use url::Url;

/// The politeness key for an address: host, plus the port when one is given
///
/// Services on different ports of one machine count as different hosts and
/// are throttled independently.
pub fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Enforces a minimum spacing between successive contacts to the same host
///
/// Shared across worker tasks as an `Arc`; all synchronization is internal.
/// The check-and-record in `wait_for` happens under one lock acquisition, so
/// two workers racing for the same host can never both observe a stale timer
/// and contact the host inside one delay window.
pub struct PolitenessController {
    /// Minimum spacing between contacts to one host
    delay: Duration,

    /// Host name to the instant of the last recorded contact
    timers: Mutex<HashMap<String, Instant>>,
}

impl PolitenessController {
    /// Creates a controller enforcing the given per-host delay
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Waits until the host may be contacted, then claims the slot
    ///
    /// Returns once at least the configured delay has elapsed since the last
    /// recorded contact with `host`, recording "now" as the new last-contact
    /// time before returning. Hosts never contacted before incur no wait.
    ///
    /// The sleep happens outside the lock; after waking, the timer is checked
    /// again, since another worker may have claimed the slot in the meantime.
    pub async fn wait_for(&self, host: &str) {
        loop {
            let wait = {
                let mut timers = self.timers.lock().await;
                let now = Instant::now();

                match timers.get(host) {
                    Some(&last) => {
                        let elapsed = now.duration_since(last);
                        if elapsed >= self.delay {
                            timers.insert(host.to_string(), now);
                            None
                        } else {
                            Some(self.delay - elapsed)
                        }
                    }
                    None => {
                        timers.insert(host.to_string(), now);
                        None
                    }
                }
            };

            match wait {
                None => return,
                Some(remaining) => tokio::time::sleep(remaining).await,
            }
        }
    }

    /// Number of distinct hosts contacted so far
    pub async fn known_hosts(&self) -> usize {
        self.timers.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_contact_is_immediate() {
        let controller = PolitenessController::new(Duration::from_secs(5));

        let start = Instant::now();
        controller.wait_for("example.com").await;

        // An unknown host must not wait out the delay
        assert!(start.elapsed() < Duration::from_millis(500));
        assert_eq!(controller.known_hosts().await, 1);
    }

    #[tokio::test]
    async fn test_consecutive_contacts_are_spaced() {
        let delay = Duration::from_millis(150);
        let controller = PolitenessController::new(delay);

        let start = Instant::now();
        controller.wait_for("example.com").await;
        controller.wait_for("example.com").await;

        assert!(start.elapsed() >= delay);
    }

    #[tokio::test]
    async fn test_distinct_hosts_do_not_block_each_other() {
        let controller = PolitenessController::new(Duration::from_secs(2));

        let start = Instant::now();
        controller.wait_for("a.example.com").await;
        controller.wait_for("b.example.com").await;
        controller.wait_for("c.example.com").await;

        assert!(start.elapsed() < Duration::from_millis(500));
        assert_eq!(controller.known_hosts().await, 3);
    }

    #[tokio::test]
    async fn test_elapsed_delay_incurs_no_wait() {
        let delay = Duration::from_millis(100);
        let controller = PolitenessController::new(delay);

        controller.wait_for("example.com").await;
        tokio::time::sleep(delay + Duration::from_millis(20)).await;

        let start = Instant::now();
        controller.wait_for("example.com").await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_host_key_without_port() {
        let url = Url::parse("https://example.com/page").unwrap();
        assert_eq!(host_key(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_host_key_with_explicit_port() {
        let url = Url::parse("http://127.0.0.1:8080/page").unwrap();
        assert_eq!(host_key(&url), Some("127.0.0.1:8080".to_string()));
    }

    #[tokio::test]
    async fn test_concurrent_claims_serialize_per_host() {
        let delay = Duration::from_millis(100);
        let controller = Arc::new(PolitenessController::new(delay));

        let start = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..3 {
            let controller = Arc::clone(&controller);
            handles.push(tokio::spawn(async move {
                controller.wait_for("example.com").await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Three claims on one host span at least two full delay windows
        assert!(start.elapsed() >= delay * 2);
        assert_eq!(controller.known_hosts().await, 1);
    }
}
