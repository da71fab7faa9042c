//! The visit ledger: addresses already claimed for fetching
//!
//! Admission to the ledger is the single dedup gate of the crawl. An address
//! admitted here is dispatched at most once per database, across restarts;
//! everything else (frontier dedup, pre-filters on discovered links) is an
//! optimization layered on top of this guarantee.

use std::collections::HashSet;
use tokio::sync::Mutex;

/// Set of admitted addresses with atomic check-and-mark
///
/// Shared across the control loop and worker tasks as an `Arc`; all
/// synchronization is internal.
pub struct VisitLedger {
    visited: Mutex<HashSet<String>>,
}

impl VisitLedger {
    pub fn new() -> Self {
        Self {
            visited: Mutex::new(HashSet::new()),
        }
    }

    /// Atomically checks whether the address is new and, if so, marks it
    /// visited
    ///
    /// Returns `true` exactly once per address. Under concurrent callers the
    /// single lock acquisition guarantees that exactly one of them wins.
    pub async fn try_admit(&self, address: &str) -> bool {
        self.visited.lock().await.insert(address.to_string())
    }

    /// Whether the address has already been admitted
    pub async fn contains(&self, address: &str) -> bool {
        self.visited.lock().await.contains(address)
    }

    /// Number of admitted addresses, compared against the crawl cap
    pub async fn count(&self) -> usize {
        self.visited.lock().await.len()
    }

    /// Bulk-marks addresses as visited without admitting them for dispatch
    ///
    /// Used at startup to seed the ledger from prior runs' visit records so
    /// resumed crawls never re-dispatch finished work.
    pub async fn preload<I>(&self, addresses: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.visited.lock().await.extend(addresses);
    }
}

impl Default for VisitLedger {
    fn default() -> Self {
        Self::new()
    }
}
