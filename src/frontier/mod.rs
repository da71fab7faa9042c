//! The crawl frontier: a deduplicated, priority-ordered queue of pending addresses
//!
//! This module handles:
//! - Priority ordering with strict FIFO among equal priorities
//! - Address-level deduplication (first insertion wins)
//! - Lazy deletion: superseded heap entries are skipped on pop instead of
//!   being removed in place

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use thiserror::Error;

/// Frontier-level errors
#[derive(Debug, Error)]
pub enum FrontierError {
    /// No live entries remain. A control-loop signal, not a user-facing
    /// failure.
    #[error("pop from an empty frontier")]
    Empty,

    /// The liveness index claims entries the heap no longer holds. The
    /// frontier can no longer guarantee its dedup invariant.
    #[error("frontier liveness index out of sync: {residual} live entries missing from the heap")]
    IndexCorrupt { residual: usize },
}

/// An address queued for fetching with priority information
#[derive(Debug, Clone)]
pub struct FrontierEntry {
    /// The absolute URL to fetch
    pub address: String,

    /// Priority value (lower is higher priority; seeds are 1, discovered
    /// links are 2)
    pub priority: u32,

    /// Insertion counter, giving FIFO order among equal priorities
    pub sequence: u64,
}

// Implement ordering traits for the priority queue.
// Lower priority values are popped first from the BinaryHeap; within one
// priority, lower sequence numbers (earlier insertions) are popped first.
impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse comparison so lower values come first
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for FrontierEntry {}

/// Deduplicated priority queue over pending addresses
///
/// A binary heap keyed by (priority, insertion counter) gives O(log n)
/// insertion and extraction. Removal-by-address is never done inside the
/// heap; instead an auxiliary liveness index maps each address to the
/// sequence number of its single live entry, and `pop` silently discards any
/// heap entry whose sequence the index no longer vouches for. `size` reads
/// the index, so stale heap entries never count.
pub struct PriorityFrontier {
    heap: BinaryHeap<FrontierEntry>,
    live: HashMap<String, u64>,
    counter: u64,
}

impl PriorityFrontier {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: HashMap::new(),
            counter: 0,
        }
    }

    /// Adds an address to the frontier
    ///
    /// A no-op if a live entry for the address already exists: the first
    /// insertion's priority wins and later calls are silently dropped. This
    /// is the idempotent re-insertion guarantee the control loop relies on
    /// when re-discovered links come back from workers.
    pub fn add(&mut self, address: &str, priority: u32) {
        if self.live.contains_key(address) {
            return;
        }

        let sequence = self.counter;
        self.counter += 1;

        self.live.insert(address.to_string(), sequence);
        self.heap.push(FrontierEntry {
            address: address.to_string(),
            priority,
            sequence,
        });
    }

    /// Removes and returns the most urgent live entry
    ///
    /// Lower priority values are returned first; among equal priorities,
    /// insertion order is preserved. Stale heap entries left behind by lazy
    /// deletion are skipped without counting toward liveness.
    pub fn pop(&mut self) -> Result<FrontierEntry, FrontierError> {
        while let Some(entry) = self.heap.pop() {
            match self.live.get(&entry.address) {
                Some(&sequence) if sequence == entry.sequence => {
                    self.live.remove(&entry.address);
                    return Ok(entry);
                }
                // Tombstoned or superseded entry, discard and keep going
                _ => continue,
            }
        }

        if self.live.is_empty() {
            Err(FrontierError::Empty)
        } else {
            Err(FrontierError::IndexCorrupt {
                residual: self.live.len(),
            })
        }
    }

    /// Number of live entries, O(1)
    pub fn size(&self) -> usize {
        self.live.len()
    }

    /// Returns whether any live entries remain
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Snapshot of live entries as (address, priority) pairs, for persisting
    /// the frontier across restarts
    ///
    /// Entries come back in dispatch order (priority, then insertion order),
    /// so writing them to the store one by one preserves FIFO ties on reload.
    pub fn live_entries(&self) -> Vec<(String, u32)> {
        let mut entries: Vec<&FrontierEntry> = self
            .heap
            .iter()
            .filter(|entry| self.live.get(&entry.address) == Some(&entry.sequence))
            .collect();
        entries.sort_by_key(|entry| (entry.priority, entry.sequence));

        entries
            .into_iter()
            .map(|entry| (entry.address.clone(), entry.priority))
            .collect()
    }
}

impl Default for PriorityFrontier {
    fn default() -> Self {
        Self::new()
    }
}
