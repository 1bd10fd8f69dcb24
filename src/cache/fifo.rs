//! FIFO Tracker Module
//!
//! Tracks insertion order of cache keys for eviction.

use std::collections::{BTreeMap, HashMap};

// == FIFO Tracker ==
/// Tracks key insertion order for FIFO eviction.
///
/// Every pushed key gets an increasing sequence number:
/// - Lowest sequence = Oldest insertion
/// - Highest sequence = Newest insertion
///
/// Removal and eviction are O(log n). Replacing an existing key keeps its
/// place in the queue.
#[derive(Debug, Default)]
pub struct FifoTracker {
    /// Sequence number -> key, in insertion order
    order: BTreeMap<u64, String>,
    /// Key -> sequence number
    positions: HashMap<String, u64>,
    next_seq: u64,
}

impl FifoTracker {
    // == Constructor ==
    /// Creates a new empty FIFO tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Push ==
    /// Records a newly inserted key at the back of the queue.
    ///
    /// Pushing a key that is already tracked leaves its position unchanged.
    pub fn push(&mut self, key: &str) {
        if self.positions.contains_key(key) {
            return;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key.to_string());
        self.positions.insert(key.to_string(), seq);
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &str) {
        if let Some(seq) = self.positions.remove(key) {
            self.order.remove(&seq);
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the oldest inserted key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.positions.remove(&key);
        Some(key)
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.order.clear();
        self.positions.clear();
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[cfg(test)]
    fn peek_oldest(&self) -> Option<&String> {
        self.order.values().next()
    }

    #[cfg(test)]
    fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }
}
