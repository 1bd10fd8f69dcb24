//! Cache Store Module
//!
//! Result cache combining HashMap storage with FIFO tracking, TTL expiration
//! and tag-based invalidation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, FifoTracker, MAX_KEY_LENGTH};
use crate::clock::{SharedClock, SystemClock};
use crate::error::{GovernorError, Result};

// == Cache Options ==
/// Per-insert options.
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// Entry lifetime; the store default applies when None
    pub ttl: Option<Duration>,
    /// Invalidation labels
    pub tags: Vec<String>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

// == Entry Info ==
/// Read-only description of a live entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub ttl_remaining_ms: u64,
    /// Sorted tag list
    pub tags: Vec<String>,
    pub size_bytes: usize,
}

// == Key Validation ==
/// Checks that a key is non-empty and within `MAX_KEY_LENGTH` bytes.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(GovernorError::InvalidKey("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(GovernorError::InvalidKey(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

// == Result Cache ==
/// Capacity-bounded value cache with TTL, tags and FIFO eviction.
#[derive(Debug)]
pub struct ResultCache<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Insertion order tracker
    fifo: FifoTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// TTL for entries inserted without one
    default_ttl: Duration,
    /// Sum of entry size estimates
    approx_bytes: usize,
    clock: SharedClock,
}

impl<V> ResultCache<V>
where
    V: Clone + Serialize,
{
    // == Constructor ==
    /// Creates a new ResultCache reading the system clock.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries the cache can hold (at least 1)
    /// * `default_ttl` - TTL for entries inserted without one
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self::with_clock(max_entries, default_ttl, Arc::new(SystemClock))
    }

    /// Creates a new ResultCache with an explicit time source.
    pub fn with_clock(max_entries: usize, default_ttl: Duration, clock: SharedClock) -> Self {
        Self {
            entries: HashMap::new(),
            fifo: FifoTracker::new(),
            stats: CacheStats::new(),
            max_entries: max_entries.max(1),
            default_ttl,
            approx_bytes: 0,
            clock,
        }
    }

    // == Set ==
    /// Stores a value, replacing any existing entry for the key.
    ///
    /// A replaced entry gets the new value, timestamp, TTL and tags but keeps
    /// its place in the eviction order. Inserting a new key into a full cache
    /// evicts the oldest inserted entry first.
    pub fn set(&mut self, key: impl Into<String>, value: V, options: CacheOptions) -> Result<()> {
        let key = key.into();
        validate_key(&key)?;

        let now = self.clock.now_ms();
        let ttl = options.ttl.unwrap_or(self.default_ttl);
        let tags: HashSet<String> = options.tags.into_iter().collect();
        let entry = CacheEntry::new(value, now, ttl, tags);

        match self.entries.get_mut(&key) {
            Some(existing) => {
                self.approx_bytes = self.approx_bytes - existing.size_bytes + entry.size_bytes;
                *existing = entry;
            }
            None => {
                if self.entries.len() >= self.max_entries {
                    self.evict_oldest();
                }
                self.approx_bytes += entry.size_bytes;
                self.fifo.push(&key);
                self.entries.insert(key, entry);
            }
        }

        self.refresh_occupancy();
        Ok(())
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns None for absent keys. Expired entries are removed and counted
    /// as misses.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();

        let expired = match self.entries.get(key) {
            None => {
                self.stats.record_miss();
                return None;
            }
            Some(entry) => entry.is_expired_at(now),
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            self.refresh_occupancy();
            return None;
        }

        self.stats.record_hit();
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Delete ==
    /// Removes an entry by key, returning whether it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.remove_entry(key).is_some();
        if removed {
            self.refresh_occupancy();
        }
        removed
    }

    // == Delete By Tag ==
    /// Removes every entry carrying `tag`.
    ///
    /// Returns the number of entries removed.
    pub fn delete_by_tag(&mut self, tag: &str) -> usize {
        let tagged: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.has_tag(tag))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &tagged {
            self.remove_entry(key);
        }

        let count = tagged.len();
        self.stats.record_tag_invalidations(count);
        self.refresh_occupancy();
        debug!("Invalidated {} entries tagged '{}'", count, tag);
        count
    }

    // == Clear ==
    /// Drops all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.fifo.clear();
        self.approx_bytes = 0;
        self.refresh_occupancy();
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        let count = expired_keys.len();
        self.stats.record_expirations(count);
        self.refresh_occupancy();
        count
    }

    // == Contains Key ==
    /// Checks for a live entry without touching statistics.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    // == Entry Info ==
    /// Describes a live entry without touching statistics.
    pub fn entry_info(&self, key: &str) -> Option<EntryInfo> {
        let now = self.clock.now_ms();
        let entry = self.entries.get(key).filter(|e| !e.is_expired_at(now))?;

        let mut tags: Vec<String> = entry.tags.iter().cloned().collect();
        tags.sort();
        Some(EntryInfo {
            ttl_remaining_ms: entry.ttl_remaining_ms(now),
            tags,
            size_bytes: entry.size_bytes,
        })
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    // == Length ==
    /// Returns the number of stored entries, including expired ones not yet
    /// removed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn evict_oldest(&mut self) {
        if let Some(evicted_key) = self.fifo.evict_oldest() {
            if let Some(entry) = self.entries.remove(&evicted_key) {
                self.approx_bytes -= entry.size_bytes;
            }
            self.stats.record_eviction();
            debug!("Evicted oldest entry '{}'", evicted_key);
        }
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.fifo.remove(key);
        self.approx_bytes -= entry.size_bytes;
        Some(entry)
    }

    fn refresh_occupancy(&mut self) {
        self.stats.set_occupancy(self.entries.len(), self.approx_bytes);
    }
}
