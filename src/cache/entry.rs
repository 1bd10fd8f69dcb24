//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL and tag support.

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::cache::PLACEHOLDER_SIZE_BYTES;
use crate::clock::duration_to_ms;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Time to live in milliseconds
    pub ttl_ms: u64,
    /// Labels used for bulk invalidation
    pub tags: HashSet<String>,
    /// Estimated serialized size in bytes (advisory)
    pub size_bytes: usize,
}

impl<V: Serialize> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry stamped at `now_ms`.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `now_ms` - Insertion time
    /// * `ttl` - How long the entry stays readable
    /// * `tags` - Invalidation labels
    pub fn new(value: V, now_ms: u64, ttl: Duration, tags: HashSet<String>) -> Self {
        let size_bytes = estimate_size(&value);
        Self {
            value,
            created_at: now_ms,
            ttl_ms: duration_to_ms(ttl),
            tags,
            size_bytes,
        }
    }
}

impl<V> CacheEntry<V> {
    // == Expires At ==
    /// Unix milliseconds at which the entry stops being readable.
    pub fn expires_at(&self) -> u64 {
        self.created_at.saturating_add(self.ttl_ms)
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// An entry is readable only while `now < created_at + ttl`, so it is
    /// expired from the exact instant the TTL has elapsed.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at()
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at().saturating_sub(now_ms)
    }

    // == Has Tag ==
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

// == Size Estimation ==
/// Estimates a value's size from its JSON encoding.
///
/// Falls back to `PLACEHOLDER_SIZE_BYTES` when the value cannot be serialized.
pub fn estimate_size<V: Serialize>(value: &V) -> usize {
    match serde_json::to_vec(value) {
        Ok(bytes) => bytes.len(),
        Err(e) => {
            warn!(
                "Size estimation failed, using placeholder of {} bytes: {}",
                PLACEHOLDER_SIZE_BYTES, e
            );
            PLACEHOLDER_SIZE_BYTES
        }
    }
}
