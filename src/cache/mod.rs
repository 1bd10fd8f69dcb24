//! Cache Module
//!
//! Provides in-memory result caching with TTL expiration, tag invalidation
//! and FIFO eviction.

use std::time::Duration;

mod entry;
mod fifo;
mod stats;
mod store;


// Re-export public types
pub use entry::{estimate_size, CacheEntry};
pub use fifo::FifoTracker;
pub use stats::CacheStats;
pub use store::{validate_key, CacheOptions, EntryInfo, ResultCache};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// TTL applied when an insert does not specify one
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Size recorded for values that cannot be serialized
pub const PLACEHOLDER_SIZE_BYTES: usize = 1024;
