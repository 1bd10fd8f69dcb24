//! Request Governor - client-side governance for rate-limited upstream APIs
//!
//! Combines a sliding-window admission controller with a tagged TTL result
//! cache. `Governor::governed_call` serves cache hits for free and charges
//! quota only for real upstream calls.

pub mod admission;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod governor;
pub mod tasks;

pub use admission::{AdmissionController, EndpointPolicy, UsageStats, DEFAULT_CLIENT_ID};
pub use cache::{CacheOptions, CacheStats, ResultCache};
pub use config::GovernorConfig;
pub use error::{AdmissionDenied, GovernedCallError, GovernorError};
pub use governor::{CallOptions, Governor};
pub use tasks::spawn_housekeeping_task;
