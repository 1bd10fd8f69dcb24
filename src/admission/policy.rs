//! Endpoint Policy Module
//!
//! Quota configuration for a logical upstream endpoint.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::duration_to_ms;
use crate::error::{GovernorError, Result};

/// Requests allowed per window when an endpoint has no explicit policy
pub const DEFAULT_MAX_REQUESTS: u32 = 10;

/// Window length of the fallback policy in milliseconds
pub const DEFAULT_WINDOW_MS: u64 = 60_000;

// == Endpoint Policy ==
/// Sliding-window quota for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointPolicy {
    /// Requests allowed within any window
    pub max_requests: u32,
    /// Window length in milliseconds
    pub window_ms: u64,
    /// Lower value = higher priority. Informational only.
    #[serde(default)]
    pub priority: i32,
}

impl EndpointPolicy {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window_ms: duration_to_ms(window),
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    // == Validate ==
    /// Rejects policies with a zero quota or zero window.
    pub fn validate(&self, endpoint: &str) -> Result<()> {
        if self.max_requests == 0 {
            return Err(GovernorError::InvalidPolicy {
                endpoint: endpoint.to_string(),
                reason: "max_requests must be positive".to_string(),
            });
        }
        if self.window_ms == 0 {
            return Err(GovernorError::InvalidPolicy {
                endpoint: endpoint.to_string(),
                reason: "window_ms must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for EndpointPolicy {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window_ms: DEFAULT_WINDOW_MS,
            priority: 0,
        }
    }
}

// == Parsing ==
/// Parses `max/window_ms` with an optional `@priority` suffix, e.g. `30/60000@1`.
impl FromStr for EndpointPolicy {
    type Err = GovernorError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || GovernorError::InvalidConfig(format!("Malformed policy '{}'", s));

        let (quota, priority) = match s.split_once('@') {
            Some((quota, priority)) => (quota, priority.trim().parse().map_err(|_| invalid())?),
            None => (s, 0),
        };
        let (max, window) = quota.split_once('/').ok_or_else(invalid)?;

        Ok(Self {
            max_requests: max.trim().parse().map_err(|_| invalid())?,
            window_ms: window.trim().parse().map_err(|_| invalid())?,
            priority,
        })
    }
}
