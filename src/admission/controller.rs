//! Admission Controller Module
//!
//! Sliding-window request admission per (endpoint, client) pair.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::admission::{AdmissionWindow, EndpointPolicy};
use crate::clock::{SharedClock, SystemClock};
use crate::error::Result;

/// Client id used when a caller does not identify itself
pub const DEFAULT_CLIENT_ID: &str = "default";

// == Usage Stats ==
/// Read-only snapshot of one client's quota usage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageStats {
    pub endpoint: String,
    pub client_id: String,
    /// Requests counted in the current window
    pub current: u32,
    /// Quota of the resolved policy
    pub limit: u32,
    pub remaining: u32,
    /// When the oldest counted request leaves the window
    pub reset_time: DateTime<Utc>,
    pub retry_after_ms: u64,
}

// == Admission Controller ==
/// Decides whether a request may be issued under its endpoint's quota.
///
/// The window slides with the clock: a request counts against the quota for
/// exactly `window_ms` after it was admitted.
#[derive(Debug)]
pub struct AdmissionController {
    /// Explicit per-endpoint policies
    policies: HashMap<String, EndpointPolicy>,
    /// Fallback for endpoints without a policy
    default_policy: EndpointPolicy,
    /// endpoint -> client -> admitted timestamps
    windows: HashMap<String, HashMap<String, AdmissionWindow>>,
    clock: SharedClock,
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionController {
    // == Constructor ==
    /// Creates a controller with the fallback policy, reading the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a controller with an explicit time source.
    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            policies: HashMap::new(),
            default_policy: EndpointPolicy::default(),
            windows: HashMap::new(),
            clock,
        }
    }

    // == Set Limit ==
    /// Installs or replaces the policy for an endpoint.
    ///
    /// Already recorded requests are kept and are judged by the new policy
    /// from the next decision on.
    pub fn set_limit(&mut self, endpoint: impl Into<String>, policy: EndpointPolicy) -> Result<()> {
        let endpoint = endpoint.into();
        policy.validate(&endpoint)?;

        info!(
            "Admission policy for '{}': {} requests per {}ms (priority {})",
            endpoint, policy.max_requests, policy.window_ms, policy.priority
        );
        self.policies.insert(endpoint, policy);
        Ok(())
    }

    /// Replaces the fallback policy.
    pub fn set_default_policy(&mut self, policy: EndpointPolicy) -> Result<()> {
        policy.validate("<default>")?;
        self.default_policy = policy;
        Ok(())
    }

    // == Policy ==
    /// Returns the policy that applies to `endpoint`.
    pub fn policy(&self, endpoint: &str) -> &EndpointPolicy {
        self.policies.get(endpoint).unwrap_or(&self.default_policy)
    }

    // == Can Proceed ==
    /// Admits and records a request if the client is under quota.
    ///
    /// A denied request is not recorded.
    pub fn can_proceed(&mut self, endpoint: &str, client_id: &str) -> bool {
        let now = self.clock.now_ms();
        let policy = *self.policy(endpoint);

        let window = self
            .windows
            .entry(endpoint.to_string())
            .or_default()
            .entry(client_id.to_string())
            .or_default();
        window.prune(now, policy.window_ms);

        if window.len() >= policy.max_requests as usize {
            debug!(
                "Admission denied for '{}' (client '{}'): {}/{} in window",
                endpoint,
                client_id,
                window.len(),
                policy.max_requests
            );
            return false;
        }

        window.record(now);
        true
    }

    // == Retry After ==
    /// Milliseconds until a request from this client would be admitted.
    ///
    /// Returns 0 when the client is under quota.
    pub fn retry_after(&self, endpoint: &str, client_id: &str) -> u64 {
        let now = self.clock.now_ms();
        self.retry_after_at(endpoint, client_id, now)
    }

    fn retry_after_at(&self, endpoint: &str, client_id: &str, now: u64) -> u64 {
        let policy = self.policy(endpoint);
        let Some(window) = self.window(endpoint, client_id) else {
            return 0;
        };

        let active: Vec<u64> = window.active(now, policy.window_ms).collect();
        let limit = policy.max_requests as usize;
        if active.len() < limit {
            return 0;
        }

        // Enough requests must age out to bring the count below the limit
        let blocking = active[active.len() - limit];
        blocking
            .saturating_add(policy.window_ms)
            .saturating_sub(now)
    }

    // == Usage Stats ==
    /// Snapshot of the client's usage without recording anything.
    pub fn usage_stats(&self, endpoint: &str, client_id: &str) -> UsageStats {
        let now = self.clock.now_ms();
        let policy = self.policy(endpoint);

        let (current, oldest) = match self.window(endpoint, client_id) {
            Some(window) => {
                let mut active = window.active(now, policy.window_ms).peekable();
                let oldest = active.peek().copied();
                (active.count() as u32, oldest)
            }
            None => (0, None),
        };
        let reset_ms = oldest.map_or(now, |t| t.saturating_add(policy.window_ms));

        UsageStats {
            endpoint: endpoint.to_string(),
            client_id: client_id.to_string(),
            current,
            limit: policy.max_requests,
            remaining: policy.max_requests.saturating_sub(current),
            reset_time: i64::try_from(reset_ms)
                .ok()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .unwrap_or_default(),
            retry_after_ms: self.retry_after_at(endpoint, client_id, now),
        }
    }

    // == Cleanup ==
    /// Prunes every tracked window and forgets clients with no active requests.
    ///
    /// Returns the number of (endpoint, client) pairs removed.
    pub fn cleanup(&mut self) -> usize {
        let now = self.clock.now_ms();
        let mut removed = 0;

        for (endpoint, clients) in self.windows.iter_mut() {
            let window_ms = self
                .policies
                .get(endpoint)
                .unwrap_or(&self.default_policy)
                .window_ms;

            clients.retain(|_, window| {
                window.prune(now, window_ms);
                if window.is_empty() {
                    removed += 1;
                    false
                } else {
                    true
                }
            });
        }
        self.windows.retain(|_, clients| !clients.is_empty());

        removed
    }

    /// Number of (endpoint, client) pairs currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.values().map(HashMap::len).sum()
    }

    fn window(&self, endpoint: &str, client_id: &str) -> Option<&AdmissionWindow> {
        self.windows.get(endpoint)?.get(client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::GovernorError;
    use std::time::Duration;

    fn controller_with(policy: EndpointPolicy) -> (AdmissionController, ManualClock) {
        let clock = ManualClock::new(1_000_000);
        let mut controller = AdmissionController::with_clock(Arc::new(clock.clone()));
        controller.set_limit("e", policy).unwrap();
        (controller, clock)
    }

    #[test]
    fn test_sliding_window_admission() {
        let (mut limiter, clock) = controller_with(EndpointPolicy::new(3, Duration::from_millis(1000)));

        assert!(limiter.can_proceed("e", DEFAULT_CLIENT_ID));
        clock.advance(Duration::from_millis(100));
        assert!(limiter.can_proceed("e", DEFAULT_CLIENT_ID));
        clock.advance(Duration::from_millis(100));
        assert!(limiter.can_proceed("e", DEFAULT_CLIENT_ID));
        clock.advance(Duration::from_millis(100));
        assert!(!limiter.can_proceed("e", DEFAULT_CLIENT_ID));

        // First request was at +0; at +1000 it has left the window
        clock.advance(Duration::from_millis(700));
        assert!(limiter.can_proceed("e", DEFAULT_CLIENT_ID));
        assert!(!limiter.can_proceed("e", DEFAULT_CLIENT_ID));
    }

    #[test]
    fn test_no_burst_at_window_edge() {
        let (mut limiter, clock) = controller_with(EndpointPolicy::new(2, Duration::from_millis(1000)));

        clock.advance(Duration::from_millis(900));
        assert!(limiter.can_proceed("e", "c"));
        assert!(limiter.can_proceed("e", "c"));

        // A fixed bucket would reset here; the sliding window does not
        clock.advance(Duration::from_millis(200));
        assert!(!limiter.can_proceed("e", "c"));
    }

    #[test]
    fn test_denied_requests_are_not_recorded() {
        let (mut limiter, clock) = controller_with(EndpointPolicy::new(1, Duration::from_millis(500)));

        assert!(limiter.can_proceed("e", "c"));
        for _ in 0..10 {
            clock.advance(Duration::from_millis(10));
            assert!(!limiter.can_proceed("e", "c"));
        }

        clock.set(1_000_500);
        assert!(limiter.can_proceed("e", "c"));
    }

    #[test]
    fn test_clients_and_endpoints_are_independent() {
        let (mut limiter, _) = controller_with(EndpointPolicy::new(1, Duration::from_secs(1)));

        assert!(limiter.can_proceed("e", "alice"));
        assert!(!limiter.can_proceed("e", "alice"));
        assert!(limiter.can_proceed("e", "bob"));
        assert!(limiter.can_proceed("other", "alice"));
        assert_eq!(limiter.tracked_clients(), 3);
    }

    #[test]
    fn test_unknown_endpoint_uses_default_policy() {
        let clock = ManualClock::new(0);
        let mut limiter = AdmissionController::with_clock(Arc::new(clock));

        for _ in 0..crate::admission::DEFAULT_MAX_REQUESTS {
            assert!(limiter.can_proceed("unregistered", DEFAULT_CLIENT_ID));
        }
        assert!(!limiter.can_proceed("unregistered", DEFAULT_CLIENT_ID));
        assert_eq!(limiter.policy("unregistered"), &EndpointPolicy::default());
    }

    #[test]
    fn test_retry_after_counts_down_to_admission() {
        let (mut limiter, clock) = controller_with(EndpointPolicy::new(3, Duration::from_millis(1000)));

        assert_eq!(limiter.retry_after("e", "c"), 0);
        limiter.can_proceed("e", "c");
        clock.advance(Duration::from_millis(200));
        limiter.can_proceed("e", "c");
        limiter.can_proceed("e", "c");
        assert!(!limiter.can_proceed("e", "c"));

        let mut previous = limiter.retry_after("e", "c");
        assert_eq!(previous, 800);
        while previous > 0 {
            clock.advance(Duration::from_millis(50));
            let next = limiter.retry_after("e", "c");
            assert!(next < previous, "retry_after must strictly decrease");
            assert!(next <= 1000);
            if next > 0 {
                assert!(!limiter.can_proceed("e", "c"));
            }
            previous = next;
        }
        assert!(limiter.can_proceed("e", "c"));
    }

    #[test]
    fn test_retry_after_does_not_mutate() {
        let (mut limiter, clock) = controller_with(EndpointPolicy::new(1, Duration::from_millis(100)));

        limiter.can_proceed("e", "c");
        clock.advance(Duration::from_millis(500));
        assert_eq!(limiter.retry_after("e", "c"), 0);
        // Stale event is still stored until a decision or cleanup prunes it
        assert_eq!(limiter.tracked_clients(), 1);
        assert_eq!(limiter.cleanup(), 1);
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_retry_after_when_limit_lowered() {
        let (mut limiter, clock) = controller_with(EndpointPolicy::new(3, Duration::from_millis(1000)));

        limiter.can_proceed("e", "c");
        clock.advance(Duration::from_millis(100));
        limiter.can_proceed("e", "c");
        clock.advance(Duration::from_millis(100));
        limiter.can_proceed("e", "c");

        limiter
            .set_limit("e", EndpointPolicy::new(2, Duration::from_millis(1000)))
            .unwrap();

        // Two of the three recorded requests must age out
        assert_eq!(limiter.retry_after("e", "c"), 900);
        clock.advance(Duration::from_millis(899));
        assert!(!limiter.can_proceed("e", "c"));
        clock.advance(Duration::from_millis(1));
        assert_eq!(limiter.retry_after("e", "c"), 0);
        assert!(limiter.can_proceed("e", "c"));
    }

    #[test]
    fn test_usage_stats() {
        let (mut limiter, clock) = controller_with(EndpointPolicy::new(3, Duration::from_millis(1000)));

        limiter.can_proceed("e", "c");
        clock.advance(Duration::from_millis(300));
        limiter.can_proceed("e", "c");

        let stats = limiter.usage_stats("e", "c");
        assert_eq!(stats.current, 2);
        assert_eq!(stats.limit, 3);
        assert_eq!(stats.remaining, 1);
        assert_eq!(stats.retry_after_ms, 0);
        assert_eq!(stats.reset_time.timestamp_millis(), 1_001_000);

        limiter.can_proceed("e", "c");
        let stats = limiter.usage_stats("e", "c");
        assert_eq!(stats.remaining, 0);
        assert_eq!(stats.retry_after_ms, 700);
    }

    #[test]
    fn test_usage_stats_unknown_client() {
        let (limiter, _) = controller_with(EndpointPolicy::new(3, Duration::from_millis(1000)));

        let stats = limiter.usage_stats("e", "nobody");
        assert_eq!(stats.current, 0);
        assert_eq!(stats.remaining, 3);
        assert_eq!(stats.reset_time.timestamp_millis(), 1_000_000);
    }

    #[test]
    fn test_usage_stats_reset_time_beyond_range() {
        let (mut limiter, _) = controller_with(EndpointPolicy::new(1, Duration::MAX));

        limiter.can_proceed("e", "c");
        let stats = limiter.usage_stats("e", "c");
        assert_eq!(stats.current, 1);
        assert_eq!(stats.reset_time, DateTime::<Utc>::default());
    }

    #[test]
    fn test_sub_millisecond_window_is_enforced() {
        let (mut limiter, clock) = controller_with(EndpointPolicy::new(1, Duration::from_micros(500)));

        assert!(limiter.can_proceed("e", "c"));
        assert!(!limiter.can_proceed("e", "c"));
        clock.advance(Duration::from_millis(1));
        assert!(limiter.can_proceed("e", "c"));
    }

    #[test]
    fn test_set_limit_rejects_invalid_policy() {
        let mut limiter = AdmissionController::new();

        let result = limiter.set_limit("e", EndpointPolicy::new(0, Duration::from_secs(1)));
        assert!(matches!(result, Err(GovernorError::InvalidPolicy { .. })));
        assert!(limiter
            .set_default_policy(EndpointPolicy::new(1, Duration::ZERO))
            .is_err());
    }

    #[test]
    fn test_set_limit_keeps_recorded_events() {
        let (mut limiter, _) = controller_with(EndpointPolicy::new(2, Duration::from_secs(10)));

        assert!(limiter.can_proceed("e", "c"));
        assert!(limiter.can_proceed("e", "c"));

        limiter
            .set_limit("e", EndpointPolicy::new(3, Duration::from_secs(10)).with_priority(1))
            .unwrap();
        assert!(limiter.can_proceed("e", "c"));
        assert!(!limiter.can_proceed("e", "c"));
        assert_eq!(limiter.policy("e").priority, 1);
    }

    #[test]
    fn test_cleanup_keeps_active_windows() {
        let (mut limiter, clock) = controller_with(EndpointPolicy::new(2, Duration::from_millis(1000)));

        limiter.can_proceed("e", "old");
        clock.advance(Duration::from_millis(600));
        limiter.can_proceed("e", "fresh");
        limiter.can_proceed("e", "fresh");
        clock.advance(Duration::from_millis(600));

        assert_eq!(limiter.cleanup(), 1);
        assert_eq!(limiter.tracked_clients(), 1);
        // Decisions are unchanged by cleanup
        assert!(!limiter.can_proceed("e", "fresh"));
        assert!(limiter.can_proceed("e", "old"));
    }
}
