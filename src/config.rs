//! Configuration Module
//!
//! Handles loading governor configuration from environment variables.

use std::env;

use tracing::warn;

use crate::admission::{EndpointPolicy, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_MS};

/// Governor configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct GovernorConfig {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Default TTL in milliseconds for entries without explicit TTL
    pub default_ttl_ms: u64,
    /// Quota of the fallback admission policy
    pub default_max_requests: u32,
    /// Window of the fallback admission policy in milliseconds
    pub default_window_ms: u64,
    /// Background housekeeping interval in seconds
    pub cleanup_interval: u64,
    /// Explicit per-endpoint policies
    pub endpoint_limits: Vec<(String, EndpointPolicy)>,
}

impl GovernorConfig {
    /// Creates a new GovernorConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `DEFAULT_MAX_REQUESTS` - Fallback quota per window (default: 10)
    /// - `DEFAULT_WINDOW_MS` - Fallback window in milliseconds (default: 60000)
    /// - `CLEANUP_INTERVAL` - Housekeeping frequency in seconds (default: 60)
    /// - `ENDPOINT_LIMITS` - e.g. `fixtures=30/60000,standings=5/60000@1`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            default_ttl_ms: env_or("DEFAULT_TTL_MS", defaults.default_ttl_ms),
            default_max_requests: env_or("DEFAULT_MAX_REQUESTS", defaults.default_max_requests),
            default_window_ms: env_or("DEFAULT_WINDOW_MS", defaults.default_window_ms),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            endpoint_limits: env::var("ENDPOINT_LIMITS")
                .map(|v| parse_endpoint_limits(&v))
                .unwrap_or_default(),
        }
    }
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl_ms: 300_000,
            default_max_requests: DEFAULT_MAX_REQUESTS,
            default_window_ms: DEFAULT_WINDOW_MS,
            cleanup_interval: 60,
            endpoint_limits: Vec::new(),
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// == Endpoint Limits ==
/// Parses `endpoint=max/window_ms[@priority]` entries separated by commas.
///
/// Malformed entries are skipped with a warning. Values are not validated
/// here; zero quotas are rejected when the policies are registered.
pub fn parse_endpoint_limits(raw: &str) -> Vec<(String, EndpointPolicy)> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let parsed = entry
                .split_once('=')
                .filter(|(endpoint, _)| !endpoint.trim().is_empty())
                .and_then(|(endpoint, policy)| {
                    policy
                        .parse::<EndpointPolicy>()
                        .ok()
                        .map(|policy| (endpoint.trim().to_string(), policy))
                });
            if parsed.is_none() {
                warn!("Ignoring malformed endpoint limit '{}'", entry);
            }
            parsed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_config_default() {
        let config = GovernorConfig::default();
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.default_ttl_ms, 300_000);
        assert_eq!(config.default_max_requests, 10);
        assert_eq!(config.default_window_ms, 60_000);
        assert_eq!(config.cleanup_interval, 60);
        assert!(config.endpoint_limits.is_empty());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("MAX_ENTRIES");
        env::remove_var("DEFAULT_TTL_MS");
        env::remove_var("DEFAULT_MAX_REQUESTS");
        env::remove_var("DEFAULT_WINDOW_MS");
        env::remove_var("CLEANUP_INTERVAL");
        env::remove_var("ENDPOINT_LIMITS");

        let config = GovernorConfig::from_env();
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.default_ttl_ms, 300_000);
        assert_eq!(config.default_max_requests, 10);
        assert_eq!(config.cleanup_interval, 60);
        assert!(config.endpoint_limits.is_empty());
    }

    #[test]
    fn test_parse_endpoint_limits() {
        let limits = parse_endpoint_limits("fixtures=30/60000, standings=5/1000@1");

        assert_eq!(limits.len(), 2);
        assert_eq!(limits[0].0, "fixtures");
        assert_eq!(limits[0].1, EndpointPolicy::new(30, Duration::from_secs(60)));
        assert_eq!(limits[1].0, "standings");
        assert_eq!(limits[1].1.priority, 1);
    }

    #[test]
    fn test_parse_endpoint_limits_skips_malformed() {
        let limits = parse_endpoint_limits("good=1/100,,noequals,=2/100,bad=x/100,zero=0/100");

        let names: Vec<&str> = limits.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["good", "zero"]);
    }
}
