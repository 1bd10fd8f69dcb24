//! Governor Module
//!
//! Composes the result cache and the admission controller into one
//! governed-call entry point.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::admission::{AdmissionController, EndpointPolicy, UsageStats, DEFAULT_CLIENT_ID};
use crate::cache::{validate_key, CacheOptions, CacheStats, ResultCache};
use crate::clock::{SharedClock, SystemClock};
use crate::config::GovernorConfig;
use crate::error::{AdmissionDenied, GovernedCallError, GovernorError, Result};

/// Thread-safe cache handle
pub type SharedCache<V> = Arc<RwLock<ResultCache<V>>>;

/// Thread-safe admission controller handle
pub type SharedLimiter = Arc<RwLock<AdmissionController>>;

// == Call Options ==
/// Options for one governed call.
#[derive(Debug, Clone)]
pub struct CallOptions {
    /// Logical endpoint charged on a cache miss
    pub endpoint: String,
    /// Client charged on a cache miss
    pub client_id: String,
    /// TTL of the cached result; the cache default applies when None
    pub ttl: Option<Duration>,
    /// Invalidation labels for the cached result
    pub tags: Vec<String>,
}

impl CallOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            ttl: None,
            tags: Vec::new(),
        }
    }

    pub fn with_client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            ttl: self.ttl,
            tags: self.tags.clone(),
        }
    }
}

// == Governor ==
/// Shared governance context: one cache and one admission controller.
///
/// Cloning is cheap and every clone sees the same state. The hosting service
/// builds one and hands clones to its request handlers.
#[derive(Debug)]
pub struct Governor<V> {
    cache: SharedCache<V>,
    limiter: SharedLimiter,
}

impl<V> Clone for Governor<V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            limiter: Arc::clone(&self.limiter),
        }
    }
}

impl<V> Governor<V>
where
    V: Clone + Serialize,
{
    // == Constructor ==
    /// Creates a governor from already configured components.
    pub fn new(cache: ResultCache<V>, limiter: AdmissionController) -> Self {
        Self {
            cache: Arc::new(RwLock::new(cache)),
            limiter: Arc::new(RwLock::new(limiter)),
        }
    }

    /// Creates a governor from configuration, reading the system clock.
    pub fn from_config(config: &GovernorConfig) -> Result<Self> {
        Self::from_config_with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a governor from configuration with an explicit time source.
    ///
    /// Every endpoint policy is validated before the governor is built.
    pub fn from_config_with_clock(config: &GovernorConfig, clock: SharedClock) -> Result<Self> {
        if config.max_entries == 0 {
            return Err(GovernorError::InvalidConfig(
                "max_entries must be positive".to_string(),
            ));
        }

        let cache = ResultCache::with_clock(
            config.max_entries,
            Duration::from_millis(config.default_ttl_ms),
            Arc::clone(&clock),
        );

        let mut limiter = AdmissionController::with_clock(clock);
        limiter.set_default_policy(EndpointPolicy::new(
            config.default_max_requests,
            Duration::from_millis(config.default_window_ms),
        ))?;
        for (endpoint, policy) in &config.endpoint_limits {
            limiter.set_limit(endpoint.clone(), *policy)?;
        }

        Ok(Self::new(cache, limiter))
    }

    // == Accessors ==
    pub fn cache(&self) -> &SharedCache<V> {
        &self.cache
    }

    pub fn limiter(&self) -> &SharedLimiter {
        &self.limiter
    }

    // == Governed Call ==
    /// Returns the cached value for `key`, or produces, caches and returns it.
    ///
    /// A cache hit never consults admission control. On a miss the request
    /// is charged against `options.endpoint` before `producer` runs; if the
    /// quota is exhausted the call fails with `AdmissionDenied` and the
    /// producer is not invoked. Producer errors are returned unchanged and
    /// nothing is cached for them. No lock is held while the producer runs.
    pub async fn governed_call<F, Fut, E>(
        &self,
        key: &str,
        producer: F,
        options: CallOptions,
    ) -> std::result::Result<V, GovernedCallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
    {
        validate_key(key).map_err(invalid_key)?;

        let cached = self.cache.write().await.get(key);
        if let Some(value) = cached {
            debug!("Cache hit for '{}'", key);
            return Ok(value);
        }

        {
            let mut limiter = self.limiter.write().await;
            if !limiter.can_proceed(&options.endpoint, &options.client_id) {
                let retry_after_ms = limiter.retry_after(&options.endpoint, &options.client_id);
                return Err(AdmissionDenied {
                    endpoint: options.endpoint,
                    client_id: options.client_id,
                    retry_after_ms,
                }
                .into());
            }
        }

        let value = producer().await.map_err(GovernedCallError::Producer)?;

        self.cache
            .write()
            .await
            .set(key, value.clone(), options.cache_options())
            .map_err(invalid_key)?;
        Ok(value)
    }

    // == Convenience ==
    /// Removes every cached entry carrying `tag`.
    pub async fn invalidate_tag(&self, tag: &str) -> usize {
        self.cache.write().await.delete_by_tag(tag)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.read().await.stats()
    }

    pub async fn usage_stats(&self, endpoint: &str, client_id: &str) -> UsageStats {
        self.limiter.read().await.usage_stats(endpoint, client_id)
    }
}

fn invalid_key<E>(err: GovernorError) -> GovernedCallError<E> {
    match err {
        GovernorError::InvalidKey(msg) => GovernedCallError::InvalidKey(msg),
        other => GovernedCallError::InvalidKey(other.to_string()),
    }
}
