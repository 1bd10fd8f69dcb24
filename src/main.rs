//! Request Governor host
//!
//! Runs a governor against a simulated upstream data API and reports how
//! many calls were served from cache, admitted, or denied.

use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use request_governor::{
    spawn_housekeeping_task, CallOptions, GovernedCallError, Governor, GovernorConfig,
    DEFAULT_CLIENT_ID,
};

/// Endpoints the simulated workload calls, with the tag of the data they return
const WORKLOAD: &[(&str, &str, &str)] = &[
    ("fixtures", "fixtures:team:33", "team:33"),
    ("fixtures", "fixtures:team:40", "team:40"),
    ("standings", "standings:league:39", "league:39"),
    ("players", "players:team:33", "team:33"),
    ("odds", "odds:fixture:1035", "fixture:1035"),
];

/// Every n-th upstream call fails
const FAILURE_EVERY: u64 = 7;

/// Every n-th tick, data for one team changes upstream
const INVALIDATE_EVERY: u64 = 25;

#[derive(Error, Debug)]
#[error("upstream '{endpoint}' returned status {status}")]
struct UpstreamError {
    endpoint: String,
    status: u16,
}

/// Stand-in for a slow upstream fetch.
async fn fetch_upstream(endpoint: &str, key: &str, call: u64) -> Result<Value, UpstreamError> {
    tokio::time::sleep(Duration::from_millis(20)).await;
    if call % FAILURE_EVERY == 0 {
        return Err(UpstreamError {
            endpoint: endpoint.to_string(),
            status: 503,
        });
    }
    Ok(json!({
        "endpoint": endpoint,
        "key": key,
        "fetched_at": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Main entry point for the governor host.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the governor and register endpoint policies
/// 4. Start background housekeeping task
/// 5. Drive the simulated workload until SIGINT/SIGTERM
/// 6. Report final statistics
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "request_governor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting request governor host");

    let config = GovernorConfig::from_env();
    info!(
        "Configuration loaded: max_entries={}, default_ttl={}ms, default_limit={}/{}ms, cleanup_interval={}s, endpoint_limits={}",
        config.max_entries,
        config.default_ttl_ms,
        config.default_max_requests,
        config.default_window_ms,
        config.cleanup_interval,
        config.endpoint_limits.len()
    );

    let governor: Governor<Value> = Governor::from_config(&config)?;
    info!("Governor initialized");

    let housekeeping = spawn_housekeeping_task(
        governor.clone(),
        Duration::from_secs(config.cleanup_interval.max(1)),
    );

    tokio::select! {
        _ = run_workload(&governor) => {}
        _ = shutdown_signal() => {}
    }

    housekeeping.abort();
    warn!("Housekeeping task aborted");

    let stats = governor.cache_stats().await;
    info!(
        "Cache: hits={}, misses={}, hit_rate={:.2}, evictions={}, expirations={}, tag_invalidations={}, entries={}, approx_bytes={}",
        stats.hits,
        stats.misses,
        stats.hit_rate(),
        stats.evictions,
        stats.expirations,
        stats.tag_invalidations,
        stats.total_entries,
        stats.approx_bytes
    );
    for endpoint in ["fixtures", "standings", "players", "odds"] {
        let usage = governor.usage_stats(endpoint, DEFAULT_CLIENT_ID).await;
        info!("Usage: {}", serde_json::to_string(&usage)?);
    }

    info!("Shutdown complete");
    Ok(())
}

/// Issues governed calls on a fixed tick, forever.
async fn run_workload(governor: &Governor<Value>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    let mut tick: u64 = 0;
    let mut upstream_calls: u64 = 0;

    loop {
        ticker.tick().await;
        tick += 1;

        let (endpoint, key, tag) = WORKLOAD[(tick as usize) % WORKLOAD.len()];
        let options = CallOptions::new(endpoint)
            .with_ttl(Duration::from_secs(5))
            .with_tag(tag);

        let result = governor
            .governed_call(
                key,
                || {
                    upstream_calls += 1;
                    fetch_upstream(endpoint, key, upstream_calls)
                },
                options,
            )
            .await;

        match result {
            Ok(value) => debug!("{} -> {}", key, value),
            Err(GovernedCallError::AdmissionDenied(denied)) => {
                info!("{}: {}", key, denied);
            }
            Err(e) => warn!("{}: {}", key, e),
        }

        if tick % INVALIDATE_EVERY == 0 {
            let removed = governor.invalidate_tag("team:33").await;
            info!("Upstream change for team:33, invalidated {} entries", removed);
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
