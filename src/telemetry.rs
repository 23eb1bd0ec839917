//! Logging setup and service metrics.
//!
//! Nothing here is global state owned by the library: [`init_tracing`] is
//! called once by the binary, and [`ShortenerMetrics`] is built by the caller
//! and handed to the service and the click worker.

use metrics::{Counter, counter};
use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber.
///
/// `log_level` is used when `RUST_LOG` is not set. `log_format` is `text`
/// or `json`.
///
/// # Errors
///
/// Returns an error if the filter does not parse or a subscriber is already set.
pub fn init_tracing(log_level: &str, log_format: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_level))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if log_format == "json" {
        builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install subscriber: {e}"))?;
    } else {
        builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install subscriber: {e}"))?;
    }

    Ok(())
}

/// Counters emitted by the shortener service and click worker.
///
/// Handles are resolved against the `metrics` recorder installed when the
/// struct is built; with no recorder installed they are no-ops.
#[derive(Clone)]
pub struct ShortenerMetrics {
    pub created: Counter,
    pub cache_hits: Counter,
    pub cache_misses: Counter,
    pub clicks_enqueued: Counter,
    pub clicks_dropped: Counter,
    pub clicks_applied: Counter,
    pub click_failures: Counter,
}

impl ShortenerMetrics {
    pub fn new() -> Self {
        Self {
            created: counter!("short_urls_created_total"),
            cache_hits: counter!("short_url_cache_hits_total"),
            cache_misses: counter!("short_url_cache_misses_total"),
            clicks_enqueued: counter!("short_url_clicks_enqueued_total"),
            clicks_dropped: counter!("short_url_clicks_dropped_total"),
            clicks_applied: counter!("short_url_clicks_applied_total"),
            click_failures: counter!("short_url_click_failures_total"),
        }
    }

    /// Metrics that discard every increment.
    pub fn noop() -> Self {
        Self {
            created: Counter::noop(),
            cache_hits: Counter::noop(),
            cache_misses: Counter::noop(),
            clicks_enqueued: Counter::noop(),
            clicks_dropped: Counter::noop(),
            clicks_applied: Counter::noop(),
            click_failures: Counter::noop(),
        }
    }
}

impl Default for ShortenerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
