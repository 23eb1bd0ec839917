//! No-op cache implementation for testing or disabled caching.

use super::service::{CacheResult, CacheService};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

/// A cache implementation that does nothing.
///
/// Used when caching is disabled or Redis is unreachable at startup. Every
/// lookup is a miss, so resolution always consults the store.
pub struct NullCache;

impl NullCache {
    /// Creates a new NullCache instance.
    pub fn new() -> Self {
        debug!("Using NullCache (caching disabled)");
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheService for NullCache {
    async fn get_url(&self, _short_code: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set_url(
        &self,
        _short_code: &str,
        _original_url: &str,
        _expires_at: Option<DateTime<Utc>>,
    ) -> CacheResult<()> {
        Ok(())
    }
}
