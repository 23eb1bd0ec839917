//! Bounded in-process cache backed by `moka`.

use super::entry_lifetime;
use super::service::{CacheResult, CacheService};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::policy::Expiry;
use moka::future::Cache;
use std::time::{Duration, Instant};
use tracing::debug;

/// Capacity and window for the in-process cache.
#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    /// Maximum number of cached codes.
    pub max_capacity: u64,
    /// Idle time after which an entry is dropped. Restarts on every access.
    pub sliding_ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            sliding_ttl: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedUrl {
    url: String,
    expires_at: Option<DateTime<Utc>>,
}

/// Sliding expiry capped at the record's own `expires_at`.
struct SlidingExpiry {
    window: Duration,
}

impl SlidingExpiry {
    fn lifetime(&self, value: &CachedUrl) -> Option<Duration> {
        Some(entry_lifetime(self.window, value.expires_at, Utc::now()).unwrap_or(Duration::ZERO))
    }
}

impl Expiry<String, CachedUrl> for SlidingExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedUrl,
        _created_at: Instant,
    ) -> Option<Duration> {
        self.lifetime(value)
    }

    fn expire_after_read(
        &self,
        _key: &String,
        value: &CachedUrl,
        _read_at: Instant,
        _duration_until_expiry: Option<Duration>,
        _last_modified_at: Instant,
    ) -> Option<Duration> {
        self.lifetime(value)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedUrl,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        self.lifetime(value)
    }
}

/// In-process cache with bounded capacity and a sliding window.
///
/// When full, moka's admission policy decides which entry is evicted.
pub struct MokaCache {
    inner: Cache<String, CachedUrl>,
}

impl MokaCache {
    pub fn new(settings: CacheSettings) -> Self {
        let inner = Cache::builder()
            .max_capacity(settings.max_capacity)
            .expire_after(SlidingExpiry {
                window: settings.sliding_ttl,
            })
            .build();

        debug!(
            "MokaCache initialized with max capacity: {}, sliding TTL: {}s",
            settings.max_capacity,
            settings.sliding_ttl.as_secs()
        );

        Self { inner }
    }

    /// Approximate number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Applies pending evictions. Mostly useful in tests.
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }
}

impl Default for MokaCache {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}

#[async_trait]
impl CacheService for MokaCache {
    async fn get_url(&self, short_code: &str) -> CacheResult<Option<String>> {
        match self.inner.get(short_code).await {
            Some(entry) => {
                debug!("Cache HIT: {} -> {}", short_code, entry.url);
                Ok(Some(entry.url))
            }
            None => {
                debug!("Cache MISS: {}", short_code);
                Ok(None)
            }
        }
    }

    async fn set_url(
        &self,
        short_code: &str,
        original_url: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> CacheResult<()> {
        if entry_lifetime(Duration::MAX, expires_at, Utc::now()).is_none() {
            debug!("Cache SKIP (already expired): {}", short_code);
            self.inner.invalidate(short_code).await;
            return Ok(());
        }

        self.inner
            .insert(
                short_code.to_string(),
                CachedUrl {
                    url: original_url.to_string(),
                    expires_at,
                },
            )
            .await;
        debug!("Cache SET: {} -> {}", short_code, original_url);
        Ok(())
    }
}
