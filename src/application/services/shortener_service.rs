//! Short URL creation, resolution and click accounting.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::click_worker::{ClickRecorder, Recorded};
use crate::domain::entities::{NewShortUrl, ShortUrlView, UrlStats};
use crate::domain::repositories::ShortUrlRepository;
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;
use crate::telemetry::ShortenerMetrics;
use crate::utils::codec;

/// Service orchestrating the codec, the record store and the cache.
///
/// - Creation is two-phase: insert, derive the code from the id, publish it,
///   then warm the cache.
/// - Resolution is cache-aside and honors expiry once the store is consulted.
/// - Details and statistics always read the store and ignore expiry.
/// - Click accounting is queued for a background worker and never fails the
///   caller.
pub struct ShortenerService<R: ShortUrlRepository + ?Sized> {
    repository: Arc<R>,
    cache: Arc<dyn CacheService>,
    clicks: ClickRecorder,
    metrics: ShortenerMetrics,
}

impl<R: ShortUrlRepository + ?Sized> ShortenerService<R> {
    /// Creates a new shortener service.
    ///
    /// `clicks` is the sending half of the queue drained by
    /// [`crate::domain::click_worker::run_click_worker`].
    pub fn new(
        repository: Arc<R>,
        cache: Arc<dyn CacheService>,
        clicks: ClickRecorder,
        metrics: ShortenerMetrics,
    ) -> Self {
        Self {
            repository,
            cache,
            clicks,
            metrics,
        }
    }

    /// Creates a short URL for `original_url`.
    ///
    /// URL syntax is expected to be validated by the caller.
    ///
    /// # Errors
    ///
    /// Propagates any insert or code assignment failure from the store. When
    /// code assignment fails the inserted row stays pending: no lookup sees
    /// it and its id is never handed out again.
    pub async fn create_short_url(
        &self,
        original_url: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<ShortUrlView, AppError> {
        info!(
            "Creating short URL for {} with expiration {:?}",
            original_url, expires_at
        );

        let pending = self
            .repository
            .insert(NewShortUrl {
                original_url,
                expires_at,
            })
            .await
            .inspect_err(|e| warn!("Failed to insert short URL: {}", e))?;

        let id = u64::try_from(pending.id).map_err(|_| {
            AppError::internal(
                "Store returned a negative identifier",
                json!({ "id": pending.id }),
            )
        })?;
        let code = codec::encode(id);

        self.repository
            .set_code(pending.id, &code)
            .await
            .inspect_err(|e| warn!("Failed to assign code {} to id {}: {}", code, pending.id, e))?;

        let record = pending.with_code(code);

        if let Err(e) = self
            .cache
            .set_url(&record.short_code, &record.original_url, record.expires_at)
            .await
        {
            warn!("Failed to cache {}: {}", record.short_code, e);
        }

        self.metrics.created.increment(1);
        info!(
            "Created short URL {} for {} (id {})",
            record.short_code, record.original_url, record.id
        );

        Ok(record.to_view())
    }

    /// Resolves a short code to its original URL.
    ///
    /// Returns `Ok(None)` if the code is unknown or its record has expired.
    /// A cached entry is served without consulting the store.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the store lookup fails.
    pub async fn get_original_url(&self, short_code: &str) -> Result<Option<String>, AppError> {
        match self.cache.get_url(short_code).await {
            Ok(Some(url)) => {
                self.metrics.cache_hits.increment(1);
                debug!("Cache hit for short code: {}", short_code);
                return Ok(Some(url));
            }
            Ok(None) => {}
            Err(e) => warn!("Cache error for {}: {}", short_code, e),
        }
        self.metrics.cache_misses.increment(1);

        let Some(record) = self.repository.find_active_by_code(short_code).await? else {
            debug!("Short code not found or expired: {}", short_code);
            return Ok(None);
        };

        if let Err(e) = self
            .cache
            .set_url(&record.short_code, &record.original_url, record.expires_at)
            .await
        {
            warn!("Failed to cache {}: {}", short_code, e);
        }
        debug!("Added to cache: {}", short_code);

        Ok(Some(record.original_url))
    }

    /// Returns the full record view, expired or not.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the store lookup fails.
    pub async fn get_url_details(&self, short_code: &str) -> Result<Option<ShortUrlView>, AppError> {
        let record = self.repository.find_any_by_code(short_code).await?;
        Ok(record.map(|r| r.to_view()))
    }

    /// Returns click statistics, expired or not.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the store lookup fails.
    pub async fn get_url_stats(&self, short_code: &str) -> Result<Option<UrlStats>, AppError> {
        let record = self.repository.find_any_by_code(short_code).await?;
        Ok(record.map(|r| r.to_stats()))
    }

    /// Records a click without waiting for it.
    ///
    /// The click is added to the code's pending count and written by the
    /// background worker. A full queue only delays the write. Once the worker
    /// has stopped the click is dropped and logged. Nothing is reported to the
    /// caller and nothing is retried.
    pub fn increment_click_count(&self, short_code: &str) {
        match self.clicks.record(short_code) {
            Recorded::Queued | Recorded::Coalesced => {
                self.metrics.clicks_enqueued.increment(1);
            }
            Recorded::Deferred => {
                self.metrics.clicks_enqueued.increment(1);
                debug!("Click queue full, click for {} stays pending", short_code);
            }
            Recorded::Closed => {
                self.metrics.clicks_dropped.increment(1);
                warn!("Click worker stopped, dropping click for {}", short_code);
            }
        }
    }

    /// Resolves a code for a redirect and, on success, queues a click.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_original_url`]. Click accounting never fails this call.
    pub async fn resolve_and_track(&self, short_code: &str) -> Result<Option<String>, AppError> {
        let url = self.get_original_url(short_code).await?;
        if url.is_some() {
            self.increment_click_count(short_code);
        }
        Ok(url)
    }
}
