//! Cache service trait and error types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    ConnectionError(String),
    #[error("Cache operation error: {0}")]
    OperationError(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Trait for caching short code to URL mappings.
///
/// Implementations must be thread-safe and fail open: a broken backend
/// degrades to store lookups instead of failing the request.
///
/// Entries use a sliding window that restarts on every read and write. When
/// the record has an `expires_at`, the entry never outlives it.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::MokaCache`] - Bounded in-process cache
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed shared cache
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Retrieves the original URL for a short code and refreshes its window.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(url))` on cache hit
    /// - `Ok(None)` on cache miss or error (fail-open behavior)
    async fn get_url(&self, short_code: &str) -> CacheResult<Option<String>>;

    /// Stores a URL mapping.
    ///
    /// # Arguments
    ///
    /// - `short_code` - The short code key
    /// - `original_url` - The full URL to cache
    /// - `expires_at` - Record expiry; the entry is dropped no later than this
    async fn set_url(
        &self,
        short_code: &str,
        original_url: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> CacheResult<()>;
}
