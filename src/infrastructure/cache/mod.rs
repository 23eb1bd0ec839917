//! Caching layer for fast short code resolution.
//!
//! Provides a [`CacheService`] trait with three implementations:
//! - [`MokaCache`] - Bounded in-process cache with a sliding window
//! - [`RedisCache`] - Redis-backed cache shared between instances
//! - [`NullCache`] - No-op implementation for disabled caching

mod moka_cache;
mod null_cache;
mod redis_cache;
mod service;

pub use moka_cache::{CacheSettings, MokaCache};
pub use null_cache::NullCache;
pub use redis_cache::RedisCache;
pub use service::{CacheError, CacheResult, CacheService};

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Lifetime for an entry: the sliding window, cut short by the record's expiry.
///
/// Returns `None` when the record has already expired and must not be cached.
pub(crate) fn entry_lifetime(
    window: Duration,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<Duration> {
    match expires_at {
        None => Some(window),
        Some(expires_at) => {
            let remaining = (expires_at - now).to_std().ok()?;
            if remaining.is_zero() {
                None
            } else {
                Some(remaining.min(window))
            }
        }
    }
}
