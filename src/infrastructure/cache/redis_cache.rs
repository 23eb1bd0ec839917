//! Redis-backed cache implementation.

use super::entry_lifetime;
use super::service::{CacheError, CacheResult, CacheService};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Stored value: the URL plus the record expiry used to cap the window.
#[derive(Debug, Serialize, Deserialize)]
struct CachedUrl {
    url: String,
    expires_at: Option<DateTime<Utc>>,
}

/// Redis cache implementation shared between service instances.
///
/// Each hit pushes the key's TTL forward by the sliding window, never past
/// the record's `expires_at`. All operations are fail-open: errors are logged
/// but don't propagate to callers.
pub struct RedisCache {
    client: ConnectionManager,
    window: Duration,
    key_prefix: String,
}

impl RedisCache {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Arguments
    ///
    /// - `redis_url` - Redis connection string (e.g., `"redis://localhost:6379"`)
    /// - `window` - Sliding window applied on every read and write
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(redis_url: &str, window: Duration) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("Connected to Redis");

        Ok(Self {
            client: manager,
            window,
            key_prefix: "url:".to_string(),
        })
    }

    /// Constructs the full Redis key with namespace prefix.
    fn build_key(&self, short_code: &str) -> String {
        format!("{}{}", self.key_prefix, short_code)
    }

    /// Window in whole seconds, at least one.
    fn ttl_seconds(lifetime: Duration) -> u64 {
        lifetime.as_secs().max(1)
    }
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get_url(&self, short_code: &str) -> CacheResult<Option<String>> {
        let key = self.build_key(short_code);
        let mut conn = self.client.clone();

        let raw = match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("Cache MISS: {}", short_code);
                return Ok(None);
            }
            Err(e) => {
                error!("Redis GET error for {}: {}", short_code, e);
                return Ok(None);
            }
        };

        let entry: CachedUrl = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discarding unreadable cache entry for {}: {}", short_code, e);
                let _ = conn.del::<_, i32>(&key).await;
                return Ok(None);
            }
        };

        let Some(lifetime) = entry_lifetime(self.window, entry.expires_at, Utc::now()) else {
            debug!("Cache EXPIRED: {}", short_code);
            let _ = conn.del::<_, i32>(&key).await;
            return Ok(None);
        };

        if let Err(e) = redis::cmd("EXPIRE")
            .arg(&key)
            .arg(Self::ttl_seconds(lifetime))
            .query_async::<()>(&mut conn)
            .await
        {
            warn!("Redis EXPIRE error for {}: {}", short_code, e);
        }

        debug!("Cache HIT: {} -> {}", short_code, entry.url);
        Ok(Some(entry.url))
    }

    async fn set_url(
        &self,
        short_code: &str,
        original_url: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> CacheResult<()> {
        let key = self.build_key(short_code);
        let mut conn = self.client.clone();

        let Some(lifetime) = entry_lifetime(self.window, expires_at, Utc::now()) else {
            debug!("Cache SKIP (already expired): {}", short_code);
            if let Err(e) = conn.del::<_, i32>(&key).await {
                warn!("Redis DEL error for {}: {}", short_code, e);
            }
            return Ok(());
        };

        let payload = serde_json::to_string(&CachedUrl {
            url: original_url.to_string(),
            expires_at,
        })
        .map_err(|e| CacheError::OperationError(e.to_string()))?;
        let ttl_seconds = Self::ttl_seconds(lifetime);

        match conn.set_ex::<_, _, ()>(&key, payload, ttl_seconds).await {
            Ok(_) => {
                debug!(
                    "Cache SET: {} -> {} (TTL: {}s)",
                    short_code, original_url, ttl_seconds
                );
                Ok(())
            }
            Err(e) => {
                warn!("Redis SET error for {}: {}", short_code, e);
                Ok(())
            }
        }
    }
}
