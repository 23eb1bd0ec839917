//! Component wiring from a validated [`Config`].
//!
//! Builds the record store, the cache and the click worker, then hands them
//! to a [`ShortenerService`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::task::JoinHandle;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

use crate::application::services::ShortenerService;
use crate::config::Config;
use crate::domain::click_worker::spawn_click_worker;
use crate::domain::repositories::ShortUrlRepository;
use crate::infrastructure::cache::{CacheService, MokaCache, NullCache, RedisCache};
use crate::infrastructure::persistence::{InMemoryShortUrlRepository, PgShortUrlRepository};
use crate::telemetry::ShortenerMetrics;

/// A fully wired shortener.
pub struct App {
    pub service: ShortenerService<dyn ShortUrlRepository>,
    /// Pool backing the store, when PostgreSQL is configured.
    pub pool: Option<PgPool>,
    click_worker: JoinHandle<()>,
}

impl App {
    /// Closes the click queue and waits until queued clicks are applied.
    pub async fn shutdown(self) {
        drop(self.service);
        if let Err(e) = self.click_worker.await {
            tracing::error!("Click worker terminated abnormally: {}", e);
        }
        if let Some(pool) = self.pool {
            pool.close().await;
        }
    }
}

/// Builds every component and spawns the click worker.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// Returns an error if PostgreSQL stays unreachable after the configured
/// retries or migrations fail. An unreachable Redis falls back to
/// [`NullCache`] instead.
pub async fn build(config: &Config) -> Result<App> {
    let metrics = ShortenerMetrics::new();

    let (repository, pool): (Arc<dyn ShortUrlRepository>, Option<PgPool>) =
        match &config.database_url {
            Some(url) => {
                let pool = connect_database(url, config).await?;
                tracing::info!("Connected to database");

                sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .context("Failed to run migrations")?;

                (
                    Arc::new(PgShortUrlRepository::new(Arc::new(pool.clone()))),
                    Some(pool),
                )
            }
            None => {
                tracing::warn!("No database configured, records are kept in memory");
                (Arc::new(InMemoryShortUrlRepository::new()), None)
            }
        };

    let cache = build_cache(config).await;

    let (clicks, click_worker) =
        spawn_click_worker(repository.clone(), config.click_worker_settings(), metrics.clone());
    tracing::info!("Click worker started");

    let service = ShortenerService::new(repository, cache, clicks, metrics);

    Ok(App {
        service,
        pool,
        click_worker,
    })
}

async fn build_cache(config: &Config) -> Arc<dyn CacheService> {
    match (config.cache_backend.as_str(), &config.redis_url) {
        ("redis", Some(redis_url)) => {
            let window = Duration::from_secs(config.cache_ttl_seconds);
            match RedisCache::connect(redis_url, window).await {
                Ok(redis) => {
                    tracing::info!("Cache enabled (Redis)");
                    Arc::new(redis)
                }
                Err(e) => {
                    tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
                    Arc::new(NullCache::new())
                }
            }
        }
        ("none", _) | ("redis", None) => {
            tracing::info!("Cache disabled (NullCache)");
            Arc::new(NullCache::new())
        }
        _ => {
            tracing::info!("Cache enabled (memory)");
            Arc::new(MokaCache::new(config.cache_settings()))
        }
    }
}

/// Connects to PostgreSQL, retrying with jittered exponential backoff.
async fn connect_database(url: &str, config: &Config) -> Result<PgPool> {
    let strategy = ExponentialBackoff::from_millis(100)
        .max_delay(Duration::from_secs(5))
        .map(jitter)
        .take(config.db_connect_retries);

    let options = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime));

    Retry::start(strategy, || {
        let options = options.clone();
        async move {
            options.connect(url).await.inspect_err(|e| {
                tracing::warn!("Database connection attempt failed: {}", e);
            })
        }
    })
    .await
    .context("Failed to connect to database")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config(cache_backend: &str) -> Config {
        Config {
            database_url: None,
            redis_url: None,
            cache_backend: cache_backend.to_string(),
            cache_max_capacity: 100,
            cache_ttl_seconds: 60,
            click_queue_capacity: 100,
            click_worker_concurrency: 2,
            base_url: "http://localhost:3000".to_string(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            db_max_connections: 1,
            db_connect_timeout: 1,
            db_idle_timeout: 1,
            db_max_lifetime: 1,
            db_connect_retries: 0,
        }
    }

    #[tokio::test]
    async fn test_build_in_memory_app() {
        let app = build(&memory_config("memory")).await.unwrap();
        assert!(app.pool.is_none());

        let view = app
            .service
            .create_short_url("https://example.com".to_string(), None)
            .await
            .unwrap();
        assert_eq!(view.short_code, "aaaaab");

        app.service.increment_click_count(&view.short_code);

        let stats = app.service.get_url_stats(&view.short_code).await.unwrap();
        assert!(stats.is_some());

        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_build_without_cache() {
        let app = build(&memory_config("none")).await.unwrap();

        let view = app
            .service
            .create_short_url("https://example.com".to_string(), None)
            .await
            .unwrap();
        let url = app.service.get_original_url(&view.short_code).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://example.com"));

        app.shutdown().await;
    }
}
