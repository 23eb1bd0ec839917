#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use short_url::prelude::*;

/// Service over the in-memory store, with direct access to the store and
/// the click worker handle.
pub struct TestHarness {
    pub service: ShortenerService<InMemoryShortUrlRepository>,
    pub repository: Arc<InMemoryShortUrlRepository>,
    pub worker: JoinHandle<()>,
}

impl TestHarness {
    /// Drops the service so the click queue closes, then waits for the
    /// worker to finish applying queued clicks.
    pub async fn drain(self) -> Arc<InMemoryShortUrlRepository> {
        drop(self.service);
        self.worker.await.unwrap();
        self.repository
    }
}

pub fn harness() -> TestHarness {
    harness_with(ClickWorkerSettings::default())
}

pub fn harness_with(settings: ClickWorkerSettings) -> TestHarness {
    let repository = Arc::new(InMemoryShortUrlRepository::new());
    let cache = Arc::new(MokaCache::new(CacheSettings {
        max_capacity: 1_000,
        sliding_ttl: Duration::from_secs(60),
    }));
    let metrics = ShortenerMetrics::noop();

    let (clicks, worker) = spawn_click_worker(repository.clone(), settings, metrics.clone());
    let service = ShortenerService::new(repository.clone(), cache, clicks, metrics);

    TestHarness {
        service,
        repository,
        worker,
    }
}
