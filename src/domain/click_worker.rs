//! Background worker that applies recorded clicks to the store.
//!
//! Clicks are counted per code in [`PendingClicks`]. Only the first click on
//! a code that has nothing pending sends a [`ClickEvent`] through the bounded
//! queue; later clicks on that code are merged into its count. On every event
//! the worker takes all pending counts and writes each one with a single
//! atomic increment, so a burst larger than the queue loses nothing.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::ShortUrlRepository;
use crate::telemetry::ShortenerMetrics;

/// Queue and concurrency limits for click accounting.
#[derive(Debug, Clone, Copy)]
pub struct ClickWorkerSettings {
    /// Wake-up events buffered for the worker. Clicks on a code that is
    /// already pending never take a slot.
    pub queue_capacity: usize,
    /// Increments in flight against the store at once.
    pub concurrency: usize,
}

impl Default for ClickWorkerSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            concurrency: 4,
        }
    }
}

/// Click counts per code that have not been written yet.
#[derive(Debug, Default)]
pub struct PendingClicks {
    counts: DashMap<String, i64>,
}

impl PendingClicks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one click. Returns `true` if the code had nothing pending.
    fn add(&self, code: &str) -> bool {
        if let Some(mut count) = self.counts.get_mut(code) {
            *count += 1;
            return false;
        }

        let mut count = self.counts.entry(code.to_string()).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Removes and returns the pending count for `code`.
    fn take(&self, code: &str) -> Option<i64> {
        self.counts.remove(code).map(|(_, count)| count)
    }

    fn codes(&self) -> Vec<String> {
        self.counts.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Pending count for `code`, zero if none.
    pub fn get(&self, code: &str) -> i64 {
        self.counts.get(code).map_or(0, |count| *count)
    }

    /// Number of codes with pending clicks.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// What happened to a recorded click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// First pending click on the code; the worker was notified.
    Queued,
    /// Merged into a count the worker will pick up.
    Coalesced,
    /// Queue full. The click stays pending and is written on the next flush.
    Deferred,
    /// The worker has stopped; the click is lost.
    Closed,
}

/// Producer side of click accounting, held by the service.
#[derive(Debug, Clone)]
pub struct ClickRecorder {
    pending: Arc<PendingClicks>,
    tx: mpsc::Sender<ClickEvent>,
}

impl ClickRecorder {
    pub fn new(pending: Arc<PendingClicks>, tx: mpsc::Sender<ClickEvent>) -> Self {
        Self { pending, tx }
    }

    /// Records one click without waiting.
    pub fn record(&self, code: &str) -> Recorded {
        if self.tx.is_closed() {
            return Recorded::Closed;
        }

        if !self.pending.add(code) {
            return Recorded::Coalesced;
        }

        match self.tx.try_send(ClickEvent::new(code)) {
            Ok(()) => Recorded::Queued,
            Err(TrySendError::Full(_)) => Recorded::Deferred,
            Err(TrySendError::Closed(_)) => Recorded::Closed,
        }
    }
}

/// Creates the click queue and spawns its worker on the current runtime.
///
/// The worker runs until every recorder is dropped, then writes what is
/// still pending, finishes the increments in flight and exits.
pub fn spawn_click_worker<R>(
    repository: Arc<R>,
    settings: ClickWorkerSettings,
    metrics: ShortenerMetrics,
) -> (ClickRecorder, JoinHandle<()>)
where
    R: ShortUrlRepository + ?Sized + 'static,
{
    let (tx, rx) = mpsc::channel(settings.queue_capacity);
    let pending = Arc::new(PendingClicks::new());
    let handle = tokio::spawn(run_click_worker(
        rx,
        pending.clone(),
        repository,
        settings.concurrency,
        metrics,
    ));
    (ClickRecorder::new(pending, tx), handle)
}

/// Flushes pending clicks on every event, applying at most `concurrency`
/// increments at once.
///
/// Failures are logged and counted, never retried.
pub async fn run_click_worker<R>(
    mut rx: mpsc::Receiver<ClickEvent>,
    pending: Arc<PendingClicks>,
    repository: Arc<R>,
    concurrency: usize,
    metrics: ShortenerMetrics,
) where
    R: ShortUrlRepository + ?Sized + 'static,
{
    let limiter = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut in_flight = JoinSet::new();

    while let Some(event) = rx.recv().await {
        debug!(
            code = %event.code,
            queued_ms = (Utc::now() - event.clicked_at).num_milliseconds(),
            "Flushing pending clicks"
        );
        flush(&pending, &limiter, &mut in_flight, &repository, &metrics).await;

        while in_flight.try_join_next().is_some() {}
    }

    flush(&pending, &limiter, &mut in_flight, &repository, &metrics).await;
    while in_flight.join_next().await.is_some() {}
    debug!("Click worker stopped");
}

async fn flush<R>(
    pending: &PendingClicks,
    limiter: &Arc<Semaphore>,
    in_flight: &mut JoinSet<()>,
    repository: &Arc<R>,
    metrics: &ShortenerMetrics,
) where
    R: ShortUrlRepository + ?Sized + 'static,
{
    for code in pending.codes() {
        let Ok(permit) = limiter.clone().acquire_owned().await else {
            return;
        };
        let Some(count) = pending.take(&code) else {
            continue;
        };

        let repository = repository.clone();
        let metrics = metrics.clone();
        in_flight.spawn(async move {
            apply_clicks(repository.as_ref(), &code, count, &metrics).await;
            drop(permit);
        });
    }
}

async fn apply_clicks<R>(repository: &R, code: &str, count: i64, metrics: &ShortenerMetrics)
where
    R: ShortUrlRepository + ?Sized,
{
    let result = if count == 1 {
        repository.increment_click(code).await
    } else {
        repository.increment_click_by(code, count).await
    };
    let clicks = count.unsigned_abs();

    match result {
        Ok(true) => {
            metrics.clicks_applied.increment(clicks);
            debug!(code = %code, count, "Clicks recorded");
        }
        Ok(false) => {
            metrics.click_failures.increment(clicks);
            warn!(code = %code, count, "Attempted to record clicks for non-existent short code");
        }
        Err(e) => {
            metrics.click_failures.increment(clicks);
            warn!(code = %code, count, error = %e, "Failed to record clicks");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{NewShortUrl, PendingShortUrl, ShortUrl};
    use crate::domain::repositories::MockShortUrlRepository;
    use crate::error::AppError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_pending_clicks_merge_per_code() {
        let pending = PendingClicks::new();

        assert!(pending.add("aaaaab"));
        assert!(!pending.add("aaaaab"));
        assert!(pending.add("aaaaac"));
        assert_eq!(pending.get("aaaaab"), 2);
        assert_eq!(pending.len(), 2);

        assert_eq!(pending.take("aaaaab"), Some(2));
        assert_eq!(pending.take("aaaaab"), None);
        assert!(pending.add("aaaaab"));
    }

    #[tokio::test]
    async fn test_recorder_outcomes() {
        let pending = Arc::new(PendingClicks::new());
        let (tx, mut rx) = mpsc::channel(1);
        let recorder = ClickRecorder::new(pending.clone(), tx);

        assert_eq!(recorder.record("aaaaab"), Recorded::Queued);
        assert_eq!(recorder.record("aaaaab"), Recorded::Coalesced);
        assert_eq!(recorder.record("aaaaac"), Recorded::Deferred);

        assert_eq!(rx.recv().await.unwrap().code, "aaaaab");
        assert!(rx.try_recv().is_err());
        assert_eq!(pending.get("aaaaab"), 2);
        assert_eq!(pending.get("aaaaac"), 1);

        drop(rx);
        assert_eq!(recorder.record("aaaaad"), Recorded::Closed);
        assert_eq!(pending.get("aaaaad"), 0);
    }

    #[tokio::test]
    async fn test_worker_applies_single_click() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_increment_click()
            .withf(|code| code == "aaaaab")
            .times(1)
            .returning(|_| Ok(true));
        repo.expect_increment_click_by().times(0);

        let (recorder, handle) =
            spawn_click_worker(Arc::new(repo), ClickWorkerSettings::default(), ShortenerMetrics::noop());

        recorder.record("aaaaab");
        drop(recorder);

        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_worker_writes_merged_clicks_once() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_increment_click_by()
            .withf(|code, count| code == "aaaaab" && *count == 5)
            .times(1)
            .returning(|_, _| Ok(true));

        let pending = Arc::new(PendingClicks::new());
        let (tx, rx) = mpsc::channel(8);
        let recorder = ClickRecorder::new(pending.clone(), tx);

        // all five land before the worker starts
        for _ in 0..5 {
            recorder.record("aaaaab");
        }
        drop(recorder);

        run_click_worker(rx, pending.clone(), Arc::new(repo), 4, ShortenerMetrics::noop()).await;
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_worker_swallows_failures_and_keeps_running() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_increment_click()
            .withf(|code| code == "broken")
            .times(1)
            .returning(|_| Err(AppError::internal("Database error", json!({}))));
        repo.expect_increment_click()
            .withf(|code| code == "missing")
            .times(1)
            .returning(|_| Ok(false));
        repo.expect_increment_click()
            .withf(|code| code == "aaaaab")
            .times(1)
            .returning(|_| Ok(true));

        let (recorder, handle) =
            spawn_click_worker(Arc::new(repo), ClickWorkerSettings::default(), ShortenerMetrics::noop());

        recorder.record("broken");
        recorder.record("missing");
        recorder.record("aaaaab");
        drop(recorder);

        assert!(handle.await.is_ok());
    }

    /// Sums increments and tracks how many overlap.
    #[derive(Default)]
    struct SlowRepository {
        current: AtomicUsize,
        peak: AtomicUsize,
        total: AtomicI64,
    }

    #[async_trait]
    impl ShortUrlRepository for SlowRepository {
        async fn insert(&self, _new: NewShortUrl) -> Result<PendingShortUrl, AppError> {
            unimplemented!()
        }

        async fn set_code(&self, _id: i64, _code: &str) -> Result<(), AppError> {
            unimplemented!()
        }

        async fn find_active_by_code(&self, _code: &str) -> Result<Option<ShortUrl>, AppError> {
            unimplemented!()
        }

        async fn find_any_by_code(&self, _code: &str) -> Result<Option<ShortUrl>, AppError> {
            unimplemented!()
        }

        async fn increment_click_by(&self, _code: &str, count: i64) -> Result<bool, AppError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            self.total.fetch_add(count, Ordering::SeqCst);
            Ok(true)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_worker_bounds_concurrency() {
        let repo = Arc::new(SlowRepository::default());
        let settings = ClickWorkerSettings {
            queue_capacity: 100,
            concurrency: 2,
        };

        let (recorder, handle) = spawn_click_worker(repo.clone(), settings, ShortenerMetrics::noop());

        for i in 0..20 {
            recorder.record(&format!("code{i}"));
        }
        drop(recorder);
        handle.await.unwrap();

        assert_eq!(repo.total.load(Ordering::SeqCst), 20);
        assert!(repo.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_burst_beyond_queue_capacity_is_fully_counted() {
        let repo = Arc::new(SlowRepository::default());
        let settings = ClickWorkerSettings {
            queue_capacity: 1,
            concurrency: 2,
        };

        let (recorder, handle) = spawn_click_worker(repo.clone(), settings, ShortenerMetrics::noop());

        let mut tasks = Vec::new();
        for i in 0..1_000 {
            let recorder = recorder.clone();
            tasks.push(tokio::spawn(async move {
                recorder.record(&format!("code{}", i % 7));
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        drop(recorder);
        handle.await.unwrap();

        assert_eq!(repo.total.load(Ordering::SeqCst), 1_000);
    }
}
