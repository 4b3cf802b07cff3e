//! The refreshable lookup cache.
//!
//! State machine over one dataset slot:
//!
//! ```text
//!   Empty ──get──▶ Loading ──ok──▶ Ready ──deadline passed──▶ Refreshing
//!     ▲               │              ▲                             │
//!     └─────err───────┘              └──────────ok / err───────────┘
//! ```
//!
//! Every transition happens under one mutex that is never held across an
//! `.await`. Loads and refreshes run in spawned tasks so that a caller going
//! away does not cancel them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use ouilookup_core::error::{OuiError, Result};
use ouilookup_core::traits::{DatasetParser, DatasetSource};
use ouilookup_core::types::Dataset;

use crate::clock::{Clock, SystemClock};
use crate::config::{CacheConfig, RefreshMode};
use crate::snapshot::Snapshot;

/// Outcome of one load attempt, `None` while it is still running.
type LoadOutcome = Option<Result<Arc<Snapshot>>>;

/// Observable lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    /// Nothing loaded; the next call loads.
    Empty,
    /// The initial load is in flight.
    Loading,
    /// A snapshot is being served.
    Ready,
    /// A snapshot is being served while its replacement is fetched.
    Refreshing,
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheState::Empty => "empty",
            CacheState::Loading => "loading",
            CacheState::Ready => "ready",
            CacheState::Refreshing => "refreshing",
        };
        f.write_str(name)
    }
}

enum Phase {
    Empty,
    /// Waiters subscribe to the attempt's outcome channel.
    Loading(watch::Receiver<LoadOutcome>),
    Ready(Arc<Snapshot>),
    Refreshing(Arc<Snapshot>),
}

impl Phase {
    fn state(&self) -> CacheState {
        match self {
            Phase::Empty => CacheState::Empty,
            Phase::Loading(_) => CacheState::Loading,
            Phase::Ready(_) => CacheState::Ready,
            Phase::Refreshing(_) => CacheState::Refreshing,
        }
    }
}

/// What a caller does after inspecting the phase.
enum Step {
    Serve(Arc<Snapshot>),
    Load(watch::Sender<LoadOutcome>, watch::Receiver<LoadOutcome>),
    Wait(watch::Receiver<LoadOutcome>),
    Refresh(Arc<Snapshot>),
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATISTICS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
struct Counters {
    loads: AtomicU64,
    load_failures: AtomicU64,
    refreshes: AtomicU64,
    refresh_failures: AtomicU64,
}

/// Cache statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Successful initial loads.
    pub loads: u64,
    /// Failed initial loads.
    pub load_failures: u64,
    /// Successful refreshes.
    pub refreshes: u64,
    /// Refreshes that kept the previous dataset.
    pub refresh_failures: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE
// ═══════════════════════════════════════════════════════════════════════════════

struct Inner {
    source: Arc<dyn DatasetSource>,
    parser: Arc<dyn DatasetParser>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    phase: Mutex<Phase>,
    counters: Counters,
}

/// Shared handle to the registry snapshot.
///
/// Cheap to clone; all clones see the same state.
#[derive(Clone)]
pub struct RefreshableLookupCache {
    inner: Arc<Inner>,
}

impl RefreshableLookupCache {
    /// Creates an empty cache with default configuration.
    pub fn new(source: Arc<dyn DatasetSource>, parser: Arc<dyn DatasetParser>) -> Self {
        Self::with_config(source, parser, CacheConfig::default())
    }

    /// Creates an empty cache with custom configuration.
    pub fn with_config(
        source: Arc<dyn DatasetSource>,
        parser: Arc<dyn DatasetParser>,
        config: CacheConfig,
    ) -> Self {
        Self::with_clock(source, parser, config, Arc::new(SystemClock))
    }

    /// Creates an empty cache reading time from `clock`.
    pub fn with_clock(
        source: Arc<dyn DatasetSource>,
        parser: Arc<dyn DatasetParser>,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                parser,
                config,
                clock,
                phase: Mutex::new(Phase::Empty),
                counters: Counters::default(),
            }),
        }
    }

    /// Returns the current snapshot, loading or refreshing it as needed.
    ///
    /// The first call loads the dataset; concurrent callers wait for that same
    /// attempt and all observe its outcome. A failed load leaves the cache
    /// empty so the next call retries. Once loaded, this never waits on a
    /// refresh unless the cache runs in [`RefreshMode::Inline`] and this call
    /// is the one that noticed the deadline.
    pub async fn get(&self) -> Result<Arc<Snapshot>> {
        match self.advance(self.inner.clock.now()) {
            Step::Serve(snapshot) => Ok(snapshot),
            Step::Wait(rx) => wait_for_load(rx).await,
            Step::Load(tx, rx) => {
                self.spawn_load(tx);
                wait_for_load(rx).await
            }
            Step::Refresh(current) => {
                let handle = self.spawn_refresh(Arc::clone(&current));
                match self.inner.config.refresh_mode {
                    RefreshMode::Background => Ok(current),
                    RefreshMode::Inline => match handle.await {
                        Ok(next) => Ok(next),
                        Err(e) => {
                            warn!(error = %e, "Refresh task did not complete");
                            self.current().ok_or_else(|| {
                                OuiError::Internal("cache lost its dataset during refresh".into())
                            })
                        }
                    },
                }
            }
        }
    }

    /// Triggers the initial load through the same path as [`get`](Self::get).
    #[instrument(skip(self))]
    pub async fn warm_up(&self) -> Result<Arc<Snapshot>> {
        let snapshot = self.get().await?;
        debug!(
            entries = snapshot.dataset().len(),
            generated_at = %snapshot.generated_at(),
            "Cache warm"
        );
        Ok(snapshot)
    }

    /// The snapshot being served, without triggering any work.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        match &*self.inner.phase.lock() {
            Phase::Ready(snapshot) | Phase::Refreshing(snapshot) => Some(Arc::clone(snapshot)),
            Phase::Empty | Phase::Loading(_) => None,
        }
    }

    /// The current lifecycle state.
    pub fn state(&self) -> CacheState {
        self.inner.phase.lock().state()
    }

    /// Load and refresh counters since construction.
    pub fn stats(&self) -> CacheStats {
        let c = &self.inner.counters;
        CacheStats {
            loads: c.loads.load(Ordering::Relaxed),
            load_failures: c.load_failures.load(Ordering::Relaxed),
            refreshes: c.refreshes.load(Ordering::Relaxed),
            refresh_failures: c.refresh_failures.load(Ordering::Relaxed),
        }
    }

    /// Get cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Where the dataset comes from.
    pub fn source_description(&self) -> String {
        self.inner.source.describe()
    }

    /// Inspects the phase and performs the transition this caller owns.
    fn advance(&self, now: DateTime<Utc>) -> Step {
        let mut phase = self.inner.phase.lock();
        let due = match &*phase {
            Phase::Empty => None,
            Phase::Loading(rx) => return Step::Wait(rx.clone()),
            Phase::Ready(snapshot) if snapshot.is_due(now) => Some(Arc::clone(snapshot)),
            Phase::Ready(snapshot) | Phase::Refreshing(snapshot) => {
                return Step::Serve(Arc::clone(snapshot))
            }
        };

        match due {
            Some(current) => {
                *phase = Phase::Refreshing(Arc::clone(&current));
                Step::Refresh(current)
            }
            None => {
                let (tx, rx) = watch::channel(None);
                *phase = Phase::Loading(rx.clone());
                Step::Load(tx, rx)
            }
        }
    }

    fn spawn_load(&self, tx: watch::Sender<LoadOutcome>) {
        let inner = Arc::clone(&self.inner);
        info!(source = %inner.source.describe(), "Loading dataset");
        tokio::spawn(async move {
            let guard = LoadGuard {
                inner: Arc::clone(&inner),
                tx: Some(tx),
            };
            let outcome = inner.load().await;
            guard.finish(outcome);
        });
    }

    fn spawn_refresh(&self, current: Arc<Snapshot>) -> JoinHandle<Arc<Snapshot>> {
        let inner = Arc::clone(&self.inner);
        info!(
            source = %inner.source.describe(),
            generated_at = %current.generated_at(),
            "Refreshing dataset"
        );
        tokio::spawn(async move {
            let guard = RefreshGuard {
                inner: Arc::clone(&inner),
                current: Arc::clone(&current),
                armed: true,
            };
            let outcome = inner.refresh(&current).await;
            guard.finish(outcome)
        })
    }
}

impl fmt::Debug for RefreshableLookupCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshableLookupCache")
            .field("source", &self.inner.source.describe())
            .field("state", &self.state())
            .field("config", &self.inner.config)
            .finish()
    }
}

async fn wait_for_load(mut rx: watch::Receiver<LoadOutcome>) -> Result<Arc<Snapshot>> {
    let outcome = rx
        .wait_for(Option::is_some)
        .await
        .map_err(|_| OuiError::Internal("dataset load abandoned".into()))?;
    (*outcome)
        .clone()
        .unwrap_or_else(|| Err(OuiError::Internal("dataset load abandoned".into())))
}

impl Inner {
    /// Fetches and parses, bounded by the fetch timeout.
    #[instrument(skip_all, fields(source = %self.source.describe()))]
    async fn fetch_dataset(&self, current: Option<Arc<Dataset>>) -> Result<Dataset> {
        let raw = tokio::time::timeout(self.config.fetch_timeout(), self.source.fetch())
            .await
            .map_err(|_| OuiError::SourceTimeout {
                seconds: self.config.fetch_timeout_seconds,
            })??;
        debug!(bytes = raw.len(), "Fetched raw dataset");

        let parser = Arc::clone(&self.parser);
        tokio::task::spawn_blocking(move || match current {
            Some(current) => parser.update(&current, &raw),
            None => parser.parse(&raw),
        })
        .await
        .map_err(|e| OuiError::Internal(format!("parser task failed: {}", e)))?
    }

    async fn load(&self) -> Result<Arc<Snapshot>> {
        let dataset = self.fetch_dataset(None).await?;
        let now = self.clock.now();
        Ok(Arc::new(Snapshot::new(
            Arc::new(dataset),
            now,
            self.config.deadline_after(now),
        )))
    }

    async fn refresh(&self, current: &Snapshot) -> Result<Dataset> {
        let dataset = self.fetch_dataset(Some(Arc::clone(current.dataset()))).await?;
        if dataset.generated_at() < current.generated_at() {
            return Err(OuiError::SourceUnavailable(format!(
                "registry generated at {} is older than the one being served ({})",
                dataset.generated_at(),
                current.generated_at()
            )));
        }
        Ok(dataset)
    }

    fn finish_load(&self, tx: watch::Sender<LoadOutcome>, outcome: Result<Arc<Snapshot>>) {
        *self.phase.lock() = match &outcome {
            Ok(snapshot) => Phase::Ready(Arc::clone(snapshot)),
            Err(_) => Phase::Empty,
        };

        match &outcome {
            Ok(snapshot) => {
                self.counters.loads.fetch_add(1, Ordering::Relaxed);
                info!(
                    entries = snapshot.dataset().len(),
                    generated_at = %snapshot.generated_at(),
                    refresh_at = %snapshot.refresh_at(),
                    "Dataset loaded, now serving"
                );
            }
            Err(e) => {
                self.counters.load_failures.fetch_add(1, Ordering::Relaxed);
                error!(error = %e, "Unable to load dataset");
            }
        }

        tx.send_replace(Some(outcome));
    }

    fn finish_refresh(&self, current: &Snapshot, outcome: Result<Dataset>) -> Arc<Snapshot> {
        let now = self.clock.now();
        let refresh_at = self.config.deadline_after(now);

        let next = match outcome {
            Ok(dataset) => {
                self.counters.refreshes.fetch_add(1, Ordering::Relaxed);
                info!(
                    entries = dataset.len(),
                    generated_at = %dataset.generated_at(),
                    %refresh_at,
                    "Dataset refreshed"
                );
                Arc::new(Snapshot::new(Arc::new(dataset), now, refresh_at))
            }
            Err(e) => {
                self.counters.refresh_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    error = %e,
                    next_attempt = %refresh_at,
                    "Refresh failed, keeping current dataset"
                );
                Arc::new(current.with_deadline(refresh_at))
            }
        };

        *self.phase.lock() = Phase::Ready(Arc::clone(&next));
        next
    }
}

/// Releases load waiters even if the load task unwinds.
struct LoadGuard {
    inner: Arc<Inner>,
    tx: Option<watch::Sender<LoadOutcome>>,
}

impl LoadGuard {
    fn finish(mut self, outcome: Result<Arc<Snapshot>>) {
        if let Some(tx) = self.tx.take() {
            self.inner.finish_load(tx, outcome);
        }
    }
}

impl Drop for LoadGuard {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            self.inner
                .finish_load(tx, Err(OuiError::Internal("dataset load aborted".into())));
        }
    }
}

/// Returns the cache to `Ready` even if the refresh task unwinds.
struct RefreshGuard {
    inner: Arc<Inner>,
    current: Arc<Snapshot>,
    armed: bool,
}

impl RefreshGuard {
    fn finish(mut self, outcome: Result<Dataset>) -> Arc<Snapshot> {
        self.armed = false;
        self.inner.finish_refresh(&self.current, outcome)
    }
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        if self.armed {
            self.inner.finish_refresh(
                &self.current,
                Err(OuiError::Internal("dataset refresh aborted".into())),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::TimeZone;
    use futures::future::join_all;

    use ouilookup_core::types::{Prefix, VendorRecord};

    use crate::clock::ManualClock;

    const TTL: i64 = 3600;

    /// Serves a configurable body, counting fetches.
    #[derive(Debug)]
    struct TestSource {
        body: Mutex<Result<Bytes>>,
        delay: Mutex<Duration>,
        fetches: AtomicUsize,
    }

    impl TestSource {
        fn new(body: &str) -> Arc<Self> {
            Arc::new(Self {
                body: Mutex::new(Ok(Bytes::from(body.to_owned()))),
                delay: Mutex::new(Duration::ZERO),
                fetches: AtomicUsize::new(0),
            })
        }

        fn set_body(&self, body: &str) {
            *self.body.lock() = Ok(Bytes::from(body.to_owned()));
        }

        fn set_error(&self, err: OuiError) {
            *self.body.lock() = Err(err);
        }

        fn set_delay(&self, delay: Duration) {
            *self.delay.lock() = delay;
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DatasetSource for TestSource {
        async fn fetch(&self) -> Result<Bytes> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let delay = *self.delay.lock();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.body.lock().clone()
        }

        fn describe(&self) -> String {
            "test".into()
        }
    }

    /// Body is the generation time as unix seconds; always one record.
    struct StampParser;

    impl DatasetParser for StampParser {
        fn parse(&self, raw: &[u8]) -> Result<Dataset> {
            let secs: i64 = std::str::from_utf8(raw)
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .ok_or_else(|| OuiError::parse("bad stamp"))?;
            let generated_at = Utc
                .timestamp_opt(secs, 0)
                .single()
                .ok_or_else(|| OuiError::parse("bad stamp"))?;
            Ok(Dataset::from_records(
                generated_at,
                vec![VendorRecord::new(Prefix::from_oui([0xAB, 0xCD, 0xEF]), "Acme")],
            ))
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn setup(
        body: &str,
        mode: RefreshMode,
    ) -> (RefreshableLookupCache, Arc<TestSource>, Arc<ManualClock>) {
        let source = TestSource::new(body);
        let clock = Arc::new(ManualClock::new(start()));
        let config = CacheConfig {
            ttl_seconds: TTL as u64,
            fetch_timeout_seconds: 1,
            refresh_mode: mode,
        };
        let cache = RefreshableLookupCache::with_clock(
            source.clone(),
            Arc::new(StampParser),
            config,
            clock.clone(),
        );
        (cache, source, clock)
    }

    async fn settle(cache: &RefreshableLookupCache) {
        for _ in 0..300 {
            if cache.state() == CacheState::Ready {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("cache did not return to ready, state {}", cache.state());
    }

    #[tokio::test]
    async fn test_initial_load() {
        let (cache, source, _clock) = setup("1000", RefreshMode::Background);
        assert_eq!(cache.state(), CacheState::Empty);
        assert!(cache.current().is_none());

        let snapshot = cache.get().await.unwrap();
        assert_eq!(snapshot.generated_at().timestamp(), 1000);
        assert_eq!(snapshot.loaded_at(), start());
        assert_eq!(snapshot.refresh_at(), start() + chrono::Duration::seconds(TTL));
        assert_eq!(cache.state(), CacheState::Ready);
        assert_eq!(source.fetches(), 1);
        assert_eq!(cache.stats().loads, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_callers_share_snapshot() {
        let (cache, source, _clock) = setup("1000", RefreshMode::Background);
        source.set_delay(Duration::from_millis(100));

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get().await })
            })
            .collect();
        let snapshots: Vec<_> = join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .collect();

        assert_eq!(source.fetches(), 1);
        assert!(snapshots.iter().all(|s| Arc::ptr_eq(s, &snapshots[0])));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_callers_share_failure() {
        let (cache, source, _clock) = setup("1000", RefreshMode::Background);
        source.set_delay(Duration::from_millis(50));
        source.set_error(OuiError::SourceUnavailable("connection refused".into()));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get().await })
            })
            .collect();
        for result in join_all(tasks).await {
            assert_eq!(
                result.unwrap().unwrap_err(),
                OuiError::SourceUnavailable("connection refused".into())
            );
        }

        assert_eq!(source.fetches(), 1);
        assert_eq!(cache.state(), CacheState::Empty);
        assert_eq!(cache.stats().load_failures, 1);
    }

    #[tokio::test]
    async fn test_repeated_get_within_window() {
        let (cache, source, clock) = setup("1000", RefreshMode::Background);
        let first = cache.get().await.unwrap();

        for _ in 0..10 {
            clock.advance(chrono::Duration::seconds(60));
            let again = cache.get().await.unwrap();
            assert!(Arc::ptr_eq(&first, &again));
        }
        assert_eq!(source.fetches(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_load_timeout_then_retry() {
        let (cache, source, _clock) = setup("1000", RefreshMode::Background);
        source.set_delay(Duration::from_secs(3));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get().await })
            })
            .collect();
        for result in join_all(tasks).await {
            assert_eq!(result.unwrap().unwrap_err(), OuiError::SourceTimeout { seconds: 1 });
        }
        assert_eq!(cache.state(), CacheState::Empty);

        source.set_delay(Duration::ZERO);
        let snapshot = cache.get().await.unwrap();
        assert_eq!(snapshot.generated_at().timestamp(), 1000);
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_parse_failure_resets_to_empty() {
        let (cache, source, _clock) = setup("garbage", RefreshMode::Background);
        assert!(matches!(cache.get().await, Err(OuiError::ParseFailure { .. })));
        assert_eq!(cache.state(), CacheState::Empty);

        source.set_body("2000");
        assert_eq!(cache.get().await.unwrap().generated_at().timestamp(), 2000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stale_callers_never_block() {
        let (cache, source, clock) = setup("1000", RefreshMode::Background);
        let old = cache.get().await.unwrap();

        source.set_body("2000");
        source.set_delay(Duration::from_millis(500));
        clock.advance(chrono::Duration::seconds(TTL));

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    tokio::time::timeout(Duration::from_millis(250), cache.get()).await
                })
            })
            .collect();
        for result in join_all(tasks).await {
            let snapshot = result.unwrap().expect("get blocked on refresh").unwrap();
            assert!(Arc::ptr_eq(snapshot.dataset(), old.dataset()));
        }

        settle(&cache).await;
        assert_eq!(source.fetches(), 2);

        let fresh = cache.get().await.unwrap();
        assert_eq!(fresh.generated_at().timestamp(), 2000);
        assert_eq!(fresh.refresh_at(), start() + chrono::Duration::seconds(2 * TTL));
        assert_eq!(cache.stats().refreshes, 1);
    }

    #[tokio::test]
    async fn test_single_refresh_in_flight() {
        let (cache, source, clock) = setup("1000", RefreshMode::Background);
        cache.get().await.unwrap();

        source.set_body("2000");
        source.set_delay(Duration::from_millis(200));
        clock.advance(chrono::Duration::seconds(TTL + 5));

        for _ in 0..20 {
            cache.get().await.unwrap();
        }
        assert_eq!(cache.state(), CacheState::Refreshing);

        settle(&cache).await;
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_dataset() {
        let (cache, source, clock) = setup("1000", RefreshMode::Inline);
        let old = cache.get().await.unwrap();

        source.set_error(OuiError::SourceUnavailable("bucket offline".into()));
        clock.advance(chrono::Duration::seconds(TTL));
        let now = clock.now();

        let after = cache.get().await.unwrap();
        assert!(Arc::ptr_eq(after.dataset(), old.dataset()));
        assert_eq!(after.generated_at(), old.generated_at());
        assert_eq!(after.refresh_at(), now + chrono::Duration::seconds(TTL));
        assert_eq!(after.resolve("AB:CD:EF:00:00:01").unwrap().manufacturer, "Acme");
        assert_eq!(cache.state(), CacheState::Ready);
        assert_eq!(cache.stats().refresh_failures, 1);

        // No retry until the advanced deadline.
        cache.get().await.unwrap();
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_inline_refresh_returns_fresh() {
        let (cache, source, clock) = setup("1000", RefreshMode::Inline);
        cache.get().await.unwrap();

        source.set_body("2000");
        clock.advance(chrono::Duration::seconds(TTL));

        let fresh = cache.get().await.unwrap();
        assert_eq!(fresh.generated_at().timestamp(), 2000);
        assert_eq!(cache.state(), CacheState::Ready);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_inline_refresh_others_served_stale() {
        let (cache, source, clock) = setup("1000", RefreshMode::Inline);
        let old = cache.get().await.unwrap();

        source.set_body("2000");
        source.set_delay(Duration::from_millis(400));
        clock.advance(chrono::Duration::seconds(TTL));

        let refresher = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get().await }
        });
        for _ in 0..100 {
            if cache.state() == CacheState::Refreshing {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert_eq!(cache.state(), CacheState::Refreshing);

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    tokio::time::timeout(Duration::from_millis(200), cache.get()).await
                })
            })
            .collect();
        for result in join_all(tasks).await {
            let snapshot = result.unwrap().expect("get blocked on refresh").unwrap();
            assert!(Arc::ptr_eq(snapshot.dataset(), old.dataset()));
        }

        let fresh = refresher.await.unwrap().unwrap();
        assert_eq!(fresh.generated_at().timestamp(), 2000);
        assert_eq!(source.fetches(), 2);
        assert_eq!(cache.stats().refreshes, 1);
        assert_eq!(cache.state(), CacheState::Ready);
    }

    #[tokio::test]
    async fn test_refresh_rejects_older_generation() {
        let (cache, source, clock) = setup("5000", RefreshMode::Inline);
        cache.get().await.unwrap();

        source.set_body("4000");
        clock.advance(chrono::Duration::seconds(TTL));

        let after = cache.get().await.unwrap();
        assert_eq!(after.generated_at().timestamp(), 5000);
        assert_eq!(cache.stats().refresh_failures, 1);
    }

    #[tokio::test]
    async fn test_warm_up_shares_load_path() {
        let (cache, source, _clock) = setup("1000", RefreshMode::Background);
        let warm = cache.warm_up().await.unwrap();
        let got = cache.get().await.unwrap();

        assert!(Arc::ptr_eq(&warm, &got));
        assert_eq!(source.fetches(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_abandoned_caller_does_not_cancel_load() {
        let (cache, source, _clock) = setup("1000", RefreshMode::Background);
        source.set_delay(Duration::from_millis(100));

        let caller = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        caller.abort();

        settle(&cache).await;
        assert_eq!(source.fetches(), 1);
        assert!(cache.current().is_some());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CacheState::Refreshing.to_string(), "refreshing");
        assert_eq!(serde_json::to_string(&CacheState::Ready).unwrap(), "\"ready\"");
    }
}
