//! Cache-aside tile source.

use super::lock::{Acquired, FetchOutcome, LockKey, LockTable};
use crate::backend::{BackendError, TileBackend, TileData, TileSource};
use crate::coord::TileKey;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Snapshot of [`CacheFallbackSource`] counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FallbackStats {
    /// Calls to `fetch`
    pub requests: u64,
    /// Requests served by another request's in-flight fetch
    pub coalesced: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Cache reads that failed and were treated as misses
    pub cache_errors: u64,
    /// Calls that reached the primary
    pub primary_fetches: u64,
    pub primary_failures: u64,
}

impl FallbackStats {
    /// Returns the coalescing ratio (0.0 to 1.0)
    pub fn coalescing_ratio(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.coalesced as f64 / self.requests as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    coalesced: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_errors: AtomicU64,
    primary_fetches: AtomicU64,
    primary_failures: AtomicU64,
}

/// Serves tiles from a cache, falling back to a primary source.
///
/// For each key the first concurrent request leads: it reads the cache, and
/// on a miss (or any cache error) fetches from the primary. Concurrent
/// requests for the same key wait for the leader and get the same outcome,
/// so the primary sees at most one call per key at a time. The cache is
/// only read here; warming it is the caller's job.
pub struct CacheFallbackSource<P, C> {
    primary: P,
    cache: Arc<C>,
    locks: Arc<LockTable>,
    counters: Counters,
}

impl<P: TileSource, C: TileSource> CacheFallbackSource<P, C> {
    /// Creates a fallback source.
    ///
    /// `locks` may be shared with other fallback sources; keys are scoped by
    /// the primary's identity so different origins never contend.
    pub fn new(primary: P, cache: Arc<C>, locks: Arc<LockTable>) -> Self {
        Self {
            primary,
            cache,
            locks,
            counters: Counters::default(),
        }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }

    /// Fetches `key` through the cache, coalescing with any in-flight fetch.
    ///
    /// A waiter whose leader is dropped before settling takes the lock again,
    /// so callers only ever see a real cache or origin outcome.
    pub async fn fetch(&self, key: TileKey) -> FetchOutcome {
        self.counters.requests.fetch_add(1, Ordering::Relaxed);
        let lock_key = LockKey::new(self.primary.identity(), &key);
        let mut coalesced = false;

        loop {
            match self.locks.acquire(&lock_key) {
                Acquired::Waiter(rx) => {
                    if !coalesced {
                        self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                        coalesced = true;
                    }
                    trace!(tile = %key, "Waiting on in-flight fetch");
                    match rx.await {
                        Ok(Err(BackendError::Abandoned(_))) | Err(_) => {
                            debug!(tile = %key, "In-flight fetch abandoned, retrying");
                        }
                        Ok(outcome) => return outcome,
                    }
                }
                Acquired::Leader(guard) => {
                    let outcome = self.lead(key).await;
                    let woken = guard.settle(&outcome);
                    if woken > 0 {
                        debug!(tile = %key, waiters = woken, "Shared fetch outcome with waiters");
                    }
                    return outcome;
                }
            }
        }
    }

    async fn lead(&self, key: TileKey) -> FetchOutcome {
        match self.cache.get_tile(key).await {
            Ok(data) => {
                self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                trace!(tile = %key, "Cache hit");
                return Ok(data);
            }
            Err(e) if e.is_not_found() => {
                self.counters.cache_misses.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.cache_errors.fetch_add(1, Ordering::Relaxed);
                warn!(tile = %key, error = %e, "Cache read failed, fetching from origin");
            }
        }

        self.counters.primary_fetches.fetch_add(1, Ordering::Relaxed);
        let result = self.primary.get_tile(key).await;
        if let Err(e) = &result {
            self.counters.primary_failures.fetch_add(1, Ordering::Relaxed);
            debug!(tile = %key, origin = self.primary.identity(), error = %e, "Origin fetch failed");
        }
        result
    }

    pub fn stats(&self) -> FallbackStats {
        FallbackStats {
            requests: self.counters.requests.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.counters.cache_misses.load(Ordering::Relaxed),
            cache_errors: self.counters.cache_errors.load(Ordering::Relaxed),
            primary_fetches: self.counters.primary_fetches.load(Ordering::Relaxed),
            primary_failures: self.counters.primary_failures.load(Ordering::Relaxed),
        }
    }

    /// Logs current statistics.
    pub fn log_stats(&self) {
        let stats = self.stats();
        info!(
            origin = self.primary.identity(),
            requests = stats.requests,
            coalesced = stats.coalesced,
            cache_hits = stats.cache_hits,
            cache_misses = stats.cache_misses,
            cache_errors = stats.cache_errors,
            primary_fetches = stats.primary_fetches,
            primary_failures = stats.primary_failures,
            coalescing_ratio = format!("{:.1}%", stats.coalescing_ratio() * 100.0),
            "Cache fallback statistics"
        );
    }
}

impl<P: TileSource, C: TileSource> TileBackend for CacheFallbackSource<P, C> {
    fn identity(&self) -> &str {
        self.primary.identity()
    }
}

impl<P: TileSource, C: TileSource> TileSource for CacheFallbackSource<P, C> {
    async fn get_tile(&self, key: TileKey) -> Result<TileData, BackendError> {
        self.fetch(key).await
    }

    fn is_rate_limited(&self) -> bool {
        self.primary.is_rate_limited()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryTileStore;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Primary that counts calls and blocks until released.
    struct GatedSource {
        calls: AtomicU64,
        gate: Notify,
        result: FetchOutcome,
    }

    impl GatedSource {
        fn new(result: FetchOutcome) -> Self {
            Self {
                calls: AtomicU64::new(0),
                gate: Notify::new(),
                result,
            }
        }
    }

    impl TileBackend for GatedSource {
        fn identity(&self) -> &str {
            "gated://primary"
        }
    }

    impl TileSource for GatedSource {
        async fn get_tile(&self, _key: TileKey) -> Result<TileData, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            self.result.clone()
        }
    }

    /// Cache whose reads always fail.
    struct BrokenCache;

    impl TileBackend for BrokenCache {
        fn identity(&self) -> &str {
            "broken://cache"
        }
    }

    impl TileSource for BrokenCache {
        async fn get_tile(&self, _key: TileKey) -> Result<TileData, BackendError> {
            Err(BackendError::Io {
                path: "/cache".into(),
                message: "disk on fire".into(),
            })
        }
    }

    fn key() -> TileKey {
        TileKey { zoom: 7, x: 20, y: 46 }
    }

    async fn concurrent_fetches(
        source: Arc<CacheFallbackSource<Arc<GatedSource>, MemoryTileStore>>,
        n: usize,
    ) -> Vec<FetchOutcome> {
        let handles: Vec<_> = (0..n)
            .map(|_| {
                let source = Arc::clone(&source);
                tokio::spawn(async move { source.fetch(key()).await })
            })
            .collect();

        // Let every request reach the lock before the primary answers
        tokio::time::sleep(Duration::from_millis(10)).await;
        source.primary().gate.notify_one();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        results
    }

    #[tokio::test(start_paused = true)]
    async fn test_cold_cache_single_primary_call() {
        let primary = Arc::new(GatedSource::new(Ok(TileData::new("X"))));
        let source = Arc::new(CacheFallbackSource::new(
            Arc::clone(&primary),
            Arc::new(MemoryTileStore::new("cache")),
            Arc::new(LockTable::new()),
        ));

        let results = concurrent_fetches(Arc::clone(&source), 8).await;

        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r == &Ok(TileData::new("X"))));

        let stats = source.stats();
        assert_eq!(stats.requests, 8);
        assert_eq!(stats.coalesced, 7);
        assert_eq!(stats.primary_fetches, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_error_reaches_every_waiter() {
        let error = BackendError::Http("HTTP 500".into());
        let primary = Arc::new(GatedSource::new(Err(error.clone())));
        let source = Arc::new(CacheFallbackSource::new(
            Arc::clone(&primary),
            Arc::new(MemoryTileStore::new("cache")),
            Arc::new(LockTable::new()),
        ));

        let results = concurrent_fetches(Arc::clone(&source), 5).await;

        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r == &Err(error.clone())));
        assert_eq!(source.stats().primary_failures, 1);
    }

    #[tokio::test]
    async fn test_warm_cache_skips_primary() {
        let primary = Arc::new(GatedSource::new(Ok(TileData::new("origin"))));
        let cache = Arc::new(MemoryTileStore::new("cache"));
        cache.insert(key(), TileData::new("cached"));

        let source =
            CacheFallbackSource::new(Arc::clone(&primary), cache, Arc::new(LockTable::new()));

        for _ in 0..3 {
            let data = source.get_tile(key()).await.unwrap();
            assert_eq!(data.data().as_ref(), b"cached");
        }
        assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.stats().cache_hits, 3);
    }

    #[tokio::test]
    async fn test_cache_error_falls_back_to_primary() {
        let primary = Arc::new(MemoryTileStore::new("origin"));
        primary.insert(key(), TileData::new("X"));

        let source = CacheFallbackSource::new(
            Arc::clone(&primary),
            Arc::new(BrokenCache),
            Arc::new(LockTable::new()),
        );

        let data = source.get_tile(key()).await.unwrap();
        assert_eq!(data.data().as_ref(), b"X");
        assert_eq!(source.stats().cache_errors, 1);
        assert_eq!(primary.read_count(), 1);
    }

    #[tokio::test]
    async fn test_fallback_does_not_write_cache() {
        let primary = Arc::new(MemoryTileStore::new("origin"));
        primary.insert(key(), TileData::new("X"));
        let cache = Arc::new(MemoryTileStore::new("cache"));

        let source = CacheFallbackSource::new(
            Arc::clone(&primary),
            Arc::clone(&cache),
            Arc::new(LockTable::new()),
        );
        source.get_tile(key()).await.unwrap();

        assert!(cache.is_empty());
        assert_eq!(source.identity(), "memory://origin");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_leader_hands_lock_to_waiter() {
        let primary = Arc::new(GatedSource::new(Ok(TileData::new("X"))));
        let locks = Arc::new(LockTable::new());
        let source = Arc::new(CacheFallbackSource::new(
            Arc::clone(&primary),
            Arc::new(MemoryTileStore::new("cache")),
            Arc::clone(&locks),
        ));

        let leader = {
            let source = Arc::clone(&source);
            tokio::spawn(async move { source.fetch(key()).await })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;

        let waiter = {
            let source = Arc::clone(&source);
            tokio::spawn(async move { source.fetch(key()).await })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;

        leader.abort();
        let _ = leader.await;

        // The waiter now leads its own fetch
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
        source.primary().gate.notify_one();

        let outcome = waiter.await.unwrap();
        assert_eq!(outcome, Ok(TileData::new("X")));
        assert_eq!(source.stats().coalesced, 1);
        assert_eq!(locks.stats().abandoned, 1);
        assert_eq!(locks.stats().active, 0);
    }
}
