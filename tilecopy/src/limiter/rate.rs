//! Concurrency and spacing limiter for origin fetches.
//!
//! A [`RateLimiter`] admits work when two conditions hold: fewer than
//! `max_concurrent` admissions are outstanding, and at least `min_interval`
//! has passed since the previous admission. Waiters are admitted in arrival
//! order and nothing is ever dropped.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilecopy::limiter::{RateLimitConfig, RateLimiter};
//!
//! let limiter = Arc::new(RateLimiter::new("origin", RateLimitConfig::default()));
//!
//! // Either hold a permit around the request...
//! let _permit = limiter.acquire().await;
//!
//! // ...or let the limiter wrap it
//! let tile = limiter.run(source.get_tile(key)).await?;
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tokio::time::Instant;
use tracing::{info, trace};

/// Default ceiling on simultaneous admissions.
pub const DEFAULT_MAX_CONCURRENT: usize = 16;

/// Default minimum gap between two admissions.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Limiter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum admissions outstanding at once (at least 1)
    pub max_concurrent: usize,
    /// Minimum time between consecutive admissions
    pub min_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            min_interval: DEFAULT_MIN_INTERVAL,
        }
    }
}

/// Snapshot of limiter counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimiterStats {
    pub admitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub in_flight: usize,
    pub peak_in_flight: usize,
}

/// FIFO limiter bounding concurrency and admission rate.
#[derive(Debug)]
pub struct RateLimiter {
    label: String,

    /// Fair semaphore bounding outstanding admissions
    semaphore: Semaphore,
    max_permits: usize,

    /// Earliest instant the next admission may go out. The mutex is fair, so
    /// permit holders are spaced in the order they got their permit.
    next_slot: Mutex<Option<Instant>>,
    min_interval: Duration,

    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    admitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl RateLimiter {
    /// Creates a limiter. `label` identifies it in logs.
    ///
    /// A `max_concurrent` of 0 is treated as 1.
    pub fn new(label: impl Into<String>, config: RateLimitConfig) -> Self {
        let max_permits = config.max_concurrent.max(1);

        Self {
            label: label.into(),
            semaphore: Semaphore::new(max_permits),
            max_permits,
            next_slot: Mutex::new(None),
            min_interval: config.min_interval,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            admitted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Waits for admission.
    ///
    /// The returned permit counts against the concurrency ceiling until it
    /// is dropped. Dropping the future while it waits gives up its place
    /// without consuming a slot.
    pub async fn acquire(&self) -> RatePermit<'_> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .expect("semaphore closed unexpectedly");

        {
            let mut next_slot = self.next_slot.lock().await;
            if let Some(slot) = *next_slot {
                if slot > Instant::now() {
                    tokio::time::sleep_until(slot).await;
                }
            }
            *next_slot = Some(Instant::now() + self.min_interval);
        }

        let current = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::Relaxed);
        self.admitted.fetch_add(1, Ordering::Relaxed);

        trace!(limiter = %self.label, in_flight = current, "Admitted");

        RatePermit {
            _permit: permit,
            in_flight: &self.in_flight,
        }
    }

    /// Runs `fut` under an admission.
    ///
    /// The result is returned unchanged; capacity is released however `fut`
    /// ends, including when the returned future is dropped.
    pub async fn run<F, T, E>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let _permit = self.acquire().await;
        let result = fut.await;

        match &result {
            Ok(_) => self.completed.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.failed.fetch_add(1, Ordering::Relaxed),
        };
        result
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the maximum number of concurrent admissions.
    pub fn max_concurrent(&self) -> usize {
        self.max_permits
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Returns the current number of admissions outstanding.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> LimiterStats {
        LimiterStats {
            admitted: self.admitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            peak_in_flight: self.peak_in_flight.load(Ordering::Relaxed),
        }
    }

    /// Logs the limiter counters at info level.
    pub fn log_stats(&self) {
        let stats = self.stats();
        info!(
            limiter = %self.label,
            admitted = stats.admitted,
            completed = stats.completed,
            failed = stats.failed,
            peak_in_flight = stats.peak_in_flight,
            max_concurrent = self.max_permits,
            "Rate limiter statistics"
        );
    }
}

/// An admission granted by a [`RateLimiter`].
///
/// Released when dropped.
pub struct RatePermit<'a> {
    _permit: SemaphorePermit<'a>,
    in_flight: &'a AtomicUsize,
}

impl Drop for RatePermit<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn config(max_concurrent: usize, interval_ms: u64) -> RateLimitConfig {
        RateLimitConfig {
            max_concurrent,
            min_interval: Duration::from_millis(interval_ms),
        }
    }

    #[test]
    fn test_defaults() {
        let limiter = RateLimiter::new("origin", RateLimitConfig::default());
        assert_eq!(limiter.max_concurrent(), 16);
        assert_eq!(limiter.min_interval(), Duration::from_millis(100));
        assert_eq!(limiter.label(), "origin");
    }

    #[test]
    fn test_zero_concurrency_is_one() {
        let limiter = RateLimiter::new("origin", config(0, 0));
        assert_eq!(limiter.max_concurrent(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_and_spacing() {
        let limiter = Arc::new(RateLimiter::new("origin", config(4, 100)));
        let admissions = Arc::new(std::sync::Mutex::new(Vec::new()));
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let limiter = Arc::clone(&limiter);
            let admissions = Arc::clone(&admissions);
            let active = Arc::clone(&active);
            let max_active = Arc::clone(&max_active);

            handles.push(tokio::spawn(async move {
                limiter
                    .run(async {
                        admissions.lock().unwrap().push(Instant::now());
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        max_active.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(750)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                        Ok::<_, ()>(())
                    })
                    .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut times = admissions.lock().unwrap().clone();
        times.sort();
        assert_eq!(times.len(), 20);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(100));
        }
        assert!(max_active.load(Ordering::SeqCst) <= 4);

        let stats = limiter.stats();
        assert_eq!(stats.admitted, 20);
        assert_eq!(stats.completed, 20);
        assert_eq!(stats.in_flight, 0);
        assert!(stats.peak_in_flight <= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_admission_is_immediate() {
        let limiter = RateLimiter::new("origin", config(1, 500));
        let start = Instant::now();

        let _permit = limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_errors_propagate_and_release_capacity() {
        let limiter = RateLimiter::new("origin", config(1, 0));

        let result: Result<(), &str> = limiter.run(async { Err("boom") }).await;
        assert_eq!(result, Err("boom"));
        assert_eq!(limiter.in_flight(), 0);

        // Capacity came back, so this does not hang
        let ok: Result<u32, &str> = limiter.run(async { Ok(7) }).await;
        assert_eq!(ok, Ok(7));

        let stats = limiter.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_run_releases_capacity() {
        let limiter = Arc::new(RateLimiter::new("origin", config(1, 0)));

        let blocked = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move {
                limiter
                    .run(async {
                        std::future::pending::<()>().await;
                        Ok::<_, ()>(())
                    })
                    .await
            })
        };

        tokio::task::yield_now().await;
        assert_eq!(limiter.in_flight(), 1);

        blocked.abort();
        let _ = blocked.await;
        assert_eq!(limiter.in_flight(), 0);

        let _permit = limiter.acquire().await;
        assert_eq!(limiter.in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_admitted_in_arrival_order() {
        let limiter = Arc::new(RateLimiter::new("origin", config(1, 10)));
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let first = limiter.acquire().await;

        let mut handles = Vec::new();
        for i in 0..5 {
            let limiter = Arc::clone(&limiter);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let _permit = limiter.acquire().await;
                order.lock().unwrap().push(i);
            }));
            // Make sure each task is queued before the next one starts
            tokio::task::yield_now().await;
        }

        drop(first);
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }
}
