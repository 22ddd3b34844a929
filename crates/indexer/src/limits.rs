use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub const MAX_CONCURRENT_RUNS: usize = 32;

/// Environment override for the number of indexing runs allowed at once.
pub const CONCURRENCY_ENV: &str = "SHADOWCASTER_INDEX_CONCURRENCY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunLimitSnapshot {
    pub limit: usize,
    pub in_flight: usize,
    pub waiters: usize,
}

pub fn default_concurrent_runs() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    if cpus <= 4 {
        1
    } else if cpus <= 12 {
        2
    } else {
        3
    }
}

pub fn parse_concurrent_runs(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .clamp(1, MAX_CONCURRENT_RUNS)
}

pub fn concurrent_runs_from_env(default_value: usize) -> usize {
    let raw = std::env::var(CONCURRENCY_ENV).ok();
    parse_concurrent_runs(raw.as_deref(), default_value)
}

/// Bounds how many indexing runs walk and write at the same time.
#[derive(Clone)]
pub struct RunLimiter {
    semaphore: Arc<Semaphore>,
    limit: usize,
    waiters: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
}

impl RunLimiter {
    pub fn new(limit: usize) -> Self {
        let limit = limit.clamp(1, MAX_CONCURRENT_RUNS);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            waiters: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn snapshot(&self) -> RunLimitSnapshot {
        RunLimitSnapshot {
            limit: self.limit,
            in_flight: self.in_flight.load(Ordering::Relaxed),
            waiters: self.waiters.load(Ordering::Relaxed),
        }
    }

    pub(crate) async fn acquire(&self) -> RunPermit {
        // The semaphore is never closed; acquire failures are not expected.
        let waiter = WaiterGuard::new(&self.waiters);
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .unwrap_or_else(|_| unreachable!("run limiter semaphore closed"));
        drop(waiter);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        RunPermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

pub(crate) struct RunPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

struct WaiterGuard<'a> {
    waiters: &'a AtomicUsize,
}

impl<'a> WaiterGuard<'a> {
    fn new(waiters: &'a AtomicUsize) -> Self {
        waiters.fetch_add(1, Ordering::Relaxed);
        Self { waiters }
    }
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        self.waiters.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_concurrent_runs_defaults_and_clamps() {
        let default_value = default_concurrent_runs();
        assert_eq!(parse_concurrent_runs(None, default_value), default_value);
        assert_eq!(parse_concurrent_runs(Some(""), default_value), default_value);
        assert_eq!(
            parse_concurrent_runs(Some("   "), default_value),
            default_value
        );
        assert_eq!(parse_concurrent_runs(Some("2"), default_value), 2);
        assert_eq!(parse_concurrent_runs(Some("0"), default_value), 1);
        assert_eq!(
            parse_concurrent_runs(Some("999"), default_value),
            MAX_CONCURRENT_RUNS
        );
        assert_eq!(
            parse_concurrent_runs(Some("abc"), default_value),
            default_value
        );
        assert_eq!(parse_concurrent_runs(Some(" 5 "), default_value), 5);
    }

    #[tokio::test]
    async fn permits_track_in_flight_runs() {
        let limiter = RunLimiter::new(2);
        let first = limiter.acquire().await;
        let second = limiter.acquire().await;
        assert_eq!(
            limiter.snapshot(),
            RunLimitSnapshot {
                limit: 2,
                in_flight: 2,
                waiters: 0,
            }
        );

        drop(first);
        drop(second);
        assert_eq!(limiter.snapshot().in_flight, 0);
    }

    #[tokio::test]
    async fn limit_is_clamped_to_at_least_one() {
        let limiter = RunLimiter::new(0);
        assert_eq!(limiter.snapshot().limit, 1);
        let _permit = limiter.acquire().await;
        assert_eq!(limiter.snapshot().in_flight, 1);
    }
}
