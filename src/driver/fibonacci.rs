//! Fibonacci recurrence over a shared memoizing cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, BoxFuture};
use futures::FutureExt;

use super::index::{check_index, validate_index};
use crate::cache::MemoCache;
use crate::types::config::DriverConfig;
use crate::types::errors::ComputeError;

/// Cache of Fibonacci values keyed by index.
pub type FibonacciCache = MemoCache<u64, u128, ComputeError>;

/// Known values used to pre-seed a cache.
pub const BASE_CASES: [(u64, u128); 2] = [(0, 0), (1, 1)];

/// Simulated latency of one recurrence evaluation.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(5);

/// Computes `f(n) = f(n - 1) + f(n - 2)` with `f(0) = 0` and `f(1) = 1`.
///
/// All clones of a driver share its cache and evaluation counter, so
/// overlapping sub-problems of separate top-level calls are evaluated once.
#[derive(Debug, Clone)]
pub struct FibonacciDriver {
    cache: FibonacciCache,
    delay: Duration,
    wait_timeout: Option<Duration>,
    evaluations: Arc<AtomicU64>,
}

impl FibonacciDriver {
    /// Creates a driver over the given cache.
    pub fn new(cache: FibonacciCache) -> Self {
        Self {
            cache,
            delay: DEFAULT_DELAY,
            wait_timeout: None,
            evaluations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates a driver over a fresh cache holding [`BASE_CASES`].
    pub fn seeded() -> Self {
        Self::new(FibonacciCache::with_seed(BASE_CASES))
    }

    /// Creates a driver over a fresh, empty cache.
    ///
    /// Base cases are then evaluated (and counted) like any other index.
    pub fn unseeded() -> Self {
        Self::new(FibonacciCache::new())
    }

    /// Creates a driver from configuration.
    pub fn from_config(config: &DriverConfig) -> Self {
        let driver = if config.seed_base_cases {
            Self::seeded()
        } else {
            Self::unseeded()
        };

        let driver = driver.with_delay(config.delay());
        match config.wait_timeout() {
            Some(timeout) => driver.with_wait_timeout(timeout),
            None => driver,
        }
    }

    /// Sets the simulated latency of each evaluation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Bounds how long [`compute`](Self::compute) callers wait.
    ///
    /// Only the external caller gives up; the computation keeps running.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    /// The cache backing this driver.
    pub fn cache(&self) -> &FibonacciCache {
        &self.cache
    }

    /// Number of recurrence evaluations performed so far.
    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Computes the value at index `n`.
    ///
    /// Negative indices, and indices past [`MAX_INDEX`](super::MAX_INDEX),
    /// are rejected before the cache is touched.
    pub async fn compute(&self, n: i64) -> Result<u128, ComputeError> {
        let index = validate_index(n)?;
        self.compute_index(index).await
    }

    /// Computes the value at an already validated index.
    pub async fn compute_index(&self, index: u64) -> Result<u128, ComputeError> {
        check_index(index)?;
        tracing::debug!(index, "compute requested");

        let driver = self.clone();
        let work = move || driver.evaluate(index);

        match self.wait_timeout {
            Some(timeout) => self.cache.fetch_with_timeout(index, work, timeout).await,
            None => self.cache.fetch(index, work).await,
        }
    }

    /// Computes every value from `0` to `upto` inclusive, in index order.
    ///
    /// All indices are requested before any of them is awaited.
    pub async fn sequence(&self, upto: u64) -> Result<Vec<u128>, ComputeError> {
        check_index(upto)?;
        future::try_join_all((0..=upto).map(|index| self.compute_index(index))).await
    }

    async fn resolve(&self, index: u64) -> Result<u128, ComputeError> {
        let driver = self.clone();
        self.cache
            .fetch(index, move || driver.evaluate(index))
            .await
    }

    // Boxed to break the type-level cycle evaluate -> resolve -> evaluate.
    fn evaluate(&self, index: u64) -> BoxFuture<'static, Result<u128, ComputeError>> {
        let driver = self.clone();
        async move {
            driver.evaluations.fetch_add(1, Ordering::Relaxed);

            if index < 2 {
                return Ok(u128::from(index));
            }

            if !driver.delay.is_zero() {
                tokio::time::sleep(driver.delay).await;
            }

            tracing::trace!(index, "evaluating recurrence");

            // Both sub-problems are registered before either is awaited.
            tokio::try_join!(driver.resolve(index - 1), driver.resolve(index - 2)).and_then(
                |(minus_one, minus_two)| {
                    minus_one
                        .checked_add(minus_two)
                        .ok_or(ComputeError::Overflow(index))
                },
            )
        }
        .boxed()
    }
}

impl Default for FibonacciDriver {
    fn default() -> Self {
        Self::seeded()
    }
}
