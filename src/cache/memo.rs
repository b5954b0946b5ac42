//! Compute-once cache.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::channel::oneshot;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;

use super::error::CacheError;

// Every waiter polls a clone of the same receiver, so all of them observe the
// single result sent by the owning task.
type ComputationChannel<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

enum Slot<V, E> {
    InFlight(ComputationChannel<V, E>),
    Resolved(V),
}

/// Lifecycle of a key inside the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// Never requested, or the last computation failed.
    Absent,
    /// A computation has started and not yet finished.
    InFlight,
    /// The value is stored and will never change.
    Resolved,
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of resolved entries.
    pub resolved: usize,

    /// Number of computations currently running.
    pub in_flight: usize,

    /// Fetches answered from a resolved entry.
    pub hits: u64,

    /// Fetches that joined a computation started by another caller.
    pub coalesced: u64,

    /// Fetches that started a new computation.
    pub misses: u64,

    /// Computations that ended in an error or were dropped unsettled.
    pub failures: u64,
}

impl CacheStats {
    /// Share of fetches that did not start a computation.
    pub fn hit_rate(&self) -> f64 {
        let shared = self.hits + self.coalesced;
        let total = shared + self.misses;
        if total == 0 {
            0.0
        } else {
            shared as f64 / total as f64
        }
    }
}

enum Claim<V, E> {
    Ready(V),
    Wait(ComputationChannel<V, E>),
}

struct Inner<K, V, E> {
    slots: Mutex<HashMap<K, Slot<V, E>>>,
    hits: AtomicU64,
    coalesced: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
}

impl<K, V, E> Inner<K, V, E>
where
    K: Eq + Hash + fmt::Debug,
    V: Clone,
    E: fmt::Display,
{
    /// Publishes the outcome of an owned computation.
    ///
    /// Runs before the result is sent to waiters, so anyone woken by the
    /// channel already sees the settled entry.
    fn settle(&self, key: K, result: &Result<V, E>) {
        match result {
            Ok(value) => {
                self.slots.lock().insert(key, Slot::Resolved(value.clone()));
            }
            Err(error) => {
                self.slots.lock().remove(&key);
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = ?key, %error, "computation failed; key is absent again");
            }
        }
    }
}

/// Claim on an in-flight slot, held from registration until the computation
/// settles.
///
/// Dropped unsettled (the compute function panicked before returning its
/// future, there was no runtime to spawn on, or the runtime dropped the task)
/// it removes the slot, so the key is absent again.
struct Registration<K, V, E>
where
    K: Eq + Hash + fmt::Debug,
{
    inner: Arc<Inner<K, V, E>>,
    pending: Option<(K, oneshot::Sender<Result<V, E>>)>,
}

impl<K, V, E> Registration<K, V, E>
where
    K: Eq + Hash + fmt::Debug,
    V: Clone,
    E: fmt::Display,
{
    fn new(inner: Arc<Inner<K, V, E>>, key: K, sender: oneshot::Sender<Result<V, E>>) -> Self {
        Self {
            inner,
            pending: Some((key, sender)),
        }
    }

    fn settle(mut self, result: Result<V, E>) {
        if let Some((key, sender)) = self.pending.take() {
            self.inner.settle(key, &result);
            // All waiters may have gone away; the entry is settled either way.
            let _ = sender.send(result);
        }
    }
}

impl<K, V, E> Drop for Registration<K, V, E>
where
    K: Eq + Hash + fmt::Debug,
{
    fn drop(&mut self) {
        if let Some((key, sender)) = self.pending.take() {
            self.inner.slots.lock().remove(&key);
            self.inner.failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(key = ?key, "computation dropped before settling; key is absent again");
            // Waiters wake with `Abandoned` only once the slot is gone.
            drop(sender);
        }
    }
}

/// In-memory memoizing cache that runs at most one computation per key.
///
/// Cloning the handle shares the same entries. Separate calls to
/// [`MemoCache::new`] produce fully independent caches.
///
/// # Failure policy
///
/// When a compute function returns an error (or panics), the error is
/// delivered to the owner and to every caller waiting at that moment. The
/// entry then reverts to [`EntryState::Absent`], so the next `fetch` for the
/// key starts a fresh computation. Resolved entries are never touched.
///
/// A computation that never settles is treated the same way: if the compute
/// function panics before returning its future, or the task running it is
/// dropped, waiters get [`CacheError::Abandoned`] and the key is absent again.
pub struct MemoCache<K, V, E> {
    inner: Arc<Inner<K, V, E>>,
}

impl<K, V, E> Clone for MemoCache<K, V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, E> fmt::Debug for MemoCache<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoCache")
            .field("entries", &self.inner.slots.lock().len())
            .finish_non_exhaustive()
    }
}

impl<K, V, E> Default for MemoCache<K, V, E>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + 'static,
    V: Clone + Send + Sync + 'static,
    E: From<CacheError> + fmt::Display + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, E> MemoCache<K, V, E>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + 'static,
    V: Clone + Send + Sync + 'static,
    E: From<CacheError> + fmt::Display + Clone + Send + Sync + 'static,
{
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::with_seed(std::iter::empty())
    }

    /// Creates a cache whose entries start out resolved with the given values.
    pub fn with_seed<I>(seed: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let slots = seed
            .into_iter()
            .map(|(key, value)| (key, Slot::Resolved(value)))
            .collect();

        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(slots),
                hits: AtomicU64::new(0),
                coalesced: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                failures: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the value for `key`, computing it with `compute` if needed.
    ///
    /// - Resolved key: returns the stored value, `compute` is not called.
    /// - Key in flight: waits for the running computation and returns its
    ///   result, `compute` is not called.
    /// - Absent key: this caller becomes the owner, `compute` is called once
    ///   and its future runs as a separate task.
    ///
    /// Dropping the returned future never cancels the computation, even for
    /// the owner; other callers may still be waiting on it.
    ///
    /// # Panics
    ///
    /// Starting a computation spawns a task, so this must be awaited inside a
    /// Tokio runtime. Outside one the key is left absent before panicking.
    pub async fn fetch<F, Fut>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        match self.claim(key, compute) {
            Claim::Ready(value) => Ok(value),
            Claim::Wait(channel) => channel.await,
        }
    }

    /// Like [`fetch`](Self::fetch), but gives up waiting after `timeout`.
    ///
    /// The deadline bounds only this caller. The computation keeps running
    /// and still resolves the entry for everyone else.
    pub async fn fetch_with_timeout<F, Fut>(
        &self,
        key: K,
        compute: F,
        timeout: Duration,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let channel = match self.claim(key.clone(), compute) {
            Claim::Ready(value) => return Ok(value),
            Claim::Wait(channel) => channel,
        };

        match tokio::time::timeout(timeout, channel).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(key = ?key, ?timeout, "stopped waiting for computation");
                Err(E::from(CacheError::WaitTimeout {
                    key: format!("{key:?}"),
                    timeout,
                }))
            }
        }
    }

    /// Returns the resolved value for `key` without starting any work.
    pub fn get(&self, key: &K) -> Option<V> {
        match self.inner.slots.lock().get(key) {
            Some(Slot::Resolved(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Returns the current lifecycle state of `key`.
    pub fn state(&self, key: &K) -> EntryState {
        match self.inner.slots.lock().get(key) {
            None => EntryState::Absent,
            Some(Slot::InFlight(_)) => EntryState::InFlight,
            Some(Slot::Resolved(_)) => EntryState::Resolved,
        }
    }

    /// Number of resolved entries.
    pub fn len(&self) -> usize {
        self.inner
            .slots
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Resolved(_)))
            .count()
    }

    /// Returns `true` if no entry is resolved.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let (resolved, in_flight) = {
            let slots = self.inner.slots.lock();
            let in_flight = slots
                .values()
                .filter(|slot| matches!(slot, Slot::InFlight(_)))
                .count();
            (slots.len() - in_flight, in_flight)
        };

        CacheStats {
            resolved,
            in_flight,
            hits: self.inner.hits.load(Ordering::Relaxed),
            coalesced: self.inner.coalesced.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            failures: self.inner.failures.load(Ordering::Relaxed),
        }
    }

    /// Looks up `key` and, when it is absent, registers this caller as owner
    /// and launches the computation.
    ///
    /// The lookup and the in-flight registration happen under one lock, so
    /// two callers can never both become owners of the same key.
    fn claim<F, Fut>(&self, key: K, compute: F) -> Claim<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let mut slots = self.inner.slots.lock();

        match slots.get(&key) {
            Some(Slot::Resolved(value)) => {
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(key = ?key, "cache hit");
                return Claim::Ready(value.clone());
            }
            Some(Slot::InFlight(channel)) => {
                self.inner.coalesced.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = ?key, "joining in-flight computation");
                return Claim::Wait(channel.clone());
            }
            None => {}
        }

        self.inner.misses.fetch_add(1, Ordering::Relaxed);

        let (sender, receiver) = oneshot::channel::<Result<V, E>>();
        let label = format!("{key:?}");
        let channel = receiver
            .map(move |received| {
                received.unwrap_or_else(|_| Err(E::from(CacheError::Abandoned(label))))
            })
            .boxed()
            .shared();

        slots.insert(key.clone(), Slot::InFlight(channel.clone()));
        drop(slots);

        tracing::debug!(key = ?key, "starting computation");

        let panicked = CacheError::Panicked(format!("{key:?}"));
        let registration = Registration::new(Arc::clone(&self.inner), key, sender);

        // `compute` runs outside the lock: it may fetch other keys. A panic
        // here unwinds through `registration`, which clears the slot.
        let future = compute();
        tokio::spawn(async move {
            let result = match AssertUnwindSafe(future).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(E::from(panicked)),
            };
            registration.settle(result);
        });

        Claim::Wait(channel)
    }
}
