//! Memoizing cache with per-key deduplication of concurrent computations.
//!
//! [`MemoCache::fetch`] returns the value for a key, running the supplied
//! compute function at most once per key no matter how many callers ask for
//! it at the same time. Callers that arrive while a computation is in flight
//! wait on the same shared result.
//!
//! Entries are never evicted: the cache lives as long as its last handle.
//! A failed computation is reported to every caller waiting on it and the
//! key then becomes absent again, so the next `fetch` retries.

mod error;
mod memo;

pub use error::CacheError;
pub use memo::{CacheStats, EntryState, MemoCache};
