//! Failures raised by the cache itself rather than by a compute function.

use std::time::Duration;

use thiserror::Error;

/// Cache-originated failures.
///
/// These are folded into the caller's error type through `From<CacheError>`,
/// so a single error type flows through `fetch` for both cache and compute
/// failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("computation for key {0} panicked")]
    Panicked(String),

    #[error("computation for key {0} was dropped before completing")]
    Abandoned(String),

    #[error("gave up waiting for key {key} after {timeout:?}")]
    WaitTimeout { key: String, timeout: Duration },
}
