//! # fibcache
//!
//! In-memory memoizing cache that deduplicates concurrent computations per
//! key, and a recursive Fibonacci driver built on top of it.
//!
//! ## Modules
//!
//! - [`cache`] - Compute-once cache with in-flight tracking
//! - [`driver`] - Concurrent recurrence driver
//! - [`cli`] - Command line interface
//! - [`types`] - Shared types (errors, configuration)

pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod driver;
pub mod types;

pub use cache::{CacheError, CacheStats, EntryState, MemoCache};
pub use driver::FibonacciDriver;
pub use types::config::Config;
pub use types::errors::{ComputeError, FibcacheError, FibcacheResult};
