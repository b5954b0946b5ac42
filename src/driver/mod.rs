//! Recursive computation driver.
//!
//! Computes Fibonacci numbers through a shared [`MemoCache`](crate::cache::MemoCache).
//! Each evaluation issues both sub-problems at once and then waits for the
//! pair, so independent branches of the recursion overlap while the cache
//! collapses every repeated index into a single evaluation.
//!
//! ## Example
//!
//! ```rust,ignore
//! use fibcache::driver::FibonacciDriver;
//!
//! let driver = FibonacciDriver::seeded();
//! let (a, b) = tokio::join!(driver.compute(10), driver.compute(9));
//! assert_eq!(a?, 55);
//! assert_eq!(b?, 34);
//! ```

mod fibonacci;
mod index;

pub use fibonacci::{FibonacciCache, FibonacciDriver, BASE_CASES, DEFAULT_DELAY};
pub use index::{check_index, parse_index, validate_index, MAX_INDEX};
