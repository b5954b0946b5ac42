//! Error types for fibcache.

use thiserror::Error;

use crate::cache::CacheError;

/// Default result type for fibcache.
pub type FibcacheResult<T> = Result<T, FibcacheError>;

/// Top-level errors.
#[derive(Error, Debug)]
pub enum FibcacheError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Compute(#[from] ComputeError),
}

impl FibcacheError {
    /// Creates a configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}

/// Errors produced while computing a recurrence value.
///
/// `Clone` because one failure is handed to every caller waiting on the
/// same index.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComputeError {
    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    #[error("Value at index {0} does not fit in 128 bits")]
    Overflow(u64),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl ComputeError {
    /// Creates an invalid index error.
    pub fn invalid_index<S: Into<String>>(msg: S) -> Self {
        Self::InvalidIndex(msg.into())
    }
}
