//! Error types for the query cache
//!
//! A cache miss is never an error: stores report it as `Ok(None)` and the
//! query adapter as `Ok(false)`. Everything here is a real failure that the
//! caller must not mistake for cold-cache behavior.

use std::time::Duration;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for stores and the query adapter.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The remote backend could not be reached or rejected the command
    #[error("Transport error: {0}")]
    Transport(String),

    /// A backend call did not finish before its deadline
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The store has been closed and holds no connection anymore
    #[error("Store is closed")]
    Closed,

    /// A cached payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CacheError {
    /// Returns true for failures of the backend itself (as opposed to payload
    /// or configuration problems).
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            CacheError::Transport(_) | CacheError::Timeout(_) | CacheError::Closed
        )
    }
}

// == Redis Conversion ==
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Transport(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the query cache.
pub type Result<T> = std::result::Result<T, CacheError>;
