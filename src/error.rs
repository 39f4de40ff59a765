//! Error types for the block cache.

use std::fmt;

/// The result type used throughout the block cache.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for block cache operations.
///
/// Only `start` can fail: a cache miss is a normal `None` result and
/// admission never fails for capacity reasons.
#[derive(Debug)]
pub enum Error {
    /// The supplied configuration is invalid.
    Configuration(String),

    /// `start` was called on a cache that is already started.
    AlreadyStarted,
}

impl Error {
    /// Creates a new configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::AlreadyStarted => {
                write!(f, "Cache is already started; call stop() before restarting")
            }
        }
    }
}

impl std::error::Error for Error {}
