//! Store error type.

use std::path::PathBuf;

/// Errors raised by the cache tiers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The key/value backend could not complete a pipeline.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// A filesystem operation on the content store failed.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Self::Unavailable(e.to_string())
    }
}

impl From<Error> for thumbcache_common::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Unavailable(msg) => Self::CacheUnavailable(msg),
            err @ Error::Io { .. } => Self::PersistFailed(err.to_string()),
        }
    }
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;
