//! Common error types used throughout thumbcache.
//!
//! Per-item failures inside a batch are not errors: they travel as
//! [`ThumbnailResult::Failure`](crate::ThumbnailResult) entries. This type
//! covers everything that is reported out-of-band (logs, queue producers) plus
//! the single top-level "nothing to respond" case.

/// Common error type for thumbcache.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller supplied a locator that does not carry a usable identifier.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The upstream API has no metadata for the identifier.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An image download failed or timed out.
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    /// The metadata backend could not be reached.
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    /// A write-behind persistence step failed.
    #[error("Persist failed: {0}")]
    PersistFailed(String),

    /// The write-behind buffer stayed full for the whole enqueue wait.
    #[error("Write-behind queue overloaded")]
    QueueOverloaded,

    /// The write-behind queue is not accepting batches in its current state.
    #[error("Write-behind queue is not accepting batches: {0}")]
    QueueClosed(String),

    /// A batch request produced no entries at all.
    #[error("Nothing to respond")]
    NothingToRespond,

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new FetchFailed error.
    pub fn fetch_failed<S: Into<String>>(msg: S) -> Self {
        Self::FetchFailed(msg.into())
    }

    /// Create a new CacheUnavailable error.
    pub fn cache_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::CacheUnavailable(msg.into())
    }

    /// Create a new PersistFailed error.
    pub fn persist_failed<S: Into<String>>(msg: S) -> Self {
        Self::PersistFailed(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Short machine-readable code, used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::FetchFailed(_) => "fetch_failed",
            Self::CacheUnavailable(_) => "cache_unavailable",
            Self::PersistFailed(_) => "persist_failed",
            Self::QueueOverloaded => "queue_overloaded",
            Self::QueueClosed(_) => "queue_closed",
            Self::NothingToRespond => "nothing_to_respond",
            Self::Io(_) => "io_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_input("not a url");
        assert_eq!(err.to_string(), "Invalid input: not a url");

        let err = Error::not_found("xyz");
        assert_eq!(err.to_string(), "Not found: xyz");

        let err = Error::QueueOverloaded;
        assert_eq!(err.to_string(), "Write-behind queue overloaded");

        let err = Error::NothingToRespond;
        assert_eq!(err.to_string(), "Nothing to respond");

        let err = Error::QueueClosed("stopped".into());
        assert_eq!(
            err.to_string(),
            "Write-behind queue is not accepting batches: stopped"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.code(), "io_error");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::NothingToRespond.code(), "nothing_to_respond");
        assert_eq!(Error::QueueOverloaded.code(), "queue_overloaded");
        assert_eq!(Error::cache_unavailable("down").code(), "cache_unavailable");
        assert_eq!(Error::persist_failed("disk").code(), "persist_failed");
        assert_eq!(Error::fetch_failed("timeout").code(), "fetch_failed");
    }
}
