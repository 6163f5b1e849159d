//! Thumbnail records and per-item results.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::ids::VideoId;

/// Descriptive fields of a thumbnail, without the image payload.
///
/// This is what the remote API returns for a video and what the metadata
/// cache stores under `video:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailMetadata {
    pub id: VideoId,
    /// URL the image was (or will be) downloaded from.
    pub source_url: String,
    pub channel_title: String,
    pub title: String,
    pub width: i32,
    pub height: i32,
}

/// A complete thumbnail: metadata plus image bytes.
///
/// Built either from a cache hit (metadata hash + content file) or from a
/// fresh remote fetch. Never mutated after construction.
#[derive(Clone, PartialEq, Eq)]
pub struct ThumbnailRecord {
    pub metadata: ThumbnailMetadata,
    pub image: Bytes,
}

impl ThumbnailRecord {
    pub fn new(metadata: ThumbnailMetadata, image: impl Into<Bytes>) -> Self {
        Self {
            metadata,
            image: image.into(),
        }
    }

    pub fn id(&self) -> &VideoId {
        &self.metadata.id
    }
}

impl std::fmt::Debug for ThumbnailRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailRecord")
            .field("metadata", &self.metadata)
            .field("image_len", &self.image.len())
            .finish()
    }
}

/// Why a single requested item could not be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The locator did not yield an identifier.
    InvalidLocator,
    /// The upstream API returned no metadata for the identifier.
    NotFound,
    /// The image download failed or did not finish before the deadline.
    DownloadFailed,
}

impl FailureKind {
    /// Message reported to the caller.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidLocator => "invalid locator",
            Self::NotFound => "not found",
            Self::DownloadFailed => "download failed",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed entry in a response batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailFailure {
    /// The identifier, or the raw locator when no identifier could be extracted.
    pub key: String,
    pub kind: FailureKind,
}

/// One entry of a response batch.
///
/// Batches are unordered: entries must be matched to requests by
/// [`key`](Self::key), never by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailResult {
    Success(ThumbnailRecord),
    Failure(ThumbnailFailure),
}

impl ThumbnailResult {
    pub fn success(record: ThumbnailRecord) -> Self {
        Self::Success(record)
    }

    pub fn failure<S: Into<String>>(key: S, kind: FailureKind) -> Self {
        Self::Failure(ThumbnailFailure {
            key: key.into(),
            kind,
        })
    }

    /// Identifier (success) or identifier/locator (failure) this entry answers.
    pub fn key(&self) -> &str {
        match self {
            Self::Success(record) => record.id().as_str(),
            Self::Failure(failure) => &failure.key,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn record(&self) -> Option<&ThumbnailRecord> {
        match self {
            Self::Success(record) => Some(record),
            Self::Failure(_) => None,
        }
    }

    pub fn into_record(self) -> Option<ThumbnailRecord> {
        match self {
            Self::Success(record) => Some(record),
            Self::Failure(_) => None,
        }
    }

    /// Failure message, `None` for successes.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure.kind.as_str()),
        }
    }
}

/// Success/error counts of a response, used for traffic logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResponseStats {
    pub successes: usize,
    pub errors: usize,
}

impl ResponseStats {
    pub fn of<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a ThumbnailResult>,
    {
        results
            .into_iter()
            .fold(Self::default(), |mut stats, result| {
                if result.is_success() {
                    stats.successes += 1;
                } else {
                    stats.errors += 1;
                }
                stats
            })
    }
}

impl std::fmt::Display for ResponseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "successes: {}; errors: {}.", self.successes, self.errors)
    }
}
