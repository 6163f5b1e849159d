//! Remote source of thumbnail metadata and images.
//!
//! [`RemoteSource`] is the fallback behind the cache: one bulk metadata
//! query per batch of misses, then one concurrent download per image URL
//! under a shared deadline. [`YouTubeClient`] is the production
//! implementation.

mod fanout;
mod youtube;

pub use fanout::{fetch_all_bounded, ImageBatch, ImageSlot};
pub use youtube::{YouTubeClient, DEFAULT_BASE_URL};

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thumbcache_common::{ThumbnailMetadata, ThumbnailRecord, VideoId};

/// Metadata the remote API reports for one video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: String,
    pub channel_title: String,
    pub title: String,
    /// URL of the largest thumbnail; empty when the API lists none.
    pub thumbnail_url: String,
    pub width: i32,
    pub height: i32,
}

impl VideoMetadata {
    /// Combine with downloaded image bytes into a cacheable record.
    pub fn into_record(self, id: VideoId, image: bytes::Bytes) -> ThumbnailRecord {
        ThumbnailRecord::new(
            ThumbnailMetadata {
                id,
                source_url: self.thumbnail_url,
                channel_title: self.channel_title,
                title: self.title,
                width: self.width,
                height: self.height,
            },
            image,
        )
    }
}

/// Upstream API adapter.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Short, lowercase identifier for logs (e.g. `"youtube"`).
    fn name(&self) -> &'static str;

    /// Fetch metadata for all `ids` with a single outbound request.
    ///
    /// Items may come back in any order and ids the API does not know are
    /// simply absent. Callers treat an error as "no metadata available".
    async fn fetch_metadata_bulk(&self, ids: &[VideoId]) -> anyhow::Result<Vec<VideoMetadata>>;

    /// Download every URL concurrently, giving up on whatever is still
    /// running once `deadline` has elapsed.
    ///
    /// Slot `i` of the returned batch answers `urls[i]`.
    async fn fetch_images_bounded(&self, urls: &[String], deadline: Duration) -> ImageBatch;
}
