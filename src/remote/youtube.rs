//! YouTube Data API v3 client.
//!
//! Metadata comes from `GET {base}/videos?part=snippet&id=..&key=..` with
//! every requested id in one query. Images are plain GETs of the `maxres`
//! thumbnail URL; only a `200 OK` counts as a download.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use serde::Deserialize;
use thumbcache_common::VideoId;
use tracing::debug;

use super::fanout::{fetch_all_bounded, ImageBatch};
use super::{RemoteSource, VideoMetadata};

/// Public endpoint of the YouTube Data API.
pub const DEFAULT_BASE_URL: &str = "https://youtube.googleapis.com/youtube/v3";

// ---------------------------------------------------------------------------
// API response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    #[serde(default)]
    snippet: Snippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    maxres: Option<ThumbnailInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct ThumbnailInfo {
    #[serde(default)]
    url: String,
    #[serde(default)]
    width: i32,
    #[serde(default)]
    height: i32,
}

impl From<VideoItem> for VideoMetadata {
    fn from(item: VideoItem) -> Self {
        let thumb = item.snippet.thumbnails.maxres.unwrap_or_default();
        Self {
            id: item.id,
            channel_title: item.snippet.channel_title,
            title: item.snippet.title,
            thumbnail_url: thumb.url,
            width: thumb.width,
            height: thumb.height,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// [`RemoteSource`] backed by the YouTube Data API.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use thumbcache::remote::{YouTubeClient, DEFAULT_BASE_URL};
///
/// let client = YouTubeClient::new(DEFAULT_BASE_URL, "your-api-key", Duration::from_secs(30))
///     .unwrap();
/// ```
pub struct YouTubeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    request_timeout: Duration,
}

impl YouTubeClient {
    /// Build a client. `request_timeout` bounds the metadata query; image
    /// downloads are bounded by the deadline passed to each batch instead.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("thumbcache/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            request_timeout,
        })
    }

    fn videos_query<'a>(&'a self, ids: &'a [VideoId]) -> Vec<(&'static str, &'a str)> {
        let mut query = Vec::with_capacity(ids.len() + 2);
        query.push(("part", "snippet"));
        query.extend(ids.iter().map(|id| ("id", id.as_str())));
        query.push(("key", self.api_key.as_str()));
        query
    }
}

#[async_trait]
impl RemoteSource for YouTubeClient {
    fn name(&self) -> &'static str {
        "youtube"
    }

    async fn fetch_metadata_bulk(&self, ids: &[VideoId]) -> anyhow::Result<Vec<VideoMetadata>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/videos", self.base_url);
        debug!(ids = ids.len(), "YouTube videos request");

        let resp = self
            .client
            .get(&url)
            .query(&self.videos_query(ids))
            .timeout(self.request_timeout)
            .send()
            .await
            .context("YouTube videos request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("YouTube API returned HTTP {status}");
        }

        let body: VideoListResponse = resp
            .json()
            .await
            .context("Failed to decode YouTube videos response")?;

        debug!(requested = ids.len(), items = body.items.len(), "YouTube videos response");
        Ok(body.items.into_iter().map(VideoMetadata::from).collect())
    }

    async fn fetch_images_bounded(&self, urls: &[String], deadline: Duration) -> ImageBatch {
        let client = self.client.clone();
        fetch_all_bounded(urls, deadline, move |url| {
            let client = client.clone();
            async move { download(&client, &url).await }
        })
        .await
    }
}

async fn download(client: &reqwest::Client, url: &str) -> anyhow::Result<Bytes> {
    if url.is_empty() {
        anyhow::bail!("no thumbnail URL");
    }

    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {url} failed"))?;

    if resp.status() != StatusCode::OK {
        anyhow::bail!("GET {url} returned HTTP {}", resp.status());
    }

    resp.bytes()
        .await
        .with_context(|| format!("Failed to read body of {url}"))
}
