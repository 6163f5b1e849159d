//! Shared test harness for integration tests.
//!
//! [`TestHarness`] wires a full [`AppContext`] around an in-memory metadata
//! store, a temporary media directory and a wiremock server standing in for
//! the YouTube API. Videos registered with [`TestHarness::add_video`] are
//! served by the fake `/videos` endpoint and their images by `/img/<id>.jpg`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tempfile::TempDir;
use thumbcache::config::{CacheBackend, Config};
use thumbcache::context::AppContext;
use thumbcache::remote::YouTubeClient;
use thumbcache::server::create_router;
use thumbcache_common::{ThumbnailRecord, VideoId};
use thumbcache_store::MemoryStore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub struct TestHarness {
    pub ctx: AppContext,
    pub store: Arc<MemoryStore>,
    pub remote: MockServer,
    pub media: TempDir,
    catalog: Arc<Mutex<HashMap<String, Value>>>,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Build a harness after letting `customize` adjust the test config.
    pub async fn with_config(customize: impl FnOnce(&mut Config)) -> Self {
        let remote = MockServer::start().await;
        let media = tempfile::tempdir().expect("failed to create media dir");

        let mut config = Config::default();
        config.cache.backend = CacheBackend::Memory;
        config.cache.media_dir = media.path().to_path_buf();
        config.remote.base_url = remote.uri();
        config.remote.api_key = Some("test-key".into());
        config.remote.fetch_timeout_secs = 2;
        config.remote.request_timeout_secs = 5;
        customize(&mut config);

        let catalog: Arc<Mutex<HashMap<String, Value>>> = Arc::default();
        let served = catalog.clone();
        Mock::given(method("GET"))
            .and(path("/videos"))
            .respond_with(move |req: &Request| {
                let catalog = served.lock();
                let items: Vec<Value> = req
                    .url
                    .query_pairs()
                    .filter(|(k, _)| k == "id")
                    .filter_map(|(_, id)| catalog.get(&*id).cloned())
                    .collect();
                ResponseTemplate::new(200).set_body_json(json!({ "items": items }))
            })
            .mount(&remote)
            .await;

        let store = Arc::new(MemoryStore::new());
        let client = YouTubeClient::new(
            config.remote.base_url.clone(),
            "test-key",
            config.remote.request_timeout(),
        )
        .expect("failed to build client");

        let ctx = AppContext::from_parts(config, store.clone(), Arc::new(client))
            .expect("failed to build context");

        Self {
            ctx,
            store,
            remote,
            media,
            catalog,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        let harness = Self::new().await;
        let app = create_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    pub fn locator(id: &str) -> String {
        format!("https://www.youtube.com/watch?v={id}")
    }

    pub fn image_bytes(id: &str) -> Vec<u8> {
        format!("\u{FF}jpeg-{id}").into_bytes()
    }

    pub fn image_url(&self, id: &str) -> String {
        format!("{}/img/{id}.jpg", self.remote.uri())
    }

    /// Register a video in the fake API and serve its image.
    pub async fn add_video(&self, id: &str) {
        self.add_video_with(id, ResponseTemplate::new(200).set_body_bytes(Self::image_bytes(id)))
            .await;
    }

    /// Register a video whose image endpoint answers with `image`.
    pub async fn add_video_with(&self, id: &str, image: ResponseTemplate) {
        self.catalog.lock().insert(
            id.to_string(),
            json!({
                "id": id,
                "snippet": {
                    "channelTitle": format!("Channel {id}"),
                    "title": format!("Video {id}"),
                    "thumbnails": {
                        "maxres": {"url": self.image_url(id), "width": 1280, "height": 720}
                    }
                }
            }),
        );

        Mock::given(method("GET"))
            .and(path(format!("/img/{id}.jpg")))
            .respond_with(image)
            .mount(&self.remote)
            .await;
    }

    /// Number of requests the fake API has received so far.
    pub async fn remote_requests(&self) -> usize {
        self.remote
            .received_requests()
            .await
            .map(|reqs| reqs.len())
            .unwrap_or(0)
    }

    /// Number of `/videos` metadata queries received so far.
    pub async fn metadata_requests(&self) -> usize {
        self.remote
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|req| req.url.path() == "/videos")
            .count()
    }

    /// Poll the cache until `id` is a hit or `timeout` elapses.
    pub async fn wait_cached(&self, id: &str, timeout: Duration) -> Option<ThumbnailRecord> {
        let id = VideoId::new(id).ok()?;
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(record) = self.ctx.cache.get_one(&id).await {
                return Some(record);
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}
