//! Application wiring.
//!
//! [`AppContext`] owns every long-lived component behind an `Arc` and is
//! shared by the HTTP handlers and the CLI. There are no globals: tests build
//! a context from parts with an in-memory store and a fake remote.

use std::sync::Arc;

use anyhow::{Context, Result};
use thumbcache_store::{ContentStore, HashStore, MemoryStore, MetadataCache, RedisStore};
use tracing::{info, warn};

use crate::config::{CacheBackend, Config};
use crate::orchestrator::Orchestrator;
use crate::remote::{RemoteSource, YouTubeClient};
use crate::writeback::{QueueStats, WriteBehindQueue};

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub cache: Arc<MetadataCache>,
    pub writeback: Arc<WriteBehindQueue>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppContext {
    /// Connect the configured backends and start the write-behind consumer.
    pub async fn build(config: Config) -> Result<Self> {
        let store: Arc<dyn HashStore> = match config.cache.backend {
            CacheBackend::Redis => Arc::new(
                RedisStore::connect(&config.cache.redis_url)
                    .await
                    .with_context(|| {
                        format!("Failed to connect to Redis at {}", config.cache.redis_url)
                    })?,
            ),
            CacheBackend::Memory => {
                warn!("Using in-memory metadata store; cached metadata is lost on exit");
                Arc::new(MemoryStore::new())
            }
        };

        store
            .ping()
            .await
            .with_context(|| format!("Metadata backend {} is not reachable", store.name()))?;

        let remote: Arc<dyn RemoteSource> = Arc::new(YouTubeClient::new(
            config.remote.base_url.clone(),
            config.remote.api_key.clone().unwrap_or_default(),
            config.remote.request_timeout(),
        )?);

        tokio::fs::create_dir_all(&config.cache.media_dir)
            .await
            .with_context(|| {
                format!("Failed to create media directory {:?}", config.cache.media_dir)
            })?;

        Self::from_parts(config, store, remote)
    }

    /// Wire a context around an existing store and remote source.
    ///
    /// Starts the write-behind consumer, so it must run inside a Tokio
    /// runtime.
    pub fn from_parts(
        config: Config,
        store: Arc<dyn HashStore>,
        remote: Arc<dyn RemoteSource>,
    ) -> Result<Self> {
        let content = ContentStore::new(&config.cache.media_dir);
        let cache = Arc::new(MetadataCache::new(store, content));

        let writeback = Arc::new(WriteBehindQueue::new(
            cache.clone(),
            config.writeback.queue_settings(),
        ));
        writeback.start()?;

        let orchestrator = Arc::new(Orchestrator::new(
            cache.clone(),
            remote,
            writeback.clone(),
            config.remote.fetch_timeout(),
        ));

        info!(
            backend = cache.backend_name(),
            media_dir = %config.cache.media_dir.display(),
            "Thumbnail cache ready"
        );

        Ok(Self {
            config: Arc::new(config),
            cache,
            writeback,
            orchestrator,
        })
    }

    /// Stop the write-behind queue, waiting at most the configured shutdown
    /// timeout. Returns `None` when the timeout elapsed first.
    pub async fn shutdown(&self) -> Option<QueueStats> {
        let timeout = self.config.writeback.shutdown_timeout();
        match tokio::time::timeout(timeout, self.writeback.shutdown()).await {
            Ok(stats) => Some(stats),
            Err(_) => {
                warn!(
                    timeout_secs = timeout.as_secs(),
                    "Write-behind queue did not stop in time; pending writes are abandoned"
                );
                None
            }
        }
    }
}
