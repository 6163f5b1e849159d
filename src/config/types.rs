use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::orchestrator::DEFAULT_FETCH_DEADLINE;
use crate::remote::DEFAULT_BASE_URL;
use crate::writeback::{
    QueueSettings, ShutdownPolicy, DEFAULT_CAPACITY, DEFAULT_ENQUEUE_TIMEOUT,
};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub writeback: WritebackConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Redis,
    /// In-process store; contents are lost on exit.
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,

    /// Connection URL for the redis backend
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Root directory of cached image files (created at startup)
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_media_dir() -> PathBuf {
    PathBuf::from("./media")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            redis_url: default_redis_url(),
            media_dir: default_media_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    /// YouTube Data API key (overridden by `YOUTUBE_API_KEY`)
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout of the bulk metadata request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Deadline shared by the image downloads of one request
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_DEADLINE.as_secs()
}

impl RemoteConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WritebackConfig {
    /// Number of batches the write-behind buffer holds
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Longest wait for buffer space before a batch is dropped
    #[serde(default = "default_enqueue_timeout")]
    pub enqueue_timeout_ms: u64,

    /// What to do with buffered batches on shutdown
    #[serde(default)]
    pub shutdown: ShutdownPolicy,

    /// Upper bound on waiting for the queue at process exit
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}
fn default_enqueue_timeout() -> u64 {
    DEFAULT_ENQUEUE_TIMEOUT.as_millis() as u64
}
fn default_shutdown_timeout() -> u64 {
    5
}

impl WritebackConfig {
    pub fn queue_settings(&self) -> QueueSettings {
        QueueSettings {
            capacity: self.capacity,
            enqueue_timeout: Duration::from_millis(self.enqueue_timeout_ms),
            shutdown: self.shutdown,
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for WritebackConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            enqueue_timeout_ms: default_enqueue_timeout(),
            shutdown: ShutdownPolicy::default(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}
