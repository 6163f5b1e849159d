//! Content-addressed image storage.
//!
//! Every image lives at `{root}/{shard}/{digest}.jpg`, where `digest` is the
//! hex SHA-256 of the video identifier and `shard` is its first character.
//! The mapping is pure, so readers and the single write-behind writer always
//! agree on a path without any index.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use thumbcache_common::VideoId;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Filesystem store for thumbnail images.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the image file for `id`.
    pub fn path_for(&self, id: &VideoId) -> PathBuf {
        let digest = content_digest(id);
        self.root
            .join(shard_of(&digest))
            .join(format!("{digest}.jpg"))
    }

    /// Read the cached image for `id`.
    ///
    /// A missing file is the normal "not cached" answer. Other read errors
    /// are logged and also reported as absent, so a damaged file degrades to
    /// a cache miss.
    pub async fn read(&self, id: &VideoId) -> Option<Bytes> {
        let path = self.path_for(id);
        match tokio::fs::read(&path).await {
            Ok(data) => Some(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(id = %id, "No cached image file");
                None
            }
            Err(e) => {
                warn!(id = %id, path = %path.display(), error = %e, "Failed to read cached image");
                None
            }
        }
    }

    /// Write (or overwrite) the image for `id`.
    ///
    /// The payload goes to a temporary sibling first and is renamed into
    /// place, so readers never observe a half-written file.
    pub async fn write(&self, id: &VideoId, data: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(id);
        let shard_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());

        tokio::fs::create_dir_all(&shard_dir)
            .await
            .map_err(|e| Error::io(&shard_dir, e))?;

        let tmp_path = path.with_extension("jpg.tmp");
        tokio::fs::write(&tmp_path, data)
            .await
            .map_err(|e| Error::io(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| Error::io(&path, e))?;

        debug!(id = %id, bytes = data.len(), path = %path.display(), "Wrote image file");
        Ok(path)
    }

    /// Whether an image file exists for `id`.
    pub async fn contains(&self, id: &VideoId) -> bool {
        tokio::fs::try_exists(self.path_for(id))
            .await
            .unwrap_or(false)
    }
}

/// Hex SHA-256 of the identifier.
fn content_digest(id: &VideoId) -> String {
    hex::encode(Sha256::digest(id.as_str().as_bytes()))
}

/// Shard directory name: the first hex character of the digest.
fn shard_of(digest: &str) -> &str {
    &digest[..1]
}
