//! Thumbnail metadata cache.
//!
//! Metadata lives in the key/value tier as a hash under `video:<id>` with the
//! fields `id`, `url`, `channelTitle`, `title`, `width` and `height`. Image
//! bytes live in the [`ContentStore`]. A lookup is a hit only when both tiers
//! answer and the stored `id` matches the requested one; anything partial is
//! a miss.

use std::sync::Arc;

use futures::future::join_all;
use thumbcache_common::{ThumbnailMetadata, ThumbnailRecord, VideoId};
use tracing::{debug, warn};

use crate::backend::{FieldMap, HashStore};
use crate::content::ContentStore;
use crate::error::{Error, Result};

/// Key prefix for metadata hashes.
pub const KEY_PREFIX: &str = "video:";

const FIELD_ID: &str = "id";
const FIELD_URL: &str = "url";
const FIELD_CHANNEL_TITLE: &str = "channelTitle";
const FIELD_TITLE: &str = "title";
const FIELD_WIDTH: &str = "width";
const FIELD_HEIGHT: &str = "height";

/// Backend key for `id`.
pub fn cache_key(id: &VideoId) -> String {
    format!("{KEY_PREFIX}{id}")
}

/// Outcome of a batch lookup.
#[derive(Debug, Default)]
pub struct CacheLookup {
    /// Complete records found in both tiers.
    pub hits: Vec<ThumbnailRecord>,
    /// Identifiers that must be fetched elsewhere, in request order.
    pub misses: Vec<VideoId>,
    /// Set when the backend pipeline failed; every id is then a miss.
    pub error: Option<Error>,
}

/// Two-tier thumbnail cache: metadata hashes plus content-addressed images.
pub struct MetadataCache {
    store: Arc<dyn HashStore>,
    content: ContentStore,
}

impl MetadataCache {
    pub fn new(store: Arc<dyn HashStore>, content: ContentStore) -> Self {
        Self { store, content }
    }

    /// The image tier.
    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    /// Name of the key/value backend.
    pub fn backend_name(&self) -> &'static str {
        self.store.name()
    }

    /// Check that the key/value backend is reachable.
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    /// Look up a single identifier.
    pub async fn get_one(&self, id: &VideoId) -> Option<ThumbnailRecord> {
        let keys = [cache_key(id)];
        let fields = match self.store.get_hashes(&keys).await {
            Ok(rows) => rows.into_iter().next()?,
            Err(e) => {
                warn!(id = %id, backend = self.store.name(), error = %e, "Cache lookup failed");
                return None;
            }
        };

        let record = self.assemble(id, fields).await;
        debug!(id = %id, hit = record.is_some(), "Searched cache");
        record
    }

    /// Look up many identifiers with one backend round trip.
    ///
    /// Image files of the candidate hits are read concurrently afterwards.
    /// A backend failure does not propagate: all ids come back as misses and
    /// the error is attached to the lookup.
    pub async fn get_batch(&self, ids: &[VideoId]) -> CacheLookup {
        if ids.is_empty() {
            return CacheLookup::default();
        }

        let keys: Vec<String> = ids.iter().map(cache_key).collect();
        let rows = match self.store.get_hashes(&keys).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    backend = self.store.name(),
                    ids = ids.len(),
                    error = %e,
                    "Cache pipeline failed; treating batch as misses"
                );
                return CacheLookup {
                    hits: Vec::new(),
                    misses: ids.to_vec(),
                    error: Some(e),
                };
            }
        };

        let mut rows = rows.into_iter();
        let candidates: Vec<_> = ids
            .iter()
            .map(|id| (id, rows.next().unwrap_or_default()))
            .collect();

        let resolved = join_all(
            candidates
                .into_iter()
                .map(|(id, fields)| async move { (id, self.assemble(id, fields).await) }),
        )
        .await;

        let mut lookup = CacheLookup::default();
        for (id, record) in resolved {
            match record {
                Some(record) => lookup.hits.push(record),
                None => lookup.misses.push(id.clone()),
            }
        }

        debug!(
            hits = lookup.hits.len(),
            misses = lookup.misses.len(),
            "Searched cache"
        );
        lookup
    }

    /// Store the metadata of every record with one backend round trip.
    ///
    /// Only the write-behind consumer calls this; errors are returned to it
    /// for logging and never reach a request.
    pub async fn set_batch(&self, records: &[ThumbnailRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let entries: Vec<(String, Vec<(String, String)>)> = records
            .iter()
            .map(|record| (cache_key(record.id()), encode_fields(&record.metadata)))
            .collect();

        self.store.set_hashes(&entries).await?;
        debug!(records = records.len(), "Cache set pipeline executed");
        Ok(())
    }

    async fn assemble(&self, id: &VideoId, fields: FieldMap) -> Option<ThumbnailRecord> {
        let metadata = decode_fields(id, &fields)?;
        let image = self.content.read(id).await?;
        Some(ThumbnailRecord::new(metadata, image))
    }
}

fn encode_fields(metadata: &ThumbnailMetadata) -> Vec<(String, String)> {
    vec![
        (FIELD_ID.to_string(), metadata.id.to_string()),
        (FIELD_URL.to_string(), metadata.source_url.clone()),
        (FIELD_CHANNEL_TITLE.to_string(), metadata.channel_title.clone()),
        (FIELD_TITLE.to_string(), metadata.title.clone()),
        (FIELD_WIDTH.to_string(), metadata.width.to_string()),
        (FIELD_HEIGHT.to_string(), metadata.height.to_string()),
    ]
}

/// Rebuild metadata from a stored hash.
///
/// Returns `None` for an empty hash, a stored id that differs from the
/// requested one, or dimensions that do not parse.
fn decode_fields(requested: &VideoId, fields: &FieldMap) -> Option<ThumbnailMetadata> {
    if fields.is_empty() {
        return None;
    }

    let stored_id = fields.get(FIELD_ID)?;
    if stored_id != requested.as_str() {
        warn!(requested = %requested, stored = %stored_id, "Cached metadata id mismatch");
        return None;
    }

    let text = |field: &str| fields.get(field).cloned().unwrap_or_default();
    let width = fields.get(FIELD_WIDTH)?.parse().ok()?;
    let height = fields.get(FIELD_HEIGHT)?.parse().ok()?;

    Some(ThumbnailMetadata {
        id: requested.clone(),
        source_url: text(FIELD_URL),
        channel_title: text(FIELD_CHANNEL_TITLE),
        title: text(FIELD_TITLE),
        width,
        height,
    })
}
