//! Request-facing thumbnail resolution.
//!
//! A batch goes locator parsing -> one pipelined cache lookup -> one bulk
//! metadata query for the misses -> concurrent image downloads under a shared
//! deadline. Every distinct request gets exactly one entry; fresh successes
//! are handed to the write-behind queue without waiting for persistence.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use thumbcache_common::{
    Error, FailureKind, ResponseStats, Result, ThumbnailResult, VideoId,
};
use thumbcache_store::MetadataCache;
use tracing::{debug, info, warn};

use crate::remote::{ImageSlot, RemoteSource, VideoMetadata};
use crate::writeback::{WriteBatch, WriteBehindQueue};

/// Default deadline shared by the image downloads of one request.
pub const DEFAULT_FETCH_DEADLINE: Duration = Duration::from_secs(15);

pub struct Orchestrator {
    cache: Arc<MetadataCache>,
    remote: Arc<dyn RemoteSource>,
    writeback: Arc<WriteBehindQueue>,
    fetch_deadline: Duration,
}

impl Orchestrator {
    pub fn new(
        cache: Arc<MetadataCache>,
        remote: Arc<dyn RemoteSource>,
        writeback: Arc<WriteBehindQueue>,
        fetch_deadline: Duration,
    ) -> Self {
        Self {
            cache,
            remote,
            writeback,
            fetch_deadline,
        }
    }

    /// Resolve every locator, one entry per distinct identifier.
    ///
    /// Per-item problems become failure entries; the only error is
    /// [`Error::NothingToRespond`] for an input that yields no entries.
    pub async fn resolve_batch<S: AsRef<str>>(
        &self,
        locators: &[S],
    ) -> Result<Vec<ThumbnailResult>> {
        let (ids, mut results) = parse_locators(locators);

        if !ids.is_empty() {
            let lookup = self.cache.get_batch(&ids).await;
            if let Some(e) = &lookup.error {
                warn!(error = %e, ids = ids.len(), "Cache unavailable; fetching everything remotely");
            }
            debug!(hits = lookup.hits.len(), misses = lookup.misses.len(), "Cache lookup done");

            results.extend(lookup.hits.into_iter().map(ThumbnailResult::success));

            let fetched = self.fetch_missing(&lookup.misses).await;
            self.write_behind(&fetched).await;
            results.extend(fetched);
        }

        if results.is_empty() {
            return Err(Error::NothingToRespond);
        }

        info!("{}", ResponseStats::of(&results));
        Ok(results)
    }

    /// Resolve a single locator.
    pub async fn resolve_one(&self, locator: &str) -> ThumbnailResult {
        let id = match VideoId::from_locator(locator) {
            Ok(id) => id,
            Err(e) => {
                debug!(locator, error = %e, "Rejected locator");
                return ThumbnailResult::failure(locator, FailureKind::InvalidLocator);
            }
        };

        if let Some(record) = self.cache.get_one(&id).await {
            return ThumbnailResult::success(record);
        }

        let mut fetched = self.fetch_missing(std::slice::from_ref(&id)).await;
        self.write_behind(&fetched).await;
        fetched
            .pop()
            .unwrap_or_else(|| ThumbnailResult::failure(id.as_str(), FailureKind::NotFound))
    }

    /// Fetch cache misses from the remote source, one entry per id.
    async fn fetch_missing(&self, ids: &[VideoId]) -> Vec<ThumbnailResult> {
        if ids.is_empty() {
            return Vec::new();
        }

        let mut by_id: HashMap<String, VideoMetadata> = HashMap::new();
        match self.remote.fetch_metadata_bulk(ids).await {
            Ok(items) => {
                for item in items {
                    by_id.entry(item.id.clone()).or_insert(item);
                }
            }
            Err(e) => warn!(
                source = self.remote.name(),
                ids = ids.len(),
                error = %e,
                "Remote metadata fetch failed"
            ),
        }

        let mut results = Vec::with_capacity(ids.len());
        let mut found = Vec::new();
        for id in ids {
            match by_id.remove(id.as_str()) {
                Some(meta) => found.push((id.clone(), meta)),
                None => results.push(ThumbnailResult::failure(id.as_str(), FailureKind::NotFound)),
            }
        }
        if found.is_empty() {
            return results;
        }

        let urls: Vec<String> = found.iter().map(|(_, meta)| meta.thumbnail_url.clone()).collect();
        let images = self
            .remote
            .fetch_images_bounded(&urls, self.fetch_deadline)
            .await;
        if images.timed_out {
            warn!(
                fetched = images.fetched(),
                requested = urls.len(),
                "Image downloads hit the deadline"
            );
        }

        for ((id, meta), slot) in found.into_iter().zip(images.into_slots()) {
            match slot {
                ImageSlot::Fetched(image) => {
                    results.push(ThumbnailResult::success(meta.into_record(id, image)))
                }
                ImageSlot::Failed(_) | ImageSlot::Pending => results.push(
                    ThumbnailResult::failure(id.as_str(), FailureKind::DownloadFailed),
                ),
            }
        }
        results
    }

    /// Queue the successes among `fetched` for persistence. Failures to
    /// enqueue are logged and otherwise ignored.
    async fn write_behind(&self, fetched: &[ThumbnailResult]) {
        let successes: Vec<ThumbnailResult> = fetched
            .iter()
            .filter(|result| result.is_success())
            .cloned()
            .collect();
        if successes.is_empty() {
            return;
        }

        let batch = match WriteBatch::from_results(successes) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(error = %e, "Could not build write batch");
                return;
            }
        };

        let records = batch.len();
        if let Err(e) = self.writeback.enqueue(batch).await {
            warn!(records, error = %e, "Fresh thumbnails will not be cached");
        }
    }
}

/// Split locators into distinct identifiers (first occurrence order) and
/// failure entries for the unusable ones.
fn parse_locators<S: AsRef<str>>(locators: &[S]) -> (Vec<VideoId>, Vec<ThumbnailResult>) {
    let mut ids = Vec::new();
    let mut failures = Vec::new();
    let mut seen_ids = HashSet::new();
    let mut seen_invalid = HashSet::new();

    for locator in locators {
        let locator = locator.as_ref();
        match VideoId::from_locator(locator) {
            Ok(id) => {
                if seen_ids.insert(id.clone()) {
                    ids.push(id);
                }
            }
            Err(e) => {
                if seen_invalid.insert(locator) {
                    debug!(locator, error = %e, "Rejected locator");
                    failures.push(ThumbnailResult::failure(locator, FailureKind::InvalidLocator));
                }
            }
        }
    }

    (ids, failures)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_collapses_duplicates() {
        let locators = [
            "https://www.youtube.com/watch?v=abc",
            "not a url",
            "https://youtu.be/watch?v=abc&t=10",
            "https://www.youtube.com/watch?v=def",
            "not a url",
            "https://www.youtube.com/watch",
        ];
        let (ids, failures) = parse_locators(&locators);

        assert_eq!(
            ids,
            vec![VideoId::new("abc").unwrap(), VideoId::new("def").unwrap()]
        );
        let keys: Vec<_> = failures.iter().map(ThumbnailResult::key).collect();
        assert_eq!(keys, vec!["not a url", "https://www.youtube.com/watch"]);
        assert!(failures
            .iter()
            .all(|f| f.message() == Some("invalid locator")));
    }

    #[test]
    fn test_parse_empty() {
        let (ids, failures) = parse_locators::<&str>(&[]);
        assert!(ids.is_empty());
        assert!(failures.is_empty());
    }
}
