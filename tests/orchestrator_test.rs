//! End-to-end resolution tests against the fake YouTube API.

mod common;

use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use common::TestHarness;
use thumbcache_common::{Error, ThumbnailResult, VideoId};
use wiremock::matchers::path;
use wiremock::{Mock, ResponseTemplate};

const PERSIST_WAIT: Duration = Duration::from_secs(3);

fn find<'a>(results: &'a [ThumbnailResult], key: &str) -> &'a ThumbnailResult {
    results
        .iter()
        .find(|r| r.key() == key)
        .unwrap_or_else(|| panic!("no entry for {key}"))
}

// ---------------------------------------------------------------------------
// Core scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn miss_is_fetched_and_persisted() {
    let h = TestHarness::new().await;
    h.add_video("abc").await;

    let results = h
        .ctx
        .orchestrator
        .resolve_batch(&[TestHarness::locator("abc")])
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    let record = results[0].record().expect("expected success").clone();
    assert_eq!(record.metadata.title, "Video abc");
    assert_eq!(record.metadata.channel_title, "Channel abc");
    assert_eq!(record.metadata.source_url, h.image_url("abc"));
    assert_eq!((record.metadata.width, record.metadata.height), (1280, 720));
    assert_eq!(&record.image[..], &TestHarness::image_bytes("abc")[..]);

    let cached = h.wait_cached("abc", PERSIST_WAIT).await.expect("never persisted");
    assert_eq!(cached, record);
}

#[tokio::test]
async fn invalid_locator_touches_nothing() {
    let h = TestHarness::new().await;

    let results = h
        .ctx
        .orchestrator
        .resolve_batch(&["not a url"])
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].key(), "not a url");
    assert_eq!(results[0].message(), Some("invalid locator"));
    assert_eq!(h.store.round_trips(), 0);
    assert_eq!(h.remote_requests().await, 0);
}

#[tokio::test]
async fn unknown_video_is_not_found() {
    let h = TestHarness::new().await;

    let results = h
        .ctx
        .orchestrator
        .resolve_batch(&[TestHarness::locator("ghost")])
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].key(), "ghost");
    assert_eq!(results[0].message(), Some("not found"));
}

#[tokio::test]
async fn hanging_image_is_bounded_by_deadline() {
    let h = TestHarness::with_config(|c| c.remote.fetch_timeout_secs = 1).await;
    let ids: Vec<String> = (0..10).map(|i| format!("vid{i}")).collect();
    for id in &ids[..9] {
        h.add_video(id).await;
    }
    h.add_video_with(
        &ids[9],
        ResponseTemplate::new(200)
            .set_body_bytes(b"late".to_vec())
            .set_delay(Duration::from_secs(30)),
    )
    .await;

    let locators: Vec<String> = ids.iter().map(|id| TestHarness::locator(id)).collect();
    let started = Instant::now();
    let results = h.ctx.orchestrator.resolve_batch(&locators).await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_secs(4), "took {elapsed:?}");
    assert_eq!(results.len(), 10);
    assert_eq!(results.iter().filter(|r| r.is_success()).count(), 9);
    assert_eq!(find(&results, "vid9").message(), Some("download failed"));
}

// ---------------------------------------------------------------------------
// Batch shape
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_entry_per_distinct_identifier() {
    let h = TestHarness::new().await;
    h.add_video("a").await;
    h.add_video("b").await;

    let results = h
        .ctx
        .orchestrator
        .resolve_batch(&[
            TestHarness::locator("a"),
            TestHarness::locator("a"),
            "https://youtu.be/watch?v=a&t=42".to_string(),
            TestHarness::locator("b"),
            "junk".to_string(),
            "junk".to_string(),
        ])
        .await
        .unwrap();

    let mut keys: Vec<&str> = results.iter().map(ThumbnailResult::key).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["a", "b", "junk"]);
}

#[tokio::test]
async fn mixed_batch_reports_each_outcome() {
    let h = TestHarness::new().await;
    h.add_video("cached").await;
    h.ctx
        .orchestrator
        .resolve_batch(&[TestHarness::locator("cached")])
        .await
        .unwrap();
    h.wait_cached("cached", PERSIST_WAIT).await.unwrap();

    h.add_video("fresh").await;
    h.add_video_with("broken", ResponseTemplate::new(404)).await;

    let results = h
        .ctx
        .orchestrator
        .resolve_batch(&[
            TestHarness::locator("cached"),
            TestHarness::locator("fresh"),
            TestHarness::locator("broken"),
            TestHarness::locator("ghost"),
            "https://www.youtube.com/watch?list=x".to_string(),
        ])
        .await
        .unwrap();

    assert_eq!(results.len(), 5);
    assert!(find(&results, "cached").is_success());
    assert!(find(&results, "fresh").is_success());
    assert_eq!(find(&results, "broken").message(), Some("download failed"));
    assert_eq!(find(&results, "ghost").message(), Some("not found"));
    assert_eq!(
        find(&results, "https://www.youtube.com/watch?list=x").message(),
        Some("invalid locator")
    );
}

#[tokio::test]
async fn mixed_batch_persists_only_successes() {
    let h = TestHarness::new().await;
    h.add_video("fresh").await;
    h.add_video_with("broken", ResponseTemplate::new(404)).await;

    let results = h
        .ctx
        .orchestrator
        .resolve_batch(&[
            TestHarness::locator("fresh"),
            TestHarness::locator("broken"),
            TestHarness::locator("ghost"),
        ])
        .await
        .unwrap();
    assert_eq!(results.iter().filter(|r| r.is_success()).count(), 1);

    let cached = h.wait_cached("fresh", PERSIST_WAIT).await.unwrap();
    assert_eq!(cached.image, TestHarness::image_bytes("fresh"));

    let stats = h.ctx.shutdown().await.unwrap();
    assert_eq!(stats.accepted, 1);
    assert_eq!(stats.persisted_records, 1);
    assert_eq!(stats.failed_records, 0);
    assert!(h.store.hash("video:broken").is_none());
    assert!(h.store.hash("video:ghost").is_none());
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn empty_input_is_nothing_to_respond() {
    let h = TestHarness::new().await;
    let err = h
        .ctx
        .orchestrator
        .resolve_batch::<String>(&[])
        .await
        .unwrap_err();
    assert_matches!(err, Error::NothingToRespond);
}

#[tokio::test]
async fn metadata_is_queried_once_per_batch() {
    let h = TestHarness::new().await;
    for id in ["a", "b", "c"] {
        h.add_video(id).await;
    }

    h.ctx
        .orchestrator
        .resolve_batch(&[
            TestHarness::locator("a"),
            TestHarness::locator("b"),
            TestHarness::locator("c"),
        ])
        .await
        .unwrap();

    assert_eq!(h.metadata_requests().await, 1);
}

// ---------------------------------------------------------------------------
// Cache behaviour
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cached_entry_skips_remote() {
    let h = TestHarness::new().await;
    h.add_video("abc").await;
    let locators = [TestHarness::locator("abc")];

    let first = h.ctx.orchestrator.resolve_batch(&locators).await.unwrap();
    h.wait_cached("abc", PERSIST_WAIT).await.unwrap();
    let queries = h.metadata_requests().await;

    let second = h.ctx.orchestrator.resolve_batch(&locators).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(h.metadata_requests().await, queries);
}

#[tokio::test]
async fn corrupted_metadata_forces_refetch() {
    let h = TestHarness::new().await;
    h.add_video("abc").await;
    let locators = [TestHarness::locator("abc")];

    h.ctx.orchestrator.resolve_batch(&locators).await.unwrap();
    h.wait_cached("abc", PERSIST_WAIT).await.unwrap();
    let queries = h.metadata_requests().await;

    let mut fields = h.store.hash("video:abc").unwrap();
    fields.insert("id".into(), "someone-else".into());
    h.store.put_hash("video:abc", fields);

    let results = h.ctx.orchestrator.resolve_batch(&locators).await.unwrap();
    assert!(results[0].is_success());
    assert_eq!(h.metadata_requests().await, queries + 1);
}

#[tokio::test]
async fn missing_image_file_forces_refetch() {
    let h = TestHarness::new().await;
    h.add_video("abc").await;
    let locators = [TestHarness::locator("abc")];

    h.ctx.orchestrator.resolve_batch(&locators).await.unwrap();
    h.wait_cached("abc", PERSIST_WAIT).await.unwrap();
    let queries = h.metadata_requests().await;

    let id = VideoId::new("abc").unwrap();
    std::fs::remove_file(h.ctx.cache.content().path_for(&id)).unwrap();

    let results = h.ctx.orchestrator.resolve_batch(&locators).await.unwrap();
    assert!(results[0].is_success());
    assert_eq!(h.metadata_requests().await, queries + 1);

    // The refetched image is written back.
    h.wait_cached("abc", PERSIST_WAIT).await.unwrap();
}

#[tokio::test]
async fn cache_outage_falls_back_to_remote() {
    let h = TestHarness::new().await;
    h.add_video("abc").await;
    h.store.set_available(false);

    let results = h
        .ctx
        .orchestrator
        .resolve_batch(&[TestHarness::locator("abc")])
        .await
        .unwrap();
    assert!(results[0].is_success());
}

#[tokio::test]
async fn remote_error_means_not_found() {
    let h = TestHarness::new().await;
    h.add_video("abc").await;
    Mock::given(path("/videos"))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .mount(&h.remote)
        .await;

    let results = h
        .ctx
        .orchestrator
        .resolve_batch(&[TestHarness::locator("abc")])
        .await
        .unwrap();
    assert_eq!(results[0].message(), Some("not found"));
}

#[tokio::test]
async fn repeated_persistence_keeps_one_entry() {
    let h = TestHarness::new().await;
    h.add_video("abc").await;
    let locators = [TestHarness::locator("abc")];

    h.ctx.orchestrator.resolve_batch(&locators).await.unwrap();
    h.wait_cached("abc", PERSIST_WAIT).await.unwrap();

    // Force a second fetch and write of the same record.
    h.store.remove("video:abc");
    h.ctx.orchestrator.resolve_batch(&locators).await.unwrap();
    h.wait_cached("abc", PERSIST_WAIT).await.unwrap();

    let stats = h.ctx.shutdown().await.unwrap();
    assert_eq!(stats.persisted_records, 2);
    assert_eq!(h.store.len(), 1);

    let id = VideoId::new("abc").unwrap();
    let shard = h.ctx.cache.content().path_for(&id);
    let files = std::fs::read_dir(shard.parent().unwrap()).unwrap().count();
    assert_eq!(files, 1);
}

// ---------------------------------------------------------------------------
// Single lookups
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resolve_one_outcomes() {
    let h = TestHarness::new().await;
    h.add_video("abc").await;

    let hit = h.ctx.orchestrator.resolve_one(&TestHarness::locator("abc")).await;
    assert!(hit.is_success());
    h.wait_cached("abc", PERSIST_WAIT).await.unwrap();

    let again = h.ctx.orchestrator.resolve_one(&TestHarness::locator("abc")).await;
    assert_eq!(again, hit);

    let missing = h.ctx.orchestrator.resolve_one(&TestHarness::locator("nope")).await;
    assert_eq!(missing.message(), Some("not found"));

    let invalid = h.ctx.orchestrator.resolve_one("::").await;
    assert_eq!(invalid.key(), "::");
    assert_eq!(invalid.message(), Some("invalid locator"));
}

#[tokio::test]
async fn shutdown_drains_pending_writes() {
    let h = TestHarness::new().await;
    for id in ["a", "b"] {
        h.add_video(id).await;
    }

    h.ctx
        .orchestrator
        .resolve_batch(&[TestHarness::locator("a"), TestHarness::locator("b")])
        .await
        .unwrap();
    let stats = h.ctx.shutdown().await.unwrap();

    assert_eq!(stats.persisted_records, 2);
    assert_eq!(stats.pending, 0);
    assert!(h.wait_cached("a", Duration::ZERO).await.is_some());
    assert!(h.wait_cached("b", Duration::ZERO).await.is_some());
}
