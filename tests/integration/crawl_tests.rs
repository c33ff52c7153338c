//! End-to-end crawl tests against a scripted transport
//!
//! These tests drive `PlatformCrawl` through whole runs, interrupted runs
//! and resumed runs, checking what ends up in the file store.

use crate::common::*;
use bounty_harvest::crawler::{
    run_platforms, CrawlOutcome, CrawlSettings, Paginator, PlatformCrawl, Transport,
};
use bounty_harvest::platform::{ListingContainer, PageRequest, PlatformAdapter};
use bounty_harvest::state::{CrawlPhase, CrawlProgress};
use bounty_harvest::storage::{FileStore, ProgressStore};
use bounty_harvest::{HarvestError, Item, Page, ResultCollection};
use futures::TryStreamExt;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_full_crawl_stops_at_empty_page() {
    let dirs = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    transport.listing_pages(&[&["a", "b"], &["c", "d"]]);
    transport.details(&["a", "b", "c", "d"]);

    let outcome = crawl(&dirs, &transport).run().await.unwrap();

    assert_eq!(
        outcome,
        CrawlOutcome::Finalized {
            pages: 2,
            items: 4,
            skipped: vec![]
        }
    );
    assert_eq!(final_ids(&dirs), vec!["a", "b", "c", "d"]);
    assert_eq!(transport.count(&list_request(3)), 1);
    assert_eq!(transport.count(&list_request(4)), 0);
    assert_eq!(transport.detail_calls(), 4);

    let records = file_store(&dirs).read_final().unwrap().unwrap();
    assert_eq!(records[2]["scopes"], json!(["*.c.test"]));
    assert_eq!(records[2]["name"], json!("Program c"));
}

#[tokio::test]
async fn test_final_artifact_replaces_intermediate_records() {
    let dirs = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    transport.listing_pages(&[&["a"], &["b"]]);
    transport.details(&["a", "b"]);

    crawl(&dirs, &transport).run().await.unwrap();

    let (progress_dir, results_dir) = store_dirs(&dirs);
    assert!(results_dir.join("test.json").exists());
    let leftovers: Vec<_> = std::fs::read_dir(&progress_dir)
        .map(|entries| entries.filter_map(|e| e.ok()).collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty(), "left behind: {:?}", leftovers);
}

#[tokio::test]
async fn test_paginator_stream_persists_each_page() {
    let dirs = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    transport.listing_pages(&[&["a", "b"], &["c"]]);
    let mut store = file_store(&dirs);

    let numbers: Vec<u64> = {
        let pages = Paginator::resume(&TestAdapter, &*transport, &mut store)
            .unwrap()
            .into_stream();
        pages.map_ok(|page| page.number).try_collect().await.unwrap()
    };

    assert_eq!(numbers, vec![1, 2]);
    assert_eq!(store.page_numbers().unwrap(), vec![1, 2]);
    let progress = store.load().unwrap();
    assert_eq!(progress.phase, CrawlPhase::Enriching);
    assert_eq!(progress.last_page, 2);
    assert!(progress.next_request.is_none());
}

#[tokio::test]
async fn test_resume_after_transport_error_skips_stored_pages() {
    let dirs = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    transport.respond(&list_request(1), listing(&["a", "b"]));
    transport.respond(&list_request(2), listing(&["c"]));
    transport.fail(&list_request(3), 503);
    transport.details(&["a", "b", "c", "d"]);

    let result = crawl(&dirs, &transport).run().await;
    assert!(matches!(result, Err(HarvestError::Transport { .. })));

    let progress = file_store(&dirs).load().unwrap();
    assert_eq!(progress.phase, CrawlPhase::Paginating);
    assert_eq!(progress.last_page, 2);
    assert_eq!(progress.next_request, Some(list_request(3)));
    assert_eq!(transport.detail_calls(), 0);

    transport.respond(&list_request(3), listing(&["d"]));
    transport.respond(&list_request(4), listing(&[]));
    transport.reset_calls();

    crawl(&dirs, &transport).run().await.unwrap();

    assert_eq!(transport.count(&list_request(1)), 0);
    assert_eq!(transport.count(&list_request(2)), 0);
    assert_eq!(transport.count(&list_request(3)), 1);
    assert_eq!(final_ids(&dirs), vec!["a", "b", "c", "d"]);
}

#[tokio::test]
async fn test_crash_before_progress_save_refetches_one_page() {
    let dirs = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    transport.listing_pages(&[&["a", "b"], &["b", "c"]]);
    transport.details(&["a", "b", "c"]);

    // Page 2 is written but its progress record never lands
    let crashing = CrashingStore::new(&dirs, 1);
    let store = ProgressStore::new(Box::new(crashing), PLATFORM);
    let result = crawl_with(store, &transport, CrawlSettings::default())
        .run()
        .await;
    assert!(matches!(result, Err(HarvestError::Storage(_))));
    assert_eq!(file_store(&dirs).load().unwrap().last_page, 1);

    crawl(&dirs, &transport).run().await.unwrap();

    assert_eq!(transport.count(&list_request(1)), 1);
    assert_eq!(transport.count(&list_request(2)), 2);
    assert_eq!(final_ids(&dirs), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_enrichment_skips_processed_items() {
    let dirs = TempDir::new().unwrap();
    let mut store = file_store(&dirs);
    store
        .write_page(&Page::new(1, listing(&["a", "b", "c"])))
        .unwrap();
    let mut progress = CrawlProgress::new();
    progress.record_page(1, Some(1), None).unwrap();
    progress.mark_processed("a");
    store.save(&mut progress).unwrap();

    let transport = FakeTransport::new();
    transport.details(&["a", "b", "c"]);

    let outcome = crawl_with(store, &transport, CrawlSettings::default())
        .run()
        .await
        .unwrap();

    assert!(matches!(outcome, CrawlOutcome::Finalized { items: 3, .. }));
    assert_eq!(transport.count(&detail_request("a")), 0);
    assert_eq!(transport.detail_calls(), 2);
    assert!(transport.calls().iter().all(|call| !call.contains("page=")));
}

#[tokio::test]
async fn test_failed_detail_leaves_crawl_open_until_next_run() {
    let dirs = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    transport.listing_pages(&[&["a", "b", "c"]]);
    transport.details(&["a", "c"]);
    transport.fail(&detail_request("b"), 500);

    let outcome = crawl(&dirs, &transport).run().await.unwrap();

    assert_eq!(
        outcome,
        CrawlOutcome::Incomplete {
            pages: 1,
            items: 3,
            skipped: vec!["b".to_string()]
        }
    );
    let store = file_store(&dirs);
    assert!(!store.has_final().unwrap());
    let progress = store.load().unwrap();
    assert_eq!(progress.phase, CrawlPhase::Enriching);
    assert!(progress.is_processed("a"));
    assert!(!progress.is_processed("b"));
    assert!(progress.is_processed("c"));

    transport.details(&["b"]);
    transport.reset_calls();

    let outcome = crawl(&dirs, &transport).run().await.unwrap();

    assert!(matches!(outcome, CrawlOutcome::Finalized { items: 3, .. }));
    assert_eq!(transport.calls(), vec![detail_request("b").to_string()]);

    // Details merged in the first run survive into the artifact
    let records = file_store(&dirs).read_final().unwrap().unwrap();
    for record in &records {
        assert!(record.get("scopes").is_some(), "missing scopes: {}", record);
    }
}

#[tokio::test]
async fn test_finalize_partial_writes_artifact_despite_failures() {
    let dirs = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    transport.listing_pages(&[&["a", "b"]]);
    transport.details(&["a"]);
    transport.respond(&detail_request("b"), json!({"id": "b"}));

    let settings = CrawlSettings {
        detail_batch_size: 1,
        finalize_partial: true,
    };
    let outcome = crawl_with(file_store(&dirs), &transport, settings)
        .run()
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CrawlOutcome::Finalized {
            pages: 1,
            items: 2,
            skipped: vec!["b".to_string()]
        }
    );
    let records = file_store(&dirs).read_final().unwrap().unwrap();
    assert!(records[0].get("scopes").is_some());
    assert!(records[1].get("scopes").is_none());
}

#[tokio::test]
async fn test_overlapping_fragments_are_deduplicated() {
    let dirs = TempDir::new().unwrap();
    let mut store = file_store(&dirs);
    store.write_page(&Page::new(1, listing(&["a", "b"]))).unwrap();
    store.write_page(&Page::new(2, listing(&["b", "c"]))).unwrap();
    let mut progress = CrawlProgress::new();
    progress.record_page(2, None, None).unwrap();
    for id in ["a", "b", "c"] {
        progress.mark_processed(id);
    }
    store.save(&mut progress).unwrap();

    let transport = FakeTransport::new();
    let outcome = crawl_with(store, &transport, CrawlSettings::default())
        .run()
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        CrawlOutcome::Finalized {
            pages: 2,
            items: 3,
            ..
        }
    ));
    assert!(transport.calls().is_empty());
    assert_eq!(final_ids(&dirs), vec!["a", "b", "c"]);
    let store = file_store(&dirs);
    assert!(store.page_numbers().unwrap().is_empty());
    assert!(!store.has_progress().unwrap());
}

#[tokio::test]
async fn test_completed_platform_is_not_recrawled() {
    let dirs = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    transport.listing_pages(&[&["a"]]);
    transport.details(&["a"]);

    crawl(&dirs, &transport).run().await.unwrap();
    let artifact = file_store(&dirs).read_final().unwrap();
    transport.reset_calls();

    let outcome = crawl(&dirs, &transport).run().await.unwrap();

    assert_eq!(outcome, CrawlOutcome::AlreadyCompleted);
    assert!(transport.calls().is_empty());
    assert_eq!(file_store(&dirs).read_final().unwrap(), artifact);
}

#[tokio::test]
async fn test_interrupted_cleanup_is_completed() {
    let dirs = TempDir::new().unwrap();
    let mut store = file_store(&dirs);
    let mut collection = ResultCollection::new();
    collection.extend_records(&TestAdapter, &[json!({"id": "a"})]);
    store.write_final(&collection).unwrap();
    store.write_page(&Page::new(1, listing(&["a"]))).unwrap();
    let mut progress = CrawlProgress::new();
    progress.record_page(1, None, None).unwrap();
    progress.advance(CrawlPhase::Finalized).unwrap();
    store.save(&mut progress).unwrap();

    let transport = FakeTransport::new();
    let outcome = crawl_with(store, &transport, CrawlSettings::default())
        .run()
        .await
        .unwrap();

    assert_eq!(outcome, CrawlOutcome::AlreadyCompleted);
    assert!(transport.calls().is_empty());
    assert_eq!(final_ids(&dirs), vec!["a"]);
    let store = file_store(&dirs);
    assert!(store.page_numbers().unwrap().is_empty());
    assert!(!store.has_progress().unwrap());
}

#[tokio::test]
async fn test_malformed_first_page_stores_nothing() {
    let dirs = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    transport.respond(&list_request(1), json!({"error": "maintenance"}));

    let result = crawl(&dirs, &transport).run().await;

    match result {
        Err(HarvestError::MalformedResponse {
            page, container, ..
        }) => {
            assert_eq!(page, 1);
            assert_eq!(container, "items");
        }
        other => panic!("expected MalformedResponse, got {:?}", other),
    }
    let store = file_store(&dirs);
    assert!(!store.has_progress().unwrap());
    assert!(store.page_numbers().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_page_keeps_previous_resume_point() {
    let dirs = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    transport.respond(&list_request(1), listing(&["a"]));
    transport.respond(&list_request(2), json!({"items": "oops"}));

    let result = crawl(&dirs, &transport).run().await;

    assert!(matches!(
        result,
        Err(HarvestError::MalformedResponse { page: 2, .. })
    ));
    let progress = file_store(&dirs).load().unwrap();
    assert_eq!(progress.last_page, 1);
    assert_eq!(progress.next_request, Some(list_request(2)));
}

#[tokio::test]
async fn test_records_without_identifier_are_dropped() {
    let dirs = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    transport.respond(
        &list_request(1),
        json!({"items": [{"id": "a"}, {"name": "anonymous"}, {"id": "a"}]}),
    );
    transport.respond(&list_request(2), listing(&[]));
    transport.details(&["a"]);

    let outcome = crawl(&dirs, &transport).run().await.unwrap();

    assert!(matches!(outcome, CrawlOutcome::Finalized { items: 1, .. }));
    assert_eq!(final_ids(&dirs), vec!["a"]);
}

#[tokio::test]
async fn test_empty_listing_finalizes_empty_artifact() {
    let dirs = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    transport.listing_pages(&[]);

    let outcome = crawl(&dirs, &transport).run().await.unwrap();

    assert_eq!(
        outcome,
        CrawlOutcome::Finalized {
            pages: 0,
            items: 0,
            skipped: vec![]
        }
    );
    assert!(final_ids(&dirs).is_empty());
}

#[tokio::test]
async fn test_final_artifact_has_unique_identifiers() {
    let dirs = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    transport.listing_pages(&[&["a", "b", "c"], &["c", "d"], &["a", "e"]]);
    transport.details(&["a", "b", "c", "d", "e"]);

    crawl(&dirs, &transport).run().await.unwrap();

    let ids = final_ids(&dirs);
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(ids.len(), unique.len());
    assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
    assert_eq!(transport.detail_calls(), 5);
}

#[tokio::test]
async fn test_platforms_run_independently() {
    let healthy_dirs = TempDir::new().unwrap();
    let healthy = FakeTransport::new();
    healthy.listing_pages(&[&["a"]]);
    healthy.details(&["a"]);

    let broken_dirs = TempDir::new().unwrap();
    let broken = FakeTransport::new();
    broken.fail(&list_request(1), 401);

    /// Same listing shape under a different platform name
    struct Renamed(&'static str);

    impl PlatformAdapter for Renamed {
        fn name(&self) -> &str {
            self.0
        }

        fn container(&self) -> ListingContainer {
            TestAdapter.container()
        }

        fn first_request(&self) -> PageRequest {
            TestAdapter.first_request()
        }

        fn next_request(&self, current: &PageRequest, response: &Value) -> Option<PageRequest> {
            TestAdapter.next_request(current, response)
        }

        fn item_id(&self, record: &Value) -> Option<String> {
            TestAdapter.item_id(record)
        }

        fn detail_request(&self, item: &Item) -> PageRequest {
            TestAdapter.detail_request(item)
        }

        fn detail_field(&self) -> &str {
            TestAdapter.detail_field()
        }
    }

    let broken_transport: Arc<dyn Transport> = broken.clone();
    let broken_store = ProgressStore::new(
        Box::new(FileStore::new(
            broken_dirs.path().join("progress"),
            broken_dirs.path().join("programs"),
        )),
        "broken",
    );
    let crawls = vec![
        crawl(&healthy_dirs, &healthy),
        PlatformCrawl::new(
            Box::new(Renamed("broken")),
            broken_transport,
            broken_store,
            CrawlSettings::default(),
        ),
    ];

    let result = run_platforms(crawls).await;

    match result {
        Err(HarvestError::Task(message)) => {
            assert!(message.contains("broken"));
            assert!(!message.contains("test:"));
        }
        other => panic!("expected a task failure, got {:?}", other),
    }
    assert_eq!(final_ids(&healthy_dirs), vec!["a"]);
}

#[tokio::test]
async fn test_listing_cycle_ends_pagination() {
    /// Follows the page number the response names in `next`
    struct Linked;

    impl PlatformAdapter for Linked {
        fn name(&self) -> &str {
            PLATFORM
        }

        fn container(&self) -> ListingContainer {
            TestAdapter.container()
        }

        fn first_request(&self) -> PageRequest {
            TestAdapter.first_request()
        }

        fn next_request(&self, _current: &PageRequest, response: &Value) -> Option<PageRequest> {
            Some(list_request(response.get("next")?.as_u64()?))
        }

        fn item_id(&self, record: &Value) -> Option<String> {
            TestAdapter.item_id(record)
        }

        fn detail_request(&self, item: &Item) -> PageRequest {
            TestAdapter.detail_request(item)
        }

        fn detail_field(&self) -> &str {
            TestAdapter.detail_field()
        }
    }

    let dirs = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    transport.respond(&list_request(1), json!({"items": [{"id": "a"}], "next": 2}));
    transport.respond(&list_request(2), json!({"items": [{"id": "b"}], "next": 1}));
    let mut store = file_store(&dirs);

    let numbers: Vec<u64> = {
        let pages = Paginator::resume(&Linked, &*transport, &mut store)
            .unwrap()
            .into_stream();
        pages.map_ok(|page| page.number).try_collect().await.unwrap()
    };

    assert_eq!(numbers, vec![1, 2]);
    assert_eq!(transport.count(&list_request(1)), 1);
    let progress = store.load().unwrap();
    assert_eq!(progress.phase, CrawlPhase::Enriching);
    assert_eq!(progress.last_page, 2);
}
