//! Resolved rows flowing through the sync engine into a store.

use futures::TryStreamExt;
use picsync_link::Link;
use picsync_source::{LinkRow, links_from_rows};
use picsync_storage::backend::MockBackend;
use picsync_sync::fetch::MockFetcher;
use picsync_sync::{Outcome, SyncEngine, SyncEvent};
use std::sync::Arc;
use time::Date;
use time::macros::date;

/// Sync links one at a time, pairing each destination key with its outcome.
async fn outcomes(engine: &SyncEngine, links: Vec<Link>) -> Vec<(String, Outcome)> {
    let mut outcomes = Vec::new();
    for link in links {
        let outcome = engine.sync_link(&link).await.unwrap();
        outcomes.push((link.destination_key().into_string(), outcome));
    }
    outcomes
}

fn row(date: Date, group: &str, attachment: Option<&str>) -> LinkRow {
    LinkRow {
        date,
        group_name: Some(group.to_string()),
        region_name: Some("Seattle".to_string()),
        attachment: attachment.map(str::to_string),
    }
}

fn rows() -> Vec<LinkRow> {
    vec![
        row(date!(2024 - 05 - 01), "AO1", Some(r#""https://cdn/x.jpg""#)),
        row(date!(2024 - 05 - 01), "AO1", None),
        row(date!(2024 - 05 - 02), "AO2", Some(r#""https://cdn/y.jpg""#)),
        row(date!(2024 - 04 - 30), "AO2", Some(r#""https://cdn/gone.jpg""#)),
    ]
}

#[tokio::test]
async fn test_first_run_uploads_and_second_run_skips() {
    let store = Arc::new(MockBackend::with_objects([("AO2/2024-05-02-y.jpg", b"already here")]));
    let fetcher = Arc::new(
        MockFetcher::default()
            .with_body("https://cdn/x.jpg", b"x bytes".to_vec())
            .with_body("https://cdn/y.jpg", b"y bytes".to_vec()),
    );
    let engine = SyncEngine::new(store.clone(), fetcher.clone());

    let links = links_from_rows(rows());
    assert_eq!(links.len(), 3);
    assert_eq!(
        outcomes(&engine, links.clone()).await,
        [
            ("AO2/2024-05-02-y.jpg".to_string(), Outcome::Skipped),
            ("AO1/2024-05-01-x.jpg".to_string(), Outcome::Uploaded { bytes: 7 }),
            ("AO2/2024-04-30-gone.jpg".to_string(), Outcome::FetchFailed { status: Some(404) }),
        ]
    );
    assert_eq!(store.get("AO2/2024-05-02-y.jpg").await.unwrap(), b"already here");

    let snapshot = store.snapshot().await;
    let report = engine.run(links).await;
    assert!(report.is_completed());
    assert_eq!((report.skipped, report.uploaded, report.failed), (2, 0, 1));
    assert_eq!(store.snapshot().await, snapshot);
}

#[tokio::test]
async fn test_dry_run_leaves_store_untouched() {
    let inner = Arc::new(MockBackend::default());
    let fetcher = Arc::new(MockFetcher::default().with_body("https://cdn/x.jpg", b"x".to_vec()));
    let engine = SyncEngine::new(picsync::store_for(inner.clone(), true), fetcher.clone());

    let report = engine.run(links_from_rows(rows())).await;
    assert!(report.is_completed());
    assert_eq!(picsync::exit_code(&report), 0);
    assert_eq!(inner.put_count(), 0);
    assert!(inner.snapshot().await.is_empty());
    // Still downloaded, so broken links show up in a dry run too.
    assert_eq!(fetcher.call_count(), 3);
}

#[tokio::test]
async fn test_event_stream_order() {
    let store = Arc::new(MockBackend::default());
    let fetcher = Arc::new(MockFetcher::default().with_body("https://cdn/x.jpg", b"x".to_vec()));
    let engine = SyncEngine::new(store, fetcher);
    let events: Vec<SyncEvent> = engine.events(links_from_rows(rows())).try_collect().await.unwrap();
    assert_eq!(events.len(), 5);
    assert_eq!(events[0], SyncEvent::Started(3));
    assert!(events[1..4].iter().all(|e| matches!(e, SyncEvent::Synced { .. })));
    assert_eq!(events[4], SyncEvent::Complete);
}

#[tokio::test]
async fn test_unusable_row_does_not_abort_run() {
    let store = Arc::new(MockBackend::default());
    let fetcher = Arc::new(
        MockFetcher::default()
            .with_body("https://cdn/a.jpg", b"a".to_vec())
            .with_body("https://cdn/b.jpg", b"b".to_vec()),
    );
    let rows = vec![
        row(date!(2024 - 05 - 01), "AO/", Some(r#""https://cdn/a.jpg""#)),
        row(date!(2024 - 05 - 01), "AO1", Some(r#""https://cdn/b.jpg""#)),
    ];
    let report = SyncEngine::new(store.clone(), fetcher).run(links_from_rows(rows)).await;
    assert!(report.is_completed());
    assert_eq!((report.total, report.uploaded), (1, 1));
    assert_eq!(store.put_keys().await, ["AO1/2024-05-01-b.jpg"]);
}
