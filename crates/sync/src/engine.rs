use crate::error::{Error, ErrorKind, Result};
use crate::fetch::FetcherHandle;
use crate::report::{Outcome, RunReport, RunStatus};
use async_stream::stream;
use exn::ResultExt;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use picsync_link::{DestinationKey, Link};
use picsync_storage::StoreHandle;
use std::collections::{HashSet, VecDeque};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Progress events emitted by [`SyncEngine::events`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started): exactly once, with the number of links.
/// 2. [`Synced`](Self::Synced): zero or more times, one per link.
/// 3. [`Complete`](Self::Complete): exactly once, signalling the stream is
///    finished.
///
/// A fatal error terminates the stream with an `Err` item instead, in which
/// case [`Complete`](Self::Complete) is never emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Started(u64),
    Synced { link: Link, outcome: Outcome },
    Complete,
}

/// Index of the first pending link whose key is not currently in flight.
fn next_ready(pending: &VecDeque<Link>, in_flight: &HashSet<DestinationKey>) -> Option<usize> {
    pending.iter().position(|link| !in_flight.contains(&link.destination_key()))
}

/// Mirrors links into an object store.
///
/// Each link goes through at most one probe, one download and one upload:
///
/// | probe            | download      | result                               |
/// |------------------|---------------|--------------------------------------|
/// | exists           | -             | [`Outcome::Skipped`]                 |
/// | not found        | `200`         | upload, [`Outcome::Uploaded`]        |
/// | not found        | anything else | [`Outcome::FetchFailed`], continue   |
/// | error            | -             | run aborts ([`ErrorKind::Probe`])    |
///
/// A failed upload also aborts the run ([`ErrorKind::Upload`]). Nothing is
/// retried here; the S3 client has its own retry policy.
pub struct SyncEngine {
    store: StoreHandle,
    fetcher: FetcherHandle,
    concurrency: usize,
    cancel: CancellationToken,
}

impl SyncEngine {
    /// Sequential engine (one link at a time, in input order).
    pub fn new(store: StoreHandle, fetcher: FetcherHandle) -> Self {
        Self {
            store,
            fetcher,
            concurrency: 1,
            cancel: CancellationToken::new(),
        }
    }

    /// Process up to `concurrency` links at once (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Stop starting new links once `cancel` fires. Links already in flight
    /// are allowed to finish.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run one probe/download/upload cycle for a single link.
    #[instrument(skip_all, fields(key = %link.destination_key(), url = link.source_url()))]
    pub async fn sync_link(&self, link: &Link) -> Result<Outcome> {
        let key = link.destination_key();
        let probe = self.store.probe(key.as_str()).await.or_raise(|| ErrorKind::Probe(key.to_string()))?;
        if probe.exists() {
            tracing::info!(file = link.filename(), "Already in object store; skipping");
            return Ok(Outcome::Skipped);
        }
        tracing::info!(file = link.filename(), "Not in object store; downloading");
        let fetched = match self.fetcher.get(link.source_url()).await {
            Ok(fetched) => fetched,
            Err(err) => {
                let reason = (*err).to_string();
                tracing::warn!(file = link.filename(), reason = %reason, "Failed to download");
                return Ok(Outcome::FetchFailed { status: None });
            },
        };
        if !fetched.is_ok() {
            tracing::warn!(file = link.filename(), status = fetched.status, "Failed to download");
            return Ok(Outcome::FetchFailed { status: Some(fetched.status) });
        }
        let bytes = fetched.body.len();
        self.store.put(key.as_str(), fetched.body).await.or_raise(|| ErrorKind::Upload(key.to_string()))?;
        tracing::info!(file = link.filename(), bytes, store = self.store.name(), "Uploaded");
        Ok(Outcome::Uploaded { bytes })
    }

    async fn sync_owned(&self, link: Link) -> (Link, Result<Outcome>) {
        let result = self.sync_link(&link).await;
        (link, result)
    }

    /// Streams [`SyncEvent`]s while mirroring `links`.
    ///
    /// Links are started in input order, up to `concurrency` at once. A link
    /// whose destination key is already in flight waits until that key is
    /// released, so colliding links never race; other links may start ahead
    /// of it in the meantime. With a concurrency of 1 this is plain input
    /// order.
    ///
    /// After a fatal error (or cancellation) no new links are started. Links
    /// already in flight finish and report their events, then the first
    /// error is yielded and the stream ends.
    pub fn events<'a>(&'a self, links: Vec<Link>) -> impl Stream<Item = Result<SyncEvent>> + 'a {
        // Parentheses keep the body visible to `rustfmt`.
        stream!({
            // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
            yield Ok(SyncEvent::Started(u64::try_from(links.len()).unwrap_or(u64::MAX)));

            let mut pending: VecDeque<Link> = links.into();
            let mut in_flight: HashSet<DestinationKey> = HashSet::new();
            let mut processing = FuturesUnordered::new();
            let mut fatal: Option<Error> = None;
            loop {
                // Pop-n-push: top up the in-flight set, then wait for one to finish.
                while fatal.is_none()
                    && !self.cancel.is_cancelled()
                    && processing.len() < self.concurrency
                    && let Some(index) = next_ready(&pending, &in_flight)
                    && let Some(link) = pending.remove(index)
                {
                    in_flight.insert(link.destination_key());
                    processing.push(self.sync_owned(link));
                }
                let Some((link, result)) = processing.next().await else {
                    break;
                };
                in_flight.remove(&link.destination_key());
                match (result, &fatal) {
                    (Ok(outcome), _) => {
                        yield Ok(SyncEvent::Synced { link, outcome });
                    },
                    (Err(err), None) => {
                        tracing::error!(in_flight = processing.len(), "Sync failed; draining in-flight links");
                        fatal = Some(err);
                    },
                    (Err(err), Some(_)) => {
                        let reason = (*err).to_string();
                        tracing::error!(reason = %reason, "Additional failure while draining");
                    },
                }
            }
            if fatal.is_none() && !pending.is_empty() {
                tracing::debug!(remaining = pending.len(), "Cancelled before every link was processed");
                fatal = Some(Error::from(ErrorKind::Cancelled));
            }

            match fatal {
                Some(err) => yield Err(err),
                None => yield Ok(SyncEvent::Complete),
            }
        })
    }

    /// Mirror `links` and summarise the result.
    ///
    /// Never fails: a fatal error ends the run with
    /// [`RunStatus::Aborted`], carrying the cause and how many links were
    /// processed before it.
    pub async fn run(&self, links: Vec<Link>) -> RunReport {
        let mut report = RunReport::new(u64::try_from(links.len()).unwrap_or(u64::MAX));
        let mut events = Box::pin(self.events(links));
        while let Some(event) = events.next().await {
            match event {
                Ok(SyncEvent::Synced { outcome, .. }) => report.record(&outcome),
                Ok(SyncEvent::Started(_) | SyncEvent::Complete) => {},
                Err(cause) => {
                    let processed = report.processed();
                    report.status = RunStatus::Aborted { cause, processed };
                },
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockFetcher;
    use async_trait::async_trait;
    use futures::TryStreamExt;
    use picsync_storage::backend::MockBackend;
    use picsync_storage::{ObjectStore, Probe};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use time::macros::date;

    fn link(group: &str, url: &str) -> Link {
        Link::new(group, date!(2024 - 05 - 01), url).unwrap()
    }

    fn engine(store: &Arc<MockBackend>, fetcher: &Arc<MockFetcher>) -> SyncEngine {
        SyncEngine::new(store.clone(), fetcher.clone())
    }

    #[tokio::test]
    async fn test_skip_when_exists() {
        let store = Arc::new(MockBackend::with_objects([("AO1/2024-05-01-x.jpg", b"old")]));
        let fetcher = Arc::new(MockFetcher::default().with_body("https://cdn/x.jpg", b"new".to_vec()));
        let outcome = engine(&store, &fetcher).sync_link(&link("AO1", "https://cdn/x.jpg")).await.unwrap();
        assert_eq!(outcome, Outcome::Skipped);
        assert_eq!(fetcher.call_count(), 0);
        assert_eq!(store.put_count(), 0);
        assert_eq!(store.get("AO1/2024-05-01-x.jpg").await.unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_upload_when_absent() {
        let store = Arc::new(MockBackend::default());
        let fetcher = Arc::new(MockFetcher::default().with_body("https://cdn/x.jpg", b"jpeg bytes".to_vec()));
        let outcome = engine(&store, &fetcher).sync_link(&link("AO1", "https://cdn/x.jpg")).await.unwrap();
        assert_eq!(outcome, Outcome::Uploaded { bytes: 10 });
        assert_eq!(store.put_keys().await, vec!["AO1/2024-05-01-x.jpg".to_string()]);
        assert_eq!(store.get("AO1/2024-05-01-x.jpg").await.unwrap(), b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_fatal() {
        let store = Arc::new(MockBackend::default());
        let fetcher = Arc::new(
            MockFetcher::default()
                .with_status("https://cdn/gone.jpg", 404, Vec::new())
                .with_transport_error("https://down/y.jpg")
                .with_body("https://cdn/x.jpg", b"jpeg".to_vec()),
        );
        let links = vec![
            link("AO1", "https://cdn/gone.jpg"),
            link("AO1", "https://down/y.jpg"),
            link("AO1", "https://cdn/x.jpg"),
        ];
        let events: Vec<_> = engine(&store, &fetcher).events(links).try_collect().await.unwrap();
        let outcomes: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SyncEvent::Synced { outcome, .. } => Some(*outcome),
                _ => None,
            })
            .collect();
        assert_eq!(
            outcomes,
            [
                Outcome::FetchFailed { status: Some(404) },
                Outcome::FetchFailed { status: None },
                Outcome::Uploaded { bytes: 4 },
            ]
        );
        assert_eq!(events.first(), Some(&SyncEvent::Started(3)));
        assert_eq!(events.last(), Some(&SyncEvent::Complete));
        assert_eq!(store.put_keys().await, vec!["AO1/2024-05-01-x.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_probe_error_aborts_run() {
        let store = Arc::new(MockBackend::default().failing_probe("AO1/2024-05-01-b.jpg"));
        let fetcher = Arc::new(
            MockFetcher::default()
                .with_body("https://cdn/a.jpg", b"a".to_vec())
                .with_body("https://cdn/b.jpg", b"b".to_vec())
                .with_body("https://cdn/c.jpg", b"c".to_vec()),
        );
        let links = vec![
            link("AO1", "https://cdn/a.jpg"),
            link("AO1", "https://cdn/b.jpg"),
            link("AO1", "https://cdn/c.jpg"),
        ];
        let report = engine(&store, &fetcher).run(links).await;
        let RunStatus::Aborted { cause, processed } = &report.status else {
            panic!("expected aborted run, got {:?}", report.status);
        };
        assert_eq!(**cause, ErrorKind::Probe("AO1/2024-05-01-b.jpg".to_string()));
        assert_eq!(*processed, 1);
        assert_eq!(report.uploaded, 1);
        // The link after the failure is never touched.
        assert_eq!(store.probe_count(), 2);
        assert_eq!(fetcher.requested().await, vec!["https://cdn/a.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_upload_error_aborts_run() {
        let store = Arc::new(MockBackend::default().failing_put("AO1/2024-05-01-a.jpg"));
        let fetcher = Arc::new(
            MockFetcher::default()
                .with_body("https://cdn/a.jpg", b"a".to_vec())
                .with_body("https://cdn/b.jpg", b"b".to_vec()),
        );
        let links = vec![link("AO1", "https://cdn/a.jpg"), link("AO1", "https://cdn/b.jpg")];
        let report = engine(&store, &fetcher).run(links).await;
        let RunStatus::Aborted { cause, processed } = &report.status else {
            panic!("expected aborted run, got {:?}", report.status);
        };
        assert_eq!(**cause, ErrorKind::Upload("AO1/2024-05-01-a.jpg".to_string()));
        assert_eq!(*processed, 0);
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() {
        let store = Arc::new(MockBackend::with_objects([("AO2/2024-05-01-z.jpg", b"z")]));
        let fetcher = Arc::new(
            MockFetcher::default()
                .with_body("https://cdn/x.jpg", b"x".to_vec())
                .with_body("https://cdn/y.jpg", b"y".to_vec()),
        );
        let links = vec![
            link("AO1", "https://cdn/x.jpg"),
            link("AO1", "https://cdn/y.jpg"),
            link("AO2", "https://cdn/z.jpg"),
            link("AO1", "https://cdn/missing.jpg"),
        ];
        let engine = engine(&store, &fetcher);

        let first = engine.run(links.clone()).await;
        assert!(first.is_completed());
        assert_eq!((first.skipped, first.uploaded, first.failed), (1, 2, 1));
        let after_first = store.snapshot().await;

        let second = engine.run(links).await;
        assert!(second.is_completed());
        assert_eq!((second.skipped, second.uploaded, second.failed), (3, 0, 1));
        assert_eq!(store.snapshot().await, after_first);
        assert_eq!(store.put_count(), 2);
    }

    #[tokio::test]
    async fn test_colliding_links_upload_once() {
        let store = Arc::new(MockBackend::default());
        let fetcher = Arc::new(
            MockFetcher::default()
                .with_body("https://cdn-a/x.jpg", b"first".to_vec())
                .with_body("https://cdn-b/x.jpg", b"second".to_vec()),
        );
        let links = vec![link("AO1", "https://cdn-a/x.jpg"), link("AO1", "https://cdn-b/x.jpg")];
        let report = engine(&store, &fetcher).with_concurrency(4).run(links).await;
        assert_eq!((report.skipped, report.uploaded), (1, 1));
        assert_eq!(store.get("AO1/2024-05-01-x.jpg").await.unwrap(), b"first");
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let store = Arc::new(MockBackend::default());
        let fetcher = Arc::new(MockFetcher::default().with_body("https://cdn/x.jpg", b"x".to_vec()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = engine(&store, &fetcher)
            .with_cancellation(cancel)
            .run(vec![link("AO1", "https://cdn/x.jpg"), link("AO1", "https://cdn/y.jpg")])
            .await;
        let RunStatus::Aborted { cause, processed } = &report.status else {
            panic!("expected aborted run, got {:?}", report.status);
        };
        assert_eq!(**cause, ErrorKind::Cancelled);
        assert_eq!(*processed, 0);
        assert_eq!(store.probe_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_run() {
        let store = Arc::new(MockBackend::default());
        let fetcher = Arc::new(MockFetcher::default());
        let report = engine(&store, &fetcher).run(Vec::new()).await;
        assert!(report.is_completed());
        assert_eq!(report.total, 0);
    }

    #[tokio::test]
    async fn test_links_run_in_input_order() {
        let store = Arc::new(MockBackend::default());
        let fetcher = Arc::new(MockFetcher::default().with_body("https://cdn/y.jpg", b"y".to_vec()));
        let links = vec![
            link("AO1", "https://cdn/x.jpg"),
            link("AO1", "https://cdn/y.jpg"),
            link("AO1", "https://mirror/x.jpg"),
        ];
        let report = engine(&store, &fetcher).run(links).await;
        assert!(report.is_completed());
        assert_eq!(
            fetcher.requested().await,
            ["https://cdn/x.jpg", "https://cdn/y.jpg", "https://mirror/x.jpg"]
        );
    }

    #[tokio::test]
    async fn test_abort_stops_later_links_sharing_a_key() {
        let store = Arc::new(MockBackend::default().failing_probe("AO1/2024-05-01-y.jpg"));
        let fetcher = Arc::new(MockFetcher::default().with_body("https://mirror/x.jpg", b"x".to_vec()));
        let links = vec![
            link("AO1", "https://cdn/x.jpg"),
            link("AO1", "https://cdn/y.jpg"),
            link("AO1", "https://mirror/x.jpg"),
        ];
        let report = engine(&store, &fetcher).run(links).await;
        let RunStatus::Aborted { cause, processed } = &report.status else {
            panic!("expected aborted run, got {:?}", report.status);
        };
        assert_eq!(**cause, ErrorKind::Probe("AO1/2024-05-01-y.jpg".to_string()));
        assert_eq!(*processed, 1);
        assert_eq!(store.put_count(), 0);
        assert_eq!(fetcher.requested().await, ["https://cdn/x.jpg"]);
    }

    #[test]
    fn test_next_ready_skips_keys_in_flight() {
        let pending: VecDeque<Link> =
            vec![link("AO1", "https://mirror/x.jpg"), link("AO1", "https://cdn/y.jpg")].into();
        let mut in_flight = HashSet::new();
        assert_eq!(next_ready(&pending, &in_flight), Some(0));
        in_flight.insert(link("AO1", "https://cdn/x.jpg").destination_key());
        assert_eq!(next_ready(&pending, &in_flight), Some(1));
        in_flight.insert(link("AO1", "https://cdn/y.jpg").destination_key());
        assert_eq!(next_ready(&pending, &in_flight), None);
    }

    /// Store that holds every probe open for a moment and remembers how many
    /// probes overlapped, overall and per key.
    #[derive(Default)]
    struct SlowStore {
        inner: MockBackend,
        state: Mutex<(HashSet<String>, usize, usize, bool)>,
    }

    #[async_trait]
    impl ObjectStore for SlowStore {
        fn name(&self) -> &str {
            "slow"
        }

        async fn probe(&self, key: &str) -> picsync_storage::error::Result<Probe> {
            {
                let mut state = self.state.lock().unwrap();
                let (active, current, max, same_key) = &mut *state;
                *same_key |= !active.insert(key.to_string());
                *current += 1;
                *max = (*max).max(*current);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            let probe = self.inner.probe(key).await;
            let mut state = self.state.lock().unwrap();
            state.0.remove(key);
            state.1 -= 1;
            probe
        }

        async fn put(&self, key: &str, data: Vec<u8>) -> picsync_storage::error::Result<()> {
            self.inner.put(key, data).await
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded_and_keys_exclusive() {
        let store = Arc::new(SlowStore::default());
        let mut fetcher = MockFetcher::default();
        let mut links = Vec::new();
        for i in 0..8 {
            let url = format!("https://cdn/{i}.jpg");
            fetcher = fetcher.with_body(url.clone(), b"img".to_vec());
            links.push(link("AO1", &url));
            // Same key, different host.
            links.push(link("AO1", &format!("https://mirror/{i}.jpg")));
        }
        let report = SyncEngine::new(store.clone(), Arc::new(fetcher)).with_concurrency(3).run(links).await;
        assert!(report.is_completed());
        assert_eq!((report.uploaded, report.skipped), (8, 8));
        let state = store.state.lock().unwrap();
        let (_, current, max, same_key) = &*state;
        assert_eq!(*current, 0);
        assert!(*max > 1 && *max <= 3, "max concurrent probes: {max}");
        assert!(!same_key, "a key was probed concurrently");
    }
}
