//! Downloading attachments.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use std::sync::Arc;
use std::time::Duration;

pub type FetcherHandle = Arc<dyn Fetcher + Send + Sync>;

/// A completed HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub status: u16,
    /// Empty unless `status` is `200`.
    pub body: Vec<u8>,
}

impl Fetched {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Something that can GET a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Request `url`.
    ///
    /// Any response, whatever its status, is `Ok`. `Err` means no usable
    /// response arrived at all ([`ErrorKind::Fetch`]).
    async fn get(&self, url: &str) -> Result<Fetched>;
}

/// [`Fetcher`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .or_raise(|| ErrorKind::HttpClient)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<Fetched> {
        let response = self.client.get(url).send().await.or_raise(|| ErrorKind::Fetch(url.to_string()))?;
        let status = response.status().as_u16();
        if status != 200 {
            return Ok(Fetched { status, body: Vec::new() });
        }
        let body = response.bytes().await.or_raise(|| ErrorKind::Fetch(url.to_string()))?;
        Ok(Fetched { status, body: body.to_vec() })
    }
}

#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockFetcher;

#[cfg(any(test, feature = "mock"))]
mod mock {
    use super::{Fetched, Fetcher};
    use crate::error::{ErrorKind, Result};
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::RwLock;

    /// Canned responses for testing.
    ///
    /// URLs without a canned response answer `404`.
    #[derive(Default)]
    pub struct MockFetcher {
        responses: HashMap<String, Fetched>,
        broken: HashSet<String>,
        calls: AtomicUsize,
        log: RwLock<Vec<String>>,
    }

    impl MockFetcher {
        /// Answer `url` with `200` and `body`.
        pub fn with_body(self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
            self.with_status(url, 200, body)
        }

        /// Answer `url` with an arbitrary status.
        pub fn with_status(mut self, url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> Self {
            let body = match status {
                200 => body.into(),
                _ => Vec::new(),
            };
            self.responses.insert(url.into(), Fetched { status, body });
            self
        }

        /// Fail requests to `url` without any response.
        pub fn with_transport_error(mut self, url: impl Into<String>) -> Self {
            self.broken.insert(url.into());
            self
        }

        /// Number of requests made, including failed ones.
        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Requested URLs, in order.
        pub async fn requested(&self) -> Vec<String> {
            self.log.read().await.clone()
        }
    }

    #[async_trait]
    impl Fetcher for MockFetcher {
        async fn get(&self, url: &str) -> Result<Fetched> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.log.write().await.push(url.to_string());
            if self.broken.contains(url) {
                exn::bail!(ErrorKind::Fetch(url.to_string()));
            }
            Ok(self.responses.get(url).cloned().unwrap_or(Fetched { status: 404, body: Vec::new() }))
        }
    }
}
