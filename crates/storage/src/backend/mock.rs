//! In-memory object store for testing.

use crate::error::{ErrorKind, Result};
use crate::{ObjectStore, Probe, validate_key};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory object store for testing.
///
/// Objects are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// can operate on `&self` without external synchronisation. Every probe and
/// upload is counted, and individual keys can be rigged to fail so tests can
/// exercise the error paths of whatever drives the store.
pub struct MockBackend {
    name: String,
    objects: RwLock<HashMap<String, Vec<u8>>>,
    put_log: RwLock<Vec<String>>,
    failing_probes: HashSet<String>,
    failing_puts: HashSet<String>,
    probes: AtomicUsize,
    puts: AtomicUsize,
}

impl MockBackend {
    /// Create a mock store pre-populated with objects.
    ///
    /// Panics if any key fails validation. If test setup is wrong, then test
    /// should not pass.
    pub fn with_objects(objects: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        for (key, data) in objects {
            let key = key.into();
            if validate_key(&key).is_err() {
                // The panic here is DELIBERATE. MockBackend is intended to be
                // used in tests; panics are expected. There is no error result.
                panic!("MockBackend::with_objects: invalid key {key}");
            }
            map.insert(key, data.into());
        }
        Self {
            name: "mock".to_string(),
            objects: RwLock::new(map),
            put_log: RwLock::new(Vec::new()),
            failing_probes: HashSet::new(),
            failing_puts: HashSet::new(),
            probes: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
        }
    }

    /// Change the name of the mock store.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Make every probe of `key` fail with [`ErrorKind::BackendError`].
    pub fn failing_probe(mut self, key: impl Into<String>) -> Self {
        self.failing_probes.insert(key.into());
        self
    }

    /// Make every upload to `key` fail with [`ErrorKind::BackendError`].
    pub fn failing_put(mut self, key: impl Into<String>) -> Self {
        self.failing_puts.insert(key.into());
        self
    }

    /// Number of probes received, including failed ones.
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Number of successful uploads.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Keys of successful uploads, in the order they happened.
    pub async fn put_keys(&self) -> Vec<String> {
        self.put_log.read().await.clone()
    }

    /// Contents of the object at `key`, if any.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).cloned()
    }

    /// Snapshot of every stored object, sorted by key.
    pub async fn snapshot(&self) -> Vec<(String, Vec<u8>)> {
        let mut objects: Vec<_> = self.objects.read().await.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        objects.sort();
        objects
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let objects: [(&str, &[u8]); 0] = [];
        Self::with_objects(objects)
    }
}

#[async_trait]
impl ObjectStore for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self, key: &str) -> Result<Probe> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let key = validate_key(key)?;
        if self.failing_probes.contains(key) {
            exn::bail!(ErrorKind::BackendError(format!("injected probe failure: {key}")));
        }
        Ok(match self.objects.read().await.contains_key(key) {
            true => Probe::Exists,
            false => Probe::NotFound,
        })
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let key = validate_key(key)?;
        if self.failing_puts.contains(key) {
            exn::bail!(ErrorKind::BackendError(format!("injected put failure: {key}")));
        }
        self.objects.write().await.insert(key.to_string(), data);
        self.put_log.write().await.push(key.to_string());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
