//! Dry-run object store.
//!
//! Wraps another store: probes are answered truthfully by the inner store,
//! uploads are logged and dropped while still reporting success.

use crate::{ObjectStore, Probe, StoreHandle, error::Result};
use async_trait::async_trait;

/// Dry-run object store.
///
/// Wraps another store and silently drops all writes, logging an
/// [`info event`](tracing::Event) for each.
#[derive(Clone)]
pub struct DryRunBackend {
    inner: StoreHandle,
}
impl DryRunBackend {
    pub fn new(inner: StoreHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ObjectStore for DryRunBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn probe(&self, key: &str) -> Result<Probe> {
        self.inner.probe(key).await
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        crate::validate_key(key)?;
        tracing::info!(store = self.name(), key, bytes = data.len(), "Skipping upload during dry run");
        Ok(())
    }
}
