//! Object store trait and implementations.
//!
//! This module defines the [`ObjectStore`] trait, the narrow interface the
//! sync engine needs from a destination: "is something already at this key?"
//! and "store these bytes at this key". Nothing is ever read back, listed or
//! deleted.

mod dry_run;
#[cfg(any(test, feature = "mock"))]
mod mock;
#[cfg(feature = "s3")]
mod s3;

pub use self::dry_run::DryRunBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
#[cfg(feature = "s3")]
pub use self::s3::S3Backend;
use crate::error::Result;
use async_trait::async_trait;

/// Outcome of a successful existence probe.
///
/// Together with the `Err` arm of [`Result`] this gives the three answers a
/// probe can have: the object exists, it does not, or the store could not
/// tell us. Only the last one is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Exists,
    NotFound,
}

impl Probe {
    pub fn exists(self) -> bool {
        matches!(self, Self::Exists)
    }
}

/// Destination for mirrored attachments.
///
/// # Key Handling
/// Keys are used verbatim and must pass
/// [`validate_key`](crate::validate_key). Implementations should enforce
/// this validation.
///
/// # Examples
///
/// ```
/// use picsync_storage::{ObjectStore, Probe, error::Result};
///
/// async fn store_once(store: &dyn ObjectStore, key: &str, data: Vec<u8>) -> Result<bool> {
///     match store.probe(key).await? {
///         Probe::Exists => Ok(false),
///         Probe::NotFound => {
///             store.put(key, data).await?;
///             Ok(true)
///         },
///     }
/// }
/// ```
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the configured store (used for logging only).
    fn name(&self) -> &str;

    /// Check whether an object exists at `key` without fetching it.
    ///
    /// A missing object is reported as [`Probe::NotFound`], never as an
    /// error. Any `Err` means the store could not answer.
    async fn probe(&self, key: &str) -> Result<Probe>;

    /// Store `data` at `key`, replacing anything already there.
    ///
    /// No content type is set; the store's default applies.
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()>;
}
