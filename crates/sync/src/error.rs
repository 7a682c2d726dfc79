//! Sync Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Only failures that abort a run are errors. A download that comes back with
//! a bad status is an [`Outcome`](crate::Outcome), not an error.

use derive_more::{Display, Error};

/// A sync error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a sync failure.
///
/// ### Fatal to a run
/// - [`ErrorKind::Probe`]
/// - [`ErrorKind::Upload`]
/// - [`ErrorKind::Cancelled`]
///
/// ### Fatal to a single download
/// - [`ErrorKind::Fetch`] (reported as [`Outcome::FetchFailed`](crate::Outcome::FetchFailed))
/// - [`ErrorKind::HttpClient`] (only raised while building the client)
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The object store could not say whether the key exists.
    #[display("could not probe object store for {_0}")]
    Probe(#[error(not(source))] String),
    /// The object store rejected an upload.
    #[display("could not upload {_0}")]
    Upload(#[error(not(source))] String),
    /// The download request failed before a status code was received, or
    /// the body could not be read.
    #[display("could not download {_0}")]
    Fetch(#[error(not(source))] String),
    /// The HTTP client could not be constructed.
    #[display("could not build HTTP client")]
    HttpClient,
    /// The run was cancelled before every link was processed.
    #[display("sync cancelled")]
    Cancelled,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Probe(_) | Self::Upload(_) | Self::Fetch(_))
    }
}
