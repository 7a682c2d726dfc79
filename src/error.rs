//! Application Error Types
//!
//! Startup failures only. Once syncing begins, problems are reported through
//! [`RunReport`](picsync_sync::RunReport) instead.

use derive_more::{Display, Error};

/// An application error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("could not load database credentials")]
    Credentials,
    #[display("could not resolve attachment links")]
    Resolve,
    #[display("could not set up downloader")]
    Fetcher,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Credentials | Self::Resolve)
    }
}
