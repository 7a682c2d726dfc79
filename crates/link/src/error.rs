//! Link Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A link construction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for link operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a raw attachment reference could not become a [`Link`](crate::Link).
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The owning group has an empty identifier.
    #[display("empty group identifier")]
    EmptyGroup,
    /// The group identifier cannot be used as a single key segment.
    #[display("unusable group identifier: {_0:?}")]
    InvalidGroup(#[error(not(source))] String),
    /// The source is not an absolute `scheme://authority/...` URL.
    #[display("not an absolute URL: {_0}")]
    InvalidUrl(#[error(not(source))] String),
    /// The URL path has no final segment to use as a filename.
    #[display("URL has no filename: {_0}")]
    MissingFilename(#[error(not(source))] String),
    /// The filename contains characters an object key cannot hold.
    #[display("unusable filename in URL: {_0:?}")]
    InvalidFilename(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
