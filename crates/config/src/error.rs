//! Config Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Every error in here is fatal to startup: nothing has been synced yet and
//! nothing will be until the configuration is fixed.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {}", _0.display())]
    MissingFile(#[error(not(source))] PathBuf),
    /// The layered configuration could not be merged or deserialized.
    #[display("could not load configuration")]
    Load,
    /// A configuration value is out of range.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
    /// The secret does not exist.
    #[display("secret not found: {_0}")]
    SecretNotFound(#[error(not(source))] String),
    /// The secret exists but could not be retrieved (credentials, network).
    #[display("could not retrieve secret: {_0}")]
    SecretAccess(#[error(not(source))] String),
    /// The secret was retrieved but is not valid database credentials.
    #[display("malformed secret: {_0}")]
    MalformedSecret(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SecretAccess(_))
    }
}
