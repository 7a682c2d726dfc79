//! Object key validation.
//!
//! Object stores treat keys as opaque strings, so nothing stops a malformed
//! key from creating an object nobody can find again. Keys are checked before
//! every backend call instead.

use crate::error::{ErrorKind, Result};

/// Validates an object key.
///
/// Unlike filesystem paths, keys are **not** normalized: `a//b` and `a/./b`
/// name different objects in S3, so both are rejected rather than rewritten.
///
/// # Examples
///
/// ```
/// use picsync_storage::validate_key;
/// // Valid keys
/// assert!(validate_key("AO1/2024-05-01-x.jpg").is_ok());
/// assert!(validate_key("single.jpg").is_ok());
/// // Invalid keys
/// assert!(validate_key("").is_err());
/// assert!(validate_key("/AO1/x.jpg").is_err());
/// assert!(validate_key("AO1//x.jpg").is_err());
/// assert!(validate_key("AO1/../x.jpg").is_err());
/// assert!(validate_key("a\0b").is_err());
/// ```
pub fn validate(key: &str) -> Result<&str> {
    if key.is_empty() || key.contains('\0') {
        exn::bail!(ErrorKind::InvalidKey(key.to_string()));
    }
    for segment in key.split('/') {
        if matches!(segment, "" | "." | "..") {
            exn::bail!(ErrorKind::InvalidKey(key.to_string()));
        }
    }
    Ok(key)
}
