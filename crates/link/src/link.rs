use crate::DestinationKey;
use crate::error::{ErrorKind, Result};
use time::Date;

/// Strip every single and double quote character from a raw attachment
/// reference.
///
/// Attachment references are pulled out of a JSON payload and arrive still
/// wrapped in their JSON string quotes (and occasionally with stray single
/// quotes from older encodings).
///
/// ```
/// use picsync_link::unquote;
/// assert_eq!(unquote(r#""https://example.com/a.jpg""#), "https://example.com/a.jpg");
/// assert_eq!(unquote("'https://example.com/b.jpg'"), "https://example.com/b.jpg");
/// ```
pub fn unquote(raw: &str) -> String {
    raw.chars().filter(|c| !matches!(c, '"' | '\'')).collect()
}

/// One discovered attachment.
///
/// Two links with the same group, date and filename are the same logical
/// attachment: they share a [`DestinationKey`] and therefore a single object
/// in the store, even if their source URLs differ elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    group_id: String,
    date: Date,
    source_url: String,
}

impl Link {
    /// Build a link, rejecting values that cannot produce a destination key.
    ///
    /// # Errors
    /// - [`ErrorKind::EmptyGroup`] if `group_id` is empty.
    /// - [`ErrorKind::InvalidGroup`] if `group_id` is not usable as a single
    ///   key segment (contains `/` or NUL, or is `.` or `..`).
    /// - [`ErrorKind::InvalidUrl`] if `source_url` is not `scheme://...`.
    /// - [`ErrorKind::MissingFilename`] if the URL path has no final segment.
    /// - [`ErrorKind::InvalidFilename`] if the final segment contains NUL.
    pub fn new(group_id: impl Into<String>, date: Date, source_url: impl Into<String>) -> Result<Self> {
        let group_id = group_id.into();
        let source_url = source_url.into();
        if group_id.is_empty() {
            exn::bail!(ErrorKind::EmptyGroup);
        }
        if group_id.contains(['/', '\0']) || matches!(group_id.as_str(), "." | "..") {
            exn::bail!(ErrorKind::InvalidGroup(group_id));
        }
        let Some(path) = url_path(&source_url) else {
            exn::bail!(ErrorKind::InvalidUrl(source_url));
        };
        let filename = last_segment(path);
        if filename.is_empty() {
            exn::bail!(ErrorKind::MissingFilename(source_url));
        }
        if filename.contains('\0') {
            exn::bail!(ErrorKind::InvalidFilename(source_url));
        }
        Ok(Self { group_id, date, source_url })
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn date(&self) -> Date {
        self.date
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Final segment of the URL path, excluding any query string or fragment.
    pub fn filename(&self) -> &str {
        // Validated in the constructor.
        url_path(&self.source_url).map(last_segment).unwrap_or_default()
    }

    /// Where this attachment lives in the object store:
    /// `{group_id}/{YYYY-MM-DD}-{filename}`.
    pub fn destination_key(&self) -> DestinationKey {
        DestinationKey::derive(&self.group_id, self.date, self.filename())
    }
}

/// The path component of an absolute URL, or `None` if `url` isn't one.
///
/// An absolute URL without a path (`https://cdn`) yields an empty path.
fn url_path(url: &str) -> Option<&str> {
    let (scheme, rest) = url.split_once("://")?;
    if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }
    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    let (authority, path) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };
    (!authority.is_empty()).then_some(path)
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or_default()
}
