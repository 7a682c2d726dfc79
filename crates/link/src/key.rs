use derive_more::Display;
use time::Date;

/// Path-like identifier of an attachment in the object store.
///
/// The key is the only identity the sync engine knows about: an object at
/// this key means the attachment has been mirrored, regardless of content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub struct DestinationKey(String);

impl DestinationKey {
    pub(crate) fn derive(group_id: &str, date: Date, filename: &str) -> Self {
        // Zero-padded by hand to avoid a fallible `format_description` call.
        Self(format!(
            "{group_id}/{:04}-{:02}-{:02}-{filename}",
            date.year(),
            u8::from(date.month()),
            date.day()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}
impl AsRef<str> for DestinationKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
