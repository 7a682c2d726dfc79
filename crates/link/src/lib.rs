//! Attachment links discovered in the activity log.
//!
//! A [`Link`] is the unit of work shared by the resolver (which builds them
//! from query rows) and the sync engine (which mirrors them). Both sides
//! agree on where a link lives in the object store through
//! [`Link::destination_key`], so the derivation is kept here, once.

pub mod error;
mod key;
mod link;

pub use crate::key::DestinationKey;
pub use crate::link::{Link, unquote};
