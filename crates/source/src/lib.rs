//! Read-only access to the activity-log database.
//!
//! The database is the source of truth for which attachments exist; this
//! crate never writes to it. A [`Database`] is opened with credentials from
//! the secret provider, the [`Resolver`] runs one query against it, and the
//! connection is closed again before any syncing starts.

mod db;
pub mod error;
mod models;
mod resolver;

pub use crate::db::Database;
pub use crate::models::LinkRow;
pub use crate::resolver::{Resolver, links_from_rows};
