//! Idempotent mirroring of attachment [`Link`](picsync_link::Link)s into an
//! [`ObjectStore`](picsync_storage::ObjectStore).
//!
//! For every link the [`SyncEngine`] asks the store whether the link's
//! destination key is already taken. If it is, the link is done. If not, the
//! attachment is downloaded through a [`Fetcher`] and uploaded. The store's
//! existence check is the only record of what has been mirrored, so running
//! the engine twice over the same links uploads nothing the second time.
//!
//! Progress is available either as a [`Stream`](futures::Stream) of
//! [`SyncEvent`]s ([`SyncEngine::events`]) or summarised into a
//! [`RunReport`] ([`SyncEngine::run`]).

mod engine;
pub mod error;
pub mod fetch;
mod report;

pub use crate::engine::{SyncEngine, SyncEvent};
pub use crate::fetch::{Fetched, Fetcher, FetcherHandle, HttpFetcher};
pub use crate::report::{Outcome, RunReport, RunStatus};
