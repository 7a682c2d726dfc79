//! Mirror image attachments from the activity log into S3.
//!
//! One run resolves every attachment link for the configured region, then
//! hands them to the [`SyncEngine`](picsync_sync::SyncEngine). Objects that
//! already exist are never downloaded or overwritten, so running again is
//! always safe.

mod app;
pub mod cli;
pub mod error;

pub use crate::app::{exit_code, log_summary, run, store_for};
