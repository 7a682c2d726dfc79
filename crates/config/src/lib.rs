//! Configuration for picsync.
//!
//! Two kinds of settings live here:
//! - [`Config`]: where things are (bucket, AWS region/profile, secret name,
//!   which activity region to mirror) and how hard to push (concurrency,
//!   timeouts). Layered from defaults, an optional TOML file and
//!   `PICSYNC_*` environment variables.
//! - [`DbCredentials`]: how to reach the activity-log database, fetched at
//!   startup from a [`SecretProvider`] and never written to disk or logs.

mod config;
pub mod error;
mod secret;

pub use crate::config::{CONFIG_FILE_NAME, Config, ENV_PREFIX};
#[cfg(feature = "aws")]
pub use crate::secret::AwsSecretsManager;
pub use crate::secret::{DbCredentials, SecretProvider, StaticSecretProvider, load_credentials};
