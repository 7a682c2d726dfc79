use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "picsync.toml";
/// Prefix for environment variable overrides (`PICSYNC_BUCKET`, ...).
pub const ENV_PREFIX: &str = "PICSYNC_";

/// Runtime configuration.
///
/// Every field has a default, so an empty (or absent) configuration file
/// mirrors the Seattle region into the production bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Destination bucket.
    pub bucket: String,
    /// AWS region for both S3 and Secrets Manager.
    pub aws_region: String,
    /// Named AWS profile; `None` uses the default credential chain.
    pub aws_profile: Option<String>,
    /// Secrets Manager identifier holding the database credentials.
    pub secret_name: String,
    /// Only attachments from groups in this region are mirrored.
    pub region_filter: String,
    /// Custom S3 endpoint (MinIO, LocalStack, ...).
    pub endpoint: Option<String>,
    /// Destination keys processed at once. `1` is strictly sequential.
    pub concurrency: usize,
    /// Per-request timeout for attachment downloads.
    pub request_timeout_secs: u64,
    /// Probe the bucket but never upload.
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket: "f3pugetsound-slack-pictures".to_string(),
            aws_region: "us-west-2".to_string(),
            aws_profile: Some("f3-admin".to_string()),
            secret_name: "paxminer".to_string(),
            region_filter: "Seattle".to_string(),
            endpoint: None,
            concurrency: 1,
            request_timeout_secs: 30,
            dry_run: false,
        }
    }
}

impl Config {
    /// Default configuration file location, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "picsync").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Layered configuration sources, lowest priority first.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let file = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::MissingFile(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path(),
        };
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = file {
            tracing::debug!(path = %file.display(), "Reading configuration file");
            figment = figment.merge(Toml::file(file));
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Load and validate configuration from all sources.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(path)?)
    }

    /// Extract and validate configuration from a prepared [`Figment`].
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("bucket", &self.bucket),
            ("aws_region", &self.aws_region),
            ("secret_name", &self.secret_name),
            ("region_filter", &self.region_filter),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                exn::bail!(ErrorKind::Invalid(format!("{field} must not be empty")));
            }
        }
        if self.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("concurrency must be at least 1".to_string()));
        }
        if self.request_timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid("request_timeout_secs must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
