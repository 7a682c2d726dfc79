//! S3-compatible object store.
//!
//! # Credentials
//!
//! Credentials come from a shared AWS [`SdkConfig`](aws_config::SdkConfig)
//! (profile, environment, SSO, instance metadata...) built by the caller, so
//! the same session can serve Secrets Manager and S3.

use crate::error::{ErrorKind, Result};
use crate::{ObjectStore, Probe, validate_key};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;
use exn::ResultExt;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Generous default for concurrent S3 requests.
const DEFAULT_CONCURRENT_REQUESTS: usize = 100;

/// S3-compatible object store.
///
/// Stores objects in a single bucket, optionally under a key prefix. All keys
/// are relative to the configured prefix (if any).
///
/// # Examples
///
/// ```no_run
/// use picsync_storage::backend::S3Backend;
///
/// fn pictures(sdk_config: &aws_config::SdkConfig) -> S3Backend {
///     S3Backend::from_sdk_config("pictures", sdk_config, "my-bucket", None)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct S3Backend {
    name: String,
    client: Client,
    bucket: String,
    prefix: Option<String>,
    /// Rate limiter for concurrent S3 requests.
    rate_limiter: Arc<Semaphore>,
}

impl S3Backend {
    /// Wrap an already configured S3 client.
    pub fn from_client(name: impl Into<String>, client: Client, bucket: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client,
            bucket: bucket.into(),
            prefix: None,
            rate_limiter: Arc::new(Semaphore::new(DEFAULT_CONCURRENT_REQUESTS)),
        }
    }

    /// Build an S3 client from a shared AWS configuration.
    ///
    /// # Arguments
    /// * `name` - A name for this store (used in logging)
    /// * `sdk_config` - Shared AWS configuration (region and credentials)
    /// * `bucket` - S3 bucket name
    /// * `endpoint` - Custom endpoint URL for S3-compatible services (MinIO, etc.)
    pub fn from_sdk_config(
        name: impl Into<String>,
        sdk_config: &aws_config::SdkConfig,
        bucket: impl Into<String>,
        endpoint: Option<String>,
    ) -> Self {
        let mut config_builder = aws_sdk_s3::config::Builder::from(sdk_config)
            // Configure retry policy with exponential backoff (1 initial + 3 retries)
            .retry_config(RetryConfig::standard().with_max_attempts(4));
        // Set custom endpoint for non-AWS services, which generally only
        // understand path-style addressing.
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url).force_path_style(true);
        }
        Self::from_client(name, Client::from_conf(config_builder.build()), bucket)
    }

    /// Store every object under `prefix` (acts as a virtual directory).
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        let trimmed = prefix.trim_end_matches('/');
        validate_key(trimmed)?;
        self.prefix = Some(trimmed.to_string());
        Ok(self)
    }

    /// Construct the full S3 key from a relative key.
    fn full_key(&self, key: &str) -> Result<String> {
        let key = validate_key(key)?;
        Ok(match &self.prefix {
            Some(prefix) => format!("{prefix}/{key}"),
            None => key.to_string(),
        })
    }

    /// Acquire a rate limiter permit before making an S3 API call.
    async fn acquire_permit(&self) -> OwnedSemaphorePermit {
        // unwrap is safe: semaphore is never closed
        self.rate_limiter.clone().acquire_owned().await.unwrap()
    }
}

/// `HeadObject` has no response body, so S3-compatible services that don't
/// model the `NotFound` error still give it away through the status code.
fn is_not_found(err: &SdkError<HeadObjectError, HttpResponse>) -> bool {
    err.as_service_error().is_some_and(HeadObjectError::is_not_found)
        || err.raw_response().is_some_and(|response| response.status().as_u16() == 404)
}

fn classify<E>(err: &SdkError<E, HttpResponse>, key: &str) -> ErrorKind {
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => ErrorKind::Network(key.to_string()),
        _ => match err.raw_response().map(|response| response.status().as_u16()) {
            Some(401 | 403) => ErrorKind::PermissionDenied(key.to_string()),
            _ => ErrorKind::BackendError(key.to_string()),
        },
    }
}

#[async_trait]
impl ObjectStore for S3Backend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self, key: &str) -> Result<Probe> {
        let key = self.full_key(key)?;
        let _permit = self.acquire_permit().await;
        match self.client.head_object().bucket(&self.bucket).key(&key).send().await {
            Ok(_) => Ok(Probe::Exists),
            Err(err) if is_not_found(&err) => Ok(Probe::NotFound),
            // Without s3:ListBucket, S3 answers a missing key with 403 rather
            // than 404. That surfaces here as PermissionDenied.
            Err(err) => {
                let kind = classify(&err, &key);
                Err(err).or_raise(|| kind)
            },
        }
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let key = self.full_key(key)?;
        let _permit = self.acquire_permit().await;
        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data))
            .send()
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                let kind = classify(&err, &key);
                Err(err).or_raise(|| kind)
            },
        }
    }
}
