use crate::error::{ErrorKind, Result};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use exn::ResultExt;
use picsync_config::{AwsSecretsManager, Config, load_credentials};
use picsync_source::{Database, Resolver};
use picsync_storage::StoreHandle;
use picsync_storage::backend::{DryRunBackend, S3Backend};
use picsync_sync::{HttpFetcher, RunReport, RunStatus, SyncEngine};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

async fn aws_config(config: &Config) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.aws_region.clone()));
    if let Some(profile) = &config.aws_profile {
        loader = loader.profile_name(profile);
    }
    loader.load().await
}

/// Wrap `store` so uploads are skipped when `dry_run` is set.
pub fn store_for(store: StoreHandle, dry_run: bool) -> StoreHandle {
    match dry_run {
        true => Arc::new(DryRunBackend::new(store)),
        false => store,
    }
}

/// One complete run: fetch credentials, resolve links, mirror them.
///
/// Only setup failures are errors. However the sync itself ends, it is
/// described by the returned [`RunReport`].
#[instrument(skip_all, fields(bucket = %config.bucket, region = %config.region_filter, dry_run = config.dry_run))]
pub async fn run(config: &Config, cancel: CancellationToken) -> Result<RunReport> {
    let sdk_config = aws_config(config).await;

    let secrets = AwsSecretsManager::new(&sdk_config);
    let credentials = load_credentials(&secrets, &config.secret_name).await.or_raise(|| ErrorKind::Credentials)?;
    let db = Database::connect(&credentials).await.or_raise(|| ErrorKind::Resolve)?;
    let links = Resolver::new(&config.region_filter).resolve(&db).await;
    db.close().await;
    let links = links.or_raise(|| ErrorKind::Resolve)?;

    let s3 = S3Backend::from_sdk_config("s3", &sdk_config, &config.bucket, config.endpoint.clone());
    let store = store_for(Arc::new(s3), config.dry_run);
    let fetcher = HttpFetcher::new(config.request_timeout()).or_raise(|| ErrorKind::Fetcher)?;

    let engine = SyncEngine::new(store, Arc::new(fetcher))
        .with_concurrency(config.concurrency)
        .with_cancellation(cancel);
    Ok(engine.run(links).await)
}

/// Log the outcome of a run.
pub fn log_summary(report: &RunReport) {
    match &report.status {
        RunStatus::Completed => tracing::info!(
            total = report.total,
            skipped = report.skipped,
            uploaded = report.uploaded,
            failed = report.failed,
            "Sync complete"
        ),
        RunStatus::Aborted { cause, processed } => tracing::error!(
            total = report.total,
            processed,
            skipped = report.skipped,
            uploaded = report.uploaded,
            failed = report.failed,
            cause = ?cause,
            "Sync aborted"
        ),
    }
}

/// Process exit status for a finished run.
///
/// Downloads that failed do not count against the run; only an aborted run
/// does.
pub fn exit_code(report: &RunReport) -> u8 {
    match report.status {
        RunStatus::Completed => 0,
        RunStatus::Aborted { .. } => 1,
    }
}
