use clap::Parser;
use picsync::cli::Args;
use picsync_config::Config;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = ?err, "Invalid configuration");
            return ExitCode::FAILURE;
        },
    };
    config.dry_run |= args.dry_run;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted; finishing in-flight links");
                cancel.cancel();
            }
        }
    });

    match picsync::run(&config, cancel).await {
        Ok(report) => {
            picsync::log_summary(&report);
            ExitCode::from(picsync::exit_code(&report))
        },
        Err(err) => {
            tracing::error!(error = ?err, "Sync could not start");
            ExitCode::FAILURE
        },
    }
}
