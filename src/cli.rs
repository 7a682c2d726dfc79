use clap::Parser;
use std::path::PathBuf;

/// Mirror image attachments from the activity log into S3.
///
/// Everything else is configured through the configuration file or
/// `PICSYNC_*` environment variables.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Configuration file (defaults to the platform config directory).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Probe and download, but never upload.
    #[arg(long)]
    pub dry_run: bool,
}
