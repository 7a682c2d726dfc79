use crate::error::Error;

/// What happened to a single link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// An object already existed at the destination key. Nothing was
    /// downloaded or uploaded.
    Skipped,
    /// The attachment was downloaded and uploaded.
    Uploaded { bytes: usize },
    /// The download did not succeed. `status` is `None` when no response
    /// arrived at all (connection error, timeout).
    FetchFailed { status: Option<u16> },
}

/// How a run ended.
#[derive(Debug)]
pub enum RunStatus {
    /// Every link reached an [`Outcome`].
    Completed,
    /// The run stopped early. `processed` links reached an [`Outcome`]
    /// before it did.
    Aborted { cause: Error, processed: u64 },
}

/// Summary of a [`SyncEngine::run`](crate::SyncEngine::run).
#[derive(Debug)]
pub struct RunReport {
    pub total: u64,
    pub skipped: u64,
    pub uploaded: u64,
    pub failed: u64,
    pub status: RunStatus,
}

impl RunReport {
    pub(crate) fn new(total: u64) -> Self {
        Self {
            total,
            skipped: 0,
            uploaded: 0,
            failed: 0,
            status: RunStatus::Completed,
        }
    }

    pub(crate) fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Skipped => self.skipped += 1,
            Outcome::Uploaded { .. } => self.uploaded += 1,
            Outcome::FetchFailed { .. } => self.failed += 1,
        }
    }

    /// Links that reached an [`Outcome`].
    pub fn processed(&self) -> u64 {
        self.skipped + self.uploaded + self.failed
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.status, RunStatus::Completed)
    }
}
