//! Copy jobs and their outcomes.

use crate::coord::ReadOptions;
use crate::pipeline::{CopyError, CopyReport};
use std::fmt;
use tracing::{error, info};

/// One copy to perform: every tile of `options` from `source` to
/// `destination`.
#[derive(Debug, Clone, PartialEq)]
pub struct CopyJob {
    pub name: String,
    /// Source backend URI
    pub source: String,
    /// Destination backend URI
    pub destination: String,
    pub options: ReadOptions,
}

impl CopyJob {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        destination: impl Into<String>,
        options: ReadOptions,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            destination: destination.into(),
            options,
        }
    }
}

impl fmt::Display for CopyJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} -> {}, z{}-{})",
            self.name, self.source, self.destination, self.options.minzoom, self.options.maxzoom
        )
    }
}

/// How one job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub name: String,
    pub result: Result<CopyReport, CopyError>,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes of every job in a run, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub jobs: Vec<JobOutcome>,
}

impl RunSummary {
    pub fn succeeded(&self) -> impl Iterator<Item = &JobOutcome> {
        self.jobs.iter().filter(|job| job.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &JobOutcome> {
        self.jobs.iter().filter(|job| !job.is_success())
    }

    /// True if no job failed.
    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }

    /// Tiles written across all successful jobs.
    pub fn tiles_written(&self) -> u64 {
        self.jobs
            .iter()
            .filter_map(|job| job.result.as_ref().ok())
            .map(|report| report.tiles_written)
            .sum()
    }

    /// Outcome of the job called `name`.
    pub fn job(&self, name: &str) -> Option<&JobOutcome> {
        self.jobs.iter().find(|job| job.name == name)
    }

    /// Logs one line per failed job and a closing summary.
    pub fn log(&self) {
        for job in self.failed() {
            if let Err(e) = &job.result {
                error!(job = %job.name, error = %e, "Job failed");
            }
        }

        info!(
            jobs = self.jobs.len(),
            succeeded = self.succeeded().count(),
            failed = self.failed().count(),
            tiles_written = self.tiles_written(),
            "Run complete"
        );
    }
}
