//! Download job specification and run summary

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::range::DateRange;
use crate::{FetchOutcome, SkipReason};

/// Lifecycle of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Not started
    #[default]
    Pending,
    /// Dates are being fetched
    Running,
    /// Report written
    Completed,
    /// Report written after shutdown cut the run short
    Cancelled,
    /// Aborted by a fatal error
    Failed,
}

/// What to download and where to write it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadJob {
    /// Inclusive date range
    pub range: DateRange,
    /// CSV destination
    pub output_path: PathBuf,
    /// Current status
    #[serde(default)]
    pub status: JobStatus,
}

impl DownloadJob {
    /// Create a pending job
    pub fn new(range: DateRange, output_path: PathBuf) -> Self {
        Self {
            range,
            output_path,
            status: JobStatus::Pending,
        }
    }
}

/// A date that ended without metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDate {
    /// The day
    pub date: NaiveDate,
    /// Why it was dropped
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Result of a completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// First requested day
    pub start_date: NaiveDate,
    /// Last requested day
    pub end_date: NaiveDate,
    /// Days dispatched
    pub requested_dates: usize,
    /// Days written to the output
    pub succeeded: usize,
    /// Days dropped, in date order
    pub skipped: Vec<SkippedDate>,
    /// Source calls across all days
    pub total_attempts: u64,
    /// Final status
    pub status: JobStatus,
    /// CSV destination
    pub output_path: PathBuf,
}

impl RunSummary {
    /// Collect the skipped days from a run's outcomes
    pub fn skipped_from(outcomes: &[FetchOutcome]) -> Vec<SkippedDate> {
        let mut skipped: Vec<SkippedDate> = outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                FetchOutcome::Skipped { date, reason } => Some(SkippedDate {
                    date: *date,
                    reason: reason.clone(),
                }),
                FetchOutcome::Success { .. } => None,
            })
            .collect();
        skipped.sort_by_key(|s| s.date);
        skipped
    }

    /// Skipped days with the given reason label
    pub fn skipped_count(&self, label: &str) -> usize {
        self.skipped
            .iter()
            .filter(|s| s.reason.label() == label)
            .count()
    }
}
