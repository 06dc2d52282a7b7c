//! Download orchestration
//!
//! This module turns a date range into an aggregated CSV report.
//!
//! # Overview
//!
//! 1. **Job Creation**: Describe the range and destination with [`job::DownloadJob`]
//! 2. **Scheduling**: [`scheduler::Scheduler`] fans one task per date out to a bounded worker set
//! 3. **Retry**: [`retry::RetryingFetcher`] retries rate-limited dates with a fixed backoff
//! 4. **Aggregation**: [`crate::report::AggregatedReport`] restores date order
//! 5. **Output**: [`crate::output::CsvReportWriter`] writes the report
//!
//! [`executor::DownloadExecutor`] runs all five steps.
//!
//! # Quick Start
//!
//! ```no_run
//! use ads_metrics_downloader::downloader::{DownloadExecutor, DownloadJob, PipelineConfig, RetryPolicy};
//! use ads_metrics_downloader::fetcher::StaticMetricsFetcher;
//! use ads_metrics_downloader::range::DateRange;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let job = DownloadJob::new(
//!     DateRange::parse("2024-01-01", "2024-01-03")?,
//!     "./aggregated_data.csv".into(),
//! );
//! let config = PipelineConfig::default()
//!     .with_retry(RetryPolicy::new(3, Duration::from_secs(5)))
//!     .with_concurrency(4);
//!
//! let executor = DownloadExecutor::new(Arc::new(StaticMetricsFetcher::default()), config);
//! let summary = executor.execute(job).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Per-date failures are absorbed into [`crate::FetchOutcome::Skipped`] and
//! never abort sibling dates. Only two errors end a run:
//! - an invalid range (before anything is dispatched)
//! - an output failure (after aggregation)

pub mod config;
pub mod executor;
pub mod job;
pub mod progress;
pub mod rate_limit;
pub mod retry;
pub mod scheduler;

pub use config::{PipelineConfig, RetryPolicy};
pub use executor::DownloadExecutor;
pub use job::{DownloadJob, JobStatus, RunSummary, SkippedDate};
pub use rate_limit::{RateLimitError, RateLimiter};
pub use retry::{RetryResult, RetryingFetcher};
pub use scheduler::{ScheduleResult, Scheduler};

use crate::output::OutputError;
use crate::range::RangeError;

/// Errors that abort a whole run
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Invalid date range; nothing was dispatched
    #[error("range error: {0}")]
    Range(#[from] RangeError),

    /// Report could not be written; aggregation had already completed
    #[error("output error: {0}")]
    Output(#[from] OutputError),
}
