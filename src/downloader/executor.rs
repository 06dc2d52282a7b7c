//! Download executor: range -> scheduler -> aggregator -> CSV

use indicatif::ProgressBar;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

use crate::downloader::config::PipelineConfig;
use crate::downloader::job::{DownloadJob, JobStatus, RunSummary};
use crate::downloader::retry::RetryingFetcher;
use crate::downloader::scheduler::Scheduler;
use crate::downloader::DownloadError;
use crate::fetcher::MetricsFetcher;
use crate::metrics::RunMetrics;
use crate::output::{CsvReportWriter, ReportWriter};
use crate::report::AggregatedReport;
use crate::shutdown::SharedShutdown;
use crate::SkipReason;

/// Runs a [`DownloadJob`] end to end
pub struct DownloadExecutor {
    fetcher: Arc<dyn MetricsFetcher>,
    config: PipelineConfig,
    shutdown: Option<SharedShutdown>,
    progress_bar: Option<ProgressBar>,
}

impl DownloadExecutor {
    /// Create an executor over `fetcher`
    pub fn new(fetcher: Arc<dyn MetricsFetcher>, config: PipelineConfig) -> Self {
        Self {
            fetcher,
            config,
            shutdown: None,
            progress_bar: None,
        }
    }

    /// Attach a shared shutdown handle for graceful cancellation.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Advance `bar` as dates complete.
    pub fn with_progress_bar(mut self, bar: ProgressBar) -> Self {
        self.progress_bar = Some(bar);
        self
    }

    /// Configuration in effect
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fetch every date of the job, aggregate, and write the CSV.
    ///
    /// Per-date failures never abort the run. The output file is opened only
    /// after every date has a terminal outcome, so an [`DownloadError::Output`]
    /// always comes after the in-memory report is complete.
    pub async fn execute(&self, job: DownloadJob) -> Result<RunSummary, DownloadError> {
        let span = tracing::info_span!(
            "download_run",
            start = %job.range.start(),
            end = %job.range.end(),
            source = %self.fetcher.source_name(),
        );
        self.run(job).instrument(span).await
    }

    async fn run(&self, mut job: DownloadJob) -> Result<RunSummary, DownloadError> {
        let run_metrics = RunMetrics::start(job.range.len());
        job.status = JobStatus::Running;
        info!(
            concurrency = self.config.concurrency,
            max_retries = self.config.retry.max_retries,
            backoff_ms = self.config.retry.backoff.as_millis() as u64,
            output = %job.output_path.display(),
            "Starting download run"
        );

        let schedule = self
            .scheduler()
            .run_detailed(job.range.tasks().collect(), self.config.concurrency)
            .await;

        let skipped = RunSummary::skipped_from(&schedule.outcomes);
        let report = AggregatedReport::aggregate(schedule.outcomes);

        if let Err(e) = write_report(&job, &report) {
            job.status = JobStatus::Failed;
            run_metrics.record_failure(&e.to_string());
            return Err(e);
        }

        let cancelled = skipped
            .iter()
            .filter(|s| s.reason == SkipReason::Cancelled)
            .count();
        job.status = if cancelled > 0 {
            warn!(cancelled, "Shutdown requested - report written with fetched dates only");
            JobStatus::Cancelled
        } else {
            JobStatus::Completed
        };
        run_metrics.record_success(report.len(), skipped.len());

        Ok(RunSummary {
            start_date: job.range.start(),
            end_date: job.range.end(),
            requested_dates: job.range.len(),
            succeeded: report.len(),
            skipped,
            total_attempts: schedule.total_attempts,
            status: job.status,
            output_path: job.output_path,
        })
    }

    fn scheduler(&self) -> Scheduler {
        let mut retrying = RetryingFetcher::new(self.fetcher.clone(), self.config.retry);
        if let Some(shutdown) = &self.shutdown {
            retrying = retrying.with_shutdown(shutdown.clone());
        }

        let mut scheduler = Scheduler::new(retrying);
        if let Some(shutdown) = &self.shutdown {
            scheduler = scheduler.with_shutdown(shutdown.clone());
        }
        if let Some(bar) = &self.progress_bar {
            scheduler = scheduler.with_progress_bar(bar.clone());
        }
        scheduler
    }
}

fn write_report(job: &DownloadJob, report: &AggregatedReport) -> Result<(), DownloadError> {
    let mut writer = CsvReportWriter::new(&job.output_path)?;
    writer.write_report(report)?;
    writer.close()?;
    info!(
        rows = report.len(),
        path = %job.output_path.display(),
        "Aggregated data saved"
    );
    Ok(())
}
