//! Observability for download runs
//!
//! Per-date timings, attempt counts and final dispositions are emitted both as
//! structured `tracing` events and as `metrics` counters/histograms. Without an
//! installed recorder the metric macros are no-ops, so library users and tests
//! pay nothing unless [`init_metrics`] is called.
//!
//! Nothing in here feeds back into control flow.

use chrono::NaiveDate;
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::range::DATE_FORMAT;
use crate::FetchOutcome;

static METRICS_INITIALIZED: Lazy<RwLock<bool>> = Lazy::new(|| RwLock::new(false));

/// Install the Prometheus exporter and describe all metrics.
///
/// Idempotent: later calls return `Ok(())` without rebinding.
///
/// # Arguments
/// * `addr` - Socket address for the scrape endpoint (e.g. "0.0.0.0:9090")
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "date_fetch_attempts_total",
        Unit::Count,
        "Fetch attempts issued to the metrics source"
    );
    describe_histogram!(
        "date_fetch_duration_seconds",
        Unit::Seconds,
        "Wall time per date including retries and backoff"
    );
    describe_counter!(
        "dates_completed_total",
        Unit::Count,
        "Dates that reached a terminal outcome, by disposition"
    );
    describe_histogram!(
        "retry_backoff_duration_seconds",
        Unit::Seconds,
        "Backoff waited before a retry"
    );
    describe_counter!("runs_completed_total", Unit::Count, "Runs written to disk");
    describe_counter!("runs_failed_total", Unit::Count, "Runs aborted by a fatal error");

    *initialized = true;
    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

/// Whether [`init_metrics`] has completed
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}

/// Timing and attempt tracking for one date
pub struct DateFetchMetrics {
    date: NaiveDate,
    start_time: Instant,
    attempts: u32,
}

impl DateFetchMetrics {
    /// Start the clock for `date`
    pub fn start(date: NaiveDate) -> Self {
        Self {
            date,
            start_time: Instant::now(),
            attempts: 0,
        }
    }

    /// Count an attempt about to be issued
    pub fn record_attempt(&mut self) {
        self.attempts += 1;
        counter!("date_fetch_attempts_total").increment(1);
    }

    /// Attempts recorded so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Elapsed time since [`DateFetchMetrics::start`]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Emit the per-date line with elapsed time and final disposition
    pub fn record_outcome(&self, outcome: &FetchOutcome) {
        let elapsed = self.elapsed();
        let disposition = outcome.disposition();

        histogram!("date_fetch_duration_seconds").record(elapsed.as_secs_f64());
        counter!("dates_completed_total", "disposition" => disposition).increment(1);

        let date = self.date.format(DATE_FORMAT).to_string();
        match outcome {
            FetchOutcome::Success { .. } => info!(
                date = %date,
                attempts = self.attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                disposition,
                "Date fetched"
            ),
            FetchOutcome::Skipped { reason, .. } => warn!(
                date = %date,
                attempts = self.attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                disposition,
                reason = %reason,
                "Date skipped"
            ),
        }
    }
}

/// Record a backoff wait before retry number `retry`
pub fn record_retry_backoff(duration: Duration, retry: u32) {
    histogram!("retry_backoff_duration_seconds").record(duration.as_secs_f64());
    debug!(
        retry = retry,
        backoff_ms = duration.as_millis() as u64,
        "Retry backoff recorded"
    );
}

/// Run-level tracking
pub struct RunMetrics {
    start_time: Instant,
    requested_dates: usize,
}

impl RunMetrics {
    /// Start tracking a run over `requested_dates` days
    pub fn start(requested_dates: usize) -> Self {
        info!(requested_dates, "Download run started");
        Self {
            start_time: Instant::now(),
            requested_dates,
        }
    }

    /// Record a completed run
    pub fn record_success(&self, succeeded: usize, skipped: usize) {
        counter!("runs_completed_total").increment(1);
        info!(
            requested_dates = self.requested_dates,
            succeeded,
            skipped,
            duration_ms = self.start_time.elapsed().as_millis() as u64,
            "Download run completed"
        );
    }

    /// Record a run aborted by a fatal error
    pub fn record_failure(&self, error: &str) {
        counter!("runs_failed_total").increment(1);
        error!(
            requested_dates = self.requested_dates,
            error = %error,
            duration_ms = self.start_time.elapsed().as_millis() as u64,
            "Download run failed"
        );
    }
}
