//! Download command implementation

use clap::Parser;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::CliError;
use crate::downloader::config::{
    default_concurrency, DEFAULT_BACKOFF, DEFAULT_MAX_RETRIES, MAX_CONCURRENCY,
};
use crate::downloader::{
    DownloadError, DownloadExecutor, DownloadJob, PipelineConfig, RateLimiter, RetryPolicy,
    RunSummary,
};
use crate::fetcher::{HttpMetricsFetcher, MetricsFetcher, StaticMetricsFetcher};
use crate::output::DEFAULT_OUTPUT_FILE;
use crate::range::DateRange;
use crate::shutdown::SharedShutdown;

/// Parse and validate concurrency value
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON summary on stdout
    Json,
    /// Human-readable summary
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

/// Ads Metrics Downloader CLI
#[derive(Parser, Debug)]
#[command(name = "ads-metrics-downloader")]
#[command(about = "Download per-day ads metrics for a date range into one CSV file", long_about = None)]
#[command(version)]
pub struct Cli {
    /// First day to fetch (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: String,

    /// Last day to fetch, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: String,

    /// Directory for the CSV file (default: current directory)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// CSV file name inside the output directory
    #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
    pub output_file: String,

    /// Retries after the first attempt for rate-limited dates (0-20)
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES, value_parser = clap::value_parser!(u32).range(0..=20))]
    pub max_retries: u32,

    /// Seconds to wait before retrying a rate-limited date
    #[arg(long, default_value_t = DEFAULT_BACKOFF.as_secs())]
    pub backoff_secs: u64,

    /// Dates fetched concurrently (default: available CPU parallelism, max: 64)
    #[arg(long, value_parser = parse_concurrency)]
    pub concurrency: Option<usize>,

    /// Base URL of an HTTP metrics source; without it a fixed demo source is used
    ///
    /// Requests are issued as GET {source-url}/metrics?date=YYYY-MM-DD.
    #[arg(long)]
    pub source_url: Option<String>,

    /// Per-request timeout for the HTTP source
    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Client-side request quota for the HTTP source
    #[arg(long, default_value_t = 60)]
    pub requests_per_minute: usize,

    /// Output format (json or human)
    #[arg(long, default_value = "human")]
    pub output_format: OutputFormat,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Scheduler and retry settings from the flags
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_retry(RetryPolicy::new(
                self.max_retries,
                Duration::from_secs(self.backoff_secs),
            ))
            .with_concurrency(self.concurrency.unwrap_or_else(|| {
                default_concurrency().min(MAX_CONCURRENCY)
            }))
    }

    /// Full CSV destination
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(&self.output_file)
    }

    /// Source selected by the flags
    pub fn build_fetcher(&self) -> Result<Arc<dyn MetricsFetcher>, CliError> {
        match &self.source_url {
            Some(url) => {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(CliError::InvalidArgument(format!(
                        "source URL must start with http:// or https://, got '{url}'"
                    )));
                }
                if self.requests_per_minute == 0 {
                    return Err(CliError::ConfigurationError(
                        "requests-per-minute must be at least 1".to_string(),
                    ));
                }
                let limiter = Arc::new(RateLimiter::per_minute(self.requests_per_minute));
                let fetcher = HttpMetricsFetcher::new(
                    url.clone(),
                    Duration::from_secs(self.request_timeout_secs),
                    limiter,
                )?;
                Ok(Arc::new(fetcher))
            }
            None => Ok(Arc::new(StaticMetricsFetcher::default())),
        }
    }

    /// Run the download and print a summary
    pub async fn execute(&self, shutdown: SharedShutdown) -> Result<RunSummary, CliError> {
        // Parse before building anything so bad input fails before any fetch.
        let range = DateRange::parse(&self.start_date, &self.end_date)?;
        let output_path = self.output_path();
        let fetcher = self.build_fetcher()?;
        let config = self.pipeline_config();

        if let Some(addr) = self.metrics_addr {
            crate::metrics::init_metrics(addr)
                .await
                .map_err(|e| CliError::ConfigurationError(format!("metrics exporter: {e}")))?;
        }

        info!(
            "Fetching {} dates from {} ({} to {}) with concurrency {}",
            range.len(),
            fetcher.source_name(),
            range.start(),
            range.end(),
            config.concurrency
        );

        let progress = create_progress_bar(range.len(), self.output_format);
        let executor = DownloadExecutor::new(fetcher, config)
            .with_shutdown(shutdown)
            .with_progress_bar(progress.clone());

        let result = executor
            .execute(DownloadJob::new(range, output_path.clone()))
            .await;
        progress.finish_and_clear();

        match self.output_format {
            OutputFormat::Json => output_json(&output_path, &result),
            OutputFormat::Human => output_human(&output_path, &result),
        }

        result.map_err(CliError::DownloadError)
    }
}

/// Output result as a single JSON line
fn output_json(output_path: &std::path::Path, result: &Result<RunSummary, DownloadError>) {
    let output = match result {
        Ok(summary) => serde_json::json!({
            "success": true,
            "summary": summary,
        }),
        Err(e) => serde_json::json!({
            "success": false,
            "output_path": output_path.display().to_string(),
            "error": e.to_string(),
        }),
    };
    println!("{output}");
}

/// Output result in human-readable format
fn output_human(output_path: &std::path::Path, result: &Result<RunSummary, DownloadError>) {
    match result {
        Ok(summary) => {
            println!("\nDownload completed ({:?})", summary.status);
            println!("Range: {} to {}", summary.start_date, summary.end_date);
            println!("Output: {}", summary.output_path.display());
            println!(
                "Dates written: {}/{}",
                summary.succeeded, summary.requested_dates
            );
            println!("Source calls: {}", summary.total_attempts);
            if !summary.skipped.is_empty() {
                println!("Skipped dates: {}", summary.skipped.len());
                for skipped in &summary.skipped {
                    println!("  {} ({})", skipped.date, skipped.reason);
                }
            }
        }
        Err(e) => {
            eprintln!("\nDownload failed!");
            eprintln!("Output: {}", output_path.display());
            eprintln!("Error: {e}");
            error!("Download failed: {}", e);
        }
    }
}

/// Progress bar over dates; hidden for JSON output
fn create_progress_bar(total: usize, format: OutputFormat) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    if format == OutputFormat::Json {
        pb.set_draw_target(ProgressDrawTarget::hidden());
        return pb;
    }

    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} dates ({percent}%) {msg}")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message("Downloading metrics");
    pb
}
