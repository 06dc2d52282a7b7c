//! Integration tests for logging and tracing

use ads_metrics_downloader::downloader::{
    DownloadExecutor, DownloadJob, PipelineConfig, RetryPolicy,
};
use ads_metrics_downloader::fetcher::StaticMetricsFetcher;
use ads_metrics_downloader::range::DateRange;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// In-memory log sink shared with the subscriber
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_tracing_json_format_carries_structured_fields() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new("info"))
        .with_writer({
            let logs = logs.clone();
            move || logs.clone()
        })
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(date = "2024-01-01", attempts = 1, "Date fetched");
    });

    let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    let line = output.lines().next().expect("one JSON event");
    let event: serde_json::Value = serde_json::from_str(line).unwrap();

    assert_eq!(event["level"], "INFO");
    assert_eq!(event["fields"]["message"], "Date fetched");
    assert_eq!(event["fields"]["date"], "2024-01-01");
    assert_eq!(event["fields"]["attempts"], 1);
}

#[tokio::test]
async fn test_run_emits_events_under_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("ads_metrics_downloader=trace"))
        .with_test_writer()
        .try_init();

    let dir = TempDir::new().unwrap();
    let job = DownloadJob::new(
        DateRange::parse("2024-01-01", "2024-01-02").unwrap(),
        dir.path().join("aggregated_data.csv"),
    );
    let config = PipelineConfig::default()
        .with_retry(RetryPolicy::new(1, Duration::from_millis(1)))
        .with_concurrency(2);

    let summary = DownloadExecutor::new(Arc::new(StaticMetricsFetcher::default()), config)
        .execute(job)
        .await
        .unwrap();
    assert_eq!(summary.succeeded, 2);
}
