//! End-to-end runs of the executor against scripted sources

use ads_metrics_downloader::downloader::{
    DownloadExecutor, DownloadJob, JobStatus, PipelineConfig, RetryPolicy,
};
use ads_metrics_downloader::range::DateRange;
use ads_metrics_downloader::SkipReason;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::support::{date, rate_limited, timed_out, ScriptedFetcher};

const HEADER: &str = "date,clicks,impressions,cost\n";

fn config(max_retries: u32, concurrency: usize) -> PipelineConfig {
    PipelineConfig::default()
        .with_retry(RetryPolicy::new(max_retries, Duration::from_millis(5)))
        .with_concurrency(concurrency)
}

async fn run(
    fetcher: Arc<ScriptedFetcher>,
    config: PipelineConfig,
    start: &str,
    end: &str,
) -> (ads_metrics_downloader::downloader::RunSummary, String, TempDir) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("aggregated_data.csv");
    let job = DownloadJob::new(DateRange::parse(start, end).unwrap(), path.clone());

    let summary = DownloadExecutor::new(fetcher, config)
        .execute(job)
        .await
        .unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    (summary, contents, dir)
}

#[tokio::test]
async fn test_all_dates_succeed() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let (summary, contents, _dir) =
        run(fetcher.clone(), config(3, 4), "2024-01-01", "2024-01-03").await;

    assert_eq!(
        contents,
        format!(
            "{HEADER}2024-01-01,100,1000,50.0\n2024-01-02,100,1000,50.0\n2024-01-03,100,1000,50.0\n"
        )
    );
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.total_attempts, 3);
    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(fetcher.total_calls(), 3);
}

#[tokio::test]
async fn test_transient_rate_limit_recovers() {
    let fetcher = Arc::new(
        ScriptedFetcher::new().script(date("2024-01-02"), vec![rate_limited(), rate_limited()]),
    );
    let (summary, contents, _dir) =
        run(fetcher.clone(), config(3, 2), "2024-01-01", "2024-01-03").await;

    assert_eq!(contents.lines().count(), 4);
    assert!(contents.contains("2024-01-02,100,1000,50.0"));
    assert_eq!(fetcher.calls(date("2024-01-02")), 3);
    assert_eq!(summary.total_attempts, 5);
    assert!(summary.skipped.is_empty());
}

#[tokio::test]
async fn test_persistent_rate_limit_skips_after_retries() {
    let fetcher =
        Arc::new(ScriptedFetcher::new().always(date("2024-01-02"), rate_limited()));
    let (summary, contents, _dir) =
        run(fetcher.clone(), config(3, 3), "2024-01-01", "2024-01-03").await;

    assert_eq!(fetcher.calls(date("2024-01-02")), 4);
    assert_eq!(
        contents,
        format!("{HEADER}2024-01-01,100,1000,50.0\n2024-01-03,100,1000,50.0\n")
    );
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].date, date("2024-01-02"));
    assert_eq!(summary.skipped[0].reason, SkipReason::RateLimited);
    assert_eq!(summary.status, JobStatus::Completed);
}

#[tokio::test]
async fn test_timeout_is_not_retried() {
    let fetcher = Arc::new(ScriptedFetcher::new().always(date("2024-01-01"), timed_out()));
    let (summary, contents, _dir) =
        run(fetcher.clone(), config(3, 2), "2024-01-01", "2024-01-02").await;

    assert_eq!(fetcher.calls(date("2024-01-01")), 1);
    assert_eq!(contents, format!("{HEADER}2024-01-02,100,1000,50.0\n"));
    assert_eq!(summary.skipped_count("timeout"), 1);
}

#[tokio::test]
async fn test_one_timeout_among_five_dates() {
    let fetcher = Arc::new(ScriptedFetcher::new().always(date("2024-05-03"), timed_out()));
    let (summary, contents, _dir) =
        run(fetcher.clone(), config(3, 5), "2024-05-01", "2024-05-05").await;

    assert_eq!(fetcher.calls(date("2024-05-03")), 1);
    assert_eq!(fetcher.total_calls(), 5);
    assert_eq!(
        contents,
        format!(
            "{HEADER}2024-05-01,100,1000,50.0\n2024-05-02,100,1000,50.0\n\
             2024-05-04,100,1000,50.0\n2024-05-05,100,1000,50.0\n"
        )
    );
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].date, date("2024-05-03"));
    assert_eq!(summary.skipped[0].reason, SkipReason::Timeout);
}

#[tokio::test]
async fn test_zero_retries_means_single_attempt() {
    let fetcher =
        Arc::new(ScriptedFetcher::new().always(date("2024-01-01"), rate_limited()));
    let (summary, _contents, _dir) =
        run(fetcher.clone(), config(0, 1), "2024-01-01", "2024-01-01").await;

    assert_eq!(fetcher.calls(date("2024-01-01")), 1);
    assert_eq!(summary.skipped_count("rate_limited"), 1);
}

#[tokio::test]
async fn test_every_date_skipped_writes_default_header() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .always(date("2024-01-01"), timed_out())
            .always(date("2024-01-02"), timed_out()),
    );
    let (summary, contents, _dir) =
        run(fetcher, config(3, 2), "2024-01-01", "2024-01-02").await;

    assert_eq!(contents, HEADER);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.skipped.len(), 2);
}

#[tokio::test]
async fn test_single_day_range() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let (summary, contents, _dir) =
        run(fetcher, config(3, 8), "2024-02-29", "2024-02-29").await;

    assert_eq!(summary.requested_dates, 1);
    assert_eq!(contents, format!("{HEADER}2024-02-29,100,1000,50.0\n"));
}

#[tokio::test]
async fn test_output_is_byte_identical_across_runs() {
    // Earlier dates finish last so completion order is the reverse of date order.
    let build = || {
        Arc::new(
            ScriptedFetcher::new()
                .delay(date("2024-03-01"), Duration::from_millis(40))
                .delay(date("2024-03-02"), Duration::from_millis(20))
                .script(date("2024-03-03"), vec![rate_limited()])
                .always(date("2024-03-04"), timed_out()),
        )
    };

    let first_source = build();
    let second_source = build();
    let (_, first, _dir1) =
        run(first_source.clone(), config(3, 4), "2024-03-01", "2024-03-05").await;
    let (_, second, _dir2) =
        run(second_source.clone(), config(3, 2), "2024-03-01", "2024-03-05").await;

    assert_eq!(first, second);
    for source in [&first_source, &second_source] {
        assert_eq!(source.calls(date("2024-03-03")), 2);
        assert_eq!(source.calls(date("2024-03-04")), 1);
    }
    let dates: Vec<&str> = first
        .lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap())
        .collect();
    assert_eq!(dates, vec!["2024-03-01", "2024-03-02", "2024-03-03", "2024-03-05"]);
}

#[tokio::test]
async fn test_attempts_never_exceed_budget() {
    let mut fetcher = ScriptedFetcher::new();
    let range = DateRange::parse("2024-04-01", "2024-04-10").unwrap();
    for day in range.iter() {
        fetcher = fetcher.always(day, rate_limited());
    }
    let fetcher = Arc::new(fetcher);

    let (summary, contents, _dir) =
        run(fetcher.clone(), config(2, 5), "2024-04-01", "2024-04-10").await;

    for day in range.iter() {
        assert_eq!(fetcher.calls(day), 3, "{day}");
    }
    assert_eq!(summary.total_attempts, 30);
    assert_eq!(contents, HEADER);
}
