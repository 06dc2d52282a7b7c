//! Unit tests for retry message formatting

use ads_metrics_downloader::fetcher::retry_formatter::RetryContext;
use ads_metrics_downloader::fetcher::{ErrorKind, FetcherError};
use chrono::NaiveDate;
use std::time::Duration;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
}

#[test]
fn test_retry_message_counts_next_attempt() {
    let ctx = RetryContext::new(
        1,
        4,
        &FetcherError::RateLimited,
        Duration::from_secs(5),
        day(),
    );

    assert_eq!(
        ctx.format_retry(),
        "Retrying 2024-01-02 (attempt 2/4) after rate limit exceeded - waiting 5.0 seconds..."
    );
}

#[test]
fn test_success_message() {
    let ctx = RetryContext::new(
        3,
        4,
        &FetcherError::RateLimited,
        Duration::from_secs(5),
        day(),
    );

    assert_eq!(
        ctx.format_success(),
        "Retry attempt 3/4 succeeded for 2024-01-02"
    );
}

#[test]
fn test_failure_message_includes_suggestion() {
    let error = FetcherError::Timeout("deadline elapsed".to_string());
    let ctx = RetryContext::new(1, 4, &error, Duration::from_secs(5), day());
    let message = ctx.format_failure();

    assert!(message.starts_with("[SKIPPED] 2024-01-02 after 1 attempt(s)"));
    assert!(message.contains(&error.to_string()));
    assert!(message.contains(ErrorKind::Timeout.suggestion()));
}

#[test]
fn test_error_kinds() {
    assert_eq!(FetcherError::RateLimited.kind(), ErrorKind::RateLimit);
    assert!(FetcherError::RateLimited.is_retryable());
    assert!(!FetcherError::Timeout(String::new()).is_retryable());
    assert!(!FetcherError::Other(String::new()).is_retryable());
}
