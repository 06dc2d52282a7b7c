//! Unit tests for HTTP response handling

use ads_metrics_downloader::downloader::RateLimiter;
use ads_metrics_downloader::fetcher::http::{classify_status, parse_metrics_body};
use ads_metrics_downloader::fetcher::{FetcherError, HttpMetricsFetcher};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_only_429_is_rate_limited() {
    assert_eq!(
        classify_status(StatusCode::TOO_MANY_REQUESTS),
        Some(FetcherError::RateLimited)
    );
    for status in [
        StatusCode::SERVICE_UNAVAILABLE,
        StatusCode::BAD_GATEWAY,
        StatusCode::UNAUTHORIZED,
    ] {
        assert!(matches!(
            classify_status(status),
            Some(FetcherError::Other(_))
        ));
    }
    for status in [StatusCode::REQUEST_TIMEOUT, StatusCode::GATEWAY_TIMEOUT] {
        assert!(matches!(
            classify_status(status),
            Some(FetcherError::Timeout(_))
        ));
    }
}

#[test]
fn test_body_keeps_key_order_and_scale() {
    let metrics =
        parse_metrics_body(r#"{"impressions": 1000, "cost": 50.0, "clicks": "100"}"#).unwrap();

    let keys: Vec<&str> = metrics.keys().collect();
    assert_eq!(keys, vec!["impressions", "cost", "clicks"]);
    assert_eq!(metrics.get("cost").unwrap().to_string(), "50.0");
    assert_eq!(metrics.get("clicks"), Some(Decimal::from(100)));
}

#[test]
fn test_malformed_body_is_other_error() {
    assert!(matches!(
        parse_metrics_body("<html>busy</html>"),
        Err(FetcherError::Other(_))
    ));
}

#[test]
fn test_base_url_trailing_slash_trimmed() {
    let fetcher = HttpMetricsFetcher::new(
        "http://localhost:8080/".to_string(),
        Duration::from_secs(1),
        Arc::new(RateLimiter::per_minute(60)),
    )
    .unwrap();
    assert_eq!(fetcher.base_url(), "http://localhost:8080");
}
