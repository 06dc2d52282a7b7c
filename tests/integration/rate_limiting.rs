//! Integration tests for client-side request throttling

use ads_metrics_downloader::downloader::RateLimiter;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_quota_blocks_until_window_elapses() {
    let limiter = RateLimiter::request_based(2, Duration::from_secs(10));

    let started = Instant::now();
    limiter.acquire().await.unwrap();
    limiter.acquire().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(limiter.available(), 0);

    limiter.acquire().await.unwrap();
    assert!(started.elapsed() >= Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_shared_limiter_across_workers() {
    let limiter = Arc::new(RateLimiter::request_based(3, Duration::from_secs(5)));

    let started = Instant::now();
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire().await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Six requests at three per window need a second window.
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_zero_quota_clamped() {
    let limiter = RateLimiter::per_minute(0);
    assert_eq!(limiter.max_requests(), 1);
}
