//! Client-side request throttling
//!
//! Keeps the number of requests issued inside a rolling window below the
//! source's quota so workers spend less time in rate-limit backoff.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;

/// Request-based rate limiter shared by all workers
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_requests: usize,
    semaphore: Arc<Semaphore>,
    window: Duration,
}

impl RateLimiter {
    /// Allow at most `max_requests` per `window`
    ///
    /// # Arguments
    /// * `max_requests` - Requests allowed per window (minimum 1)
    /// * `window` - Length of the window
    pub fn request_based(max_requests: usize, window: Duration) -> Self {
        let max_requests = max_requests.max(1);
        Self {
            max_requests,
            semaphore: Arc::new(Semaphore::new(max_requests)),
            window,
        }
    }

    /// Convenience constructor for a per-minute quota
    pub fn per_minute(max_requests: usize) -> Self {
        Self::request_based(max_requests, Duration::from_secs(60))
    }

    /// Configured quota per window
    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Permits currently available without waiting
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a request slot.
    ///
    /// The permit is held for the full window and released by a background
    /// task, so a slot only frees up once its window has elapsed.
    pub async fn acquire(&self) -> Result<(), RateLimitError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| RateLimitError::AcquireError(e.to_string()))?;

        let window = self.window;
        tokio::spawn(async move {
            sleep(window).await;
            drop(permit);
        });

        Ok(())
    }
}

/// Rate limiter errors
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Failed to acquire a permit
    #[error("failed to acquire rate limit permit: {0}")]
    AcquireError(String),
}
