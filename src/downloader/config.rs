//! Pipeline configuration and defaults

use std::num::NonZeroUsize;
use std::time::Duration;

/// Retries after the first attempt when the source rate-limits a date.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Fixed wait between rate-limited attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

/// Upper bound accepted for `--concurrency`.
pub const MAX_CONCURRENCY: usize = 64;

/// Log a progress line at least every N completed dates.
pub const PROGRESS_LOG_EVERY: usize = 25;

/// Worker count when none is configured: available hardware parallelism.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Retry behavior for a single date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries beyond the first attempt; total attempts never exceed `max_retries + 1`
    pub max_retries: u32,
    /// Wait before each retry
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Create a policy
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Maximum number of attempts for one date
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BACKOFF)
    }
}

/// Settings passed into the scheduler and retrying fetcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Per-date retry policy
    pub retry: RetryPolicy,
    /// Number of dates fetched concurrently
    pub concurrency: usize,
}

impl PipelineConfig {
    /// Override the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override the worker count (clamped to at least 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            concurrency: default_concurrency(),
        }
    }
}
