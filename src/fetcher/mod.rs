//! Metric sources

use crate::Metrics;
use async_trait::async_trait;
use chrono::NaiveDate;

pub mod http;
pub mod retry_formatter;
pub mod static_source;

pub use http::HttpMetricsFetcher;
pub use static_source::StaticMetricsFetcher;

/// Fetcher errors, classified by how the retry layer treats them
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FetcherError {
    /// The source did not answer in time
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The source rejected the request because of rate limiting
    #[error("rate limit exceeded")]
    RateLimited,

    /// Any other failure (bad status, bad payload, connection refused)
    #[error("{0}")]
    Other(String),
}

/// Coarse classification of a [`FetcherError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Not retried
    Timeout,
    /// Retried with backoff
    RateLimit,
    /// Not retried
    Other,
}

impl FetcherError {
    /// Classification used by the retry policy
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetcherError::Timeout(_) => ErrorKind::Timeout,
            FetcherError::RateLimited => ErrorKind::RateLimit,
            FetcherError::Other(_) => ErrorKind::Other,
        }
    }

    /// Whether the retry policy will try again after this error
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::RateLimit
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// A source of per-day metrics
#[async_trait]
pub trait MetricsFetcher: Send + Sync {
    /// Fetch the metrics for a single day
    ///
    /// # Errors
    /// Returns a classified [`FetcherError`]; the caller decides whether to retry
    async fn fetch(&self, date: NaiveDate) -> FetcherResult<Metrics>;

    /// Human-readable name of the source for logs
    fn source_name(&self) -> &str;
}
