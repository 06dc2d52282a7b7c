//! HTTP metrics source
//!
//! Issues `GET {base_url}/metrics?date=YYYY-MM-DD` and expects a flat JSON
//! object of numeric metrics in the body. Failures are classified for the
//! retry layer; this client never retries on its own.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{FetcherError, FetcherResult, MetricsFetcher};
use crate::downloader::rate_limit::RateLimiter;
use crate::range::DATE_FORMAT;
use crate::Metrics;

const METRICS_ENDPOINT: &str = "/metrics";

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Metrics source backed by an HTTP endpoint
pub struct HttpMetricsFetcher {
    client: Client,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
}

impl HttpMetricsFetcher {
    /// Create a new HTTP source
    ///
    /// # Arguments
    /// * `base_url` - Endpoint root, e.g. `https://ads.example.com/api`
    /// * `timeout` - Per-request timeout; expiry is reported as [`FetcherError::Timeout`]
    /// * `rate_limiter` - Shared client-side throttle
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        rate_limiter: Arc<RateLimiter>,
    ) -> FetcherResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetcherError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            rate_limiter,
        })
    }

    /// Base URL requests are issued against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, METRICS_ENDPOINT)
    }
}

#[async_trait]
impl MetricsFetcher for HttpMetricsFetcher {
    async fn fetch(&self, date: NaiveDate) -> FetcherResult<Metrics> {
        self.rate_limiter
            .acquire()
            .await
            .map_err(|e| FetcherError::Other(format!("rate limiter error: {e}")))?;

        let url = self.endpoint();
        let date_param = date.format(DATE_FORMAT).to_string();
        debug!(url = %url, date = %date_param, "Requesting metrics");

        let response = self
            .client
            .get(&url)
            .query(&[("date", date_param.as_str())])
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        if let Some(err) = classify_status(response.status()) {
            return Err(err);
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        parse_metrics_body(&body)
    }

    fn source_name(&self) -> &str {
        &self.base_url
    }
}

/// Map a non-success HTTP status to a classified error
pub fn classify_status(status: StatusCode) -> Option<FetcherError> {
    if status.is_success() {
        return None;
    }

    match status {
        StatusCode::TOO_MANY_REQUESTS => Some(FetcherError::RateLimited),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            Some(FetcherError::Timeout(format!("HTTP {}", status.as_u16())))
        }
        _ => Some(FetcherError::Other(format!("HTTP {}", status.as_u16()))),
    }
}

/// Map a transport-level failure to a classified error
pub fn classify_transport_error(err: &reqwest::Error) -> FetcherError {
    if err.is_timeout() {
        FetcherError::Timeout(err.to_string())
    } else if let Some(status) = err.status() {
        classify_status(status).unwrap_or_else(|| FetcherError::Other(err.to_string()))
    } else {
        FetcherError::Other(err.to_string())
    }
}

/// Parse a response body into metrics
pub fn parse_metrics_body(body: &str) -> FetcherResult<Metrics> {
    serde_json::from_str(body)
        .map_err(|e| FetcherError::Other(format!("invalid metrics payload: {e}")))
}
