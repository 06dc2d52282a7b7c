//! Retrying wrapper around a [`MetricsFetcher`]
//!
//! Only rate-limit failures are retried, with a fixed backoff between
//! attempts. Timeouts and other failures drop the date on the first
//! occurrence. The loop is iterative with an explicit attempt counter, so a
//! date never makes more than `max_retries + 1` calls to the source.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::downloader::config::RetryPolicy;
use crate::fetcher::retry_formatter::RetryContext;
use crate::fetcher::{ErrorKind, MetricsFetcher};
use crate::metrics::{record_retry_backoff, DateFetchMetrics};
use crate::shutdown::SharedShutdown;
use crate::{FetchOutcome, SkipReason};

/// Worker-local retry bookkeeping for one date
#[derive(Debug, Clone, Copy)]
struct RetryState {
    date: NaiveDate,
    attempt: u32,
    max_retries: u32,
}

impl RetryState {
    fn new(date: NaiveDate, max_retries: u32) -> Self {
        Self {
            date,
            attempt: 0,
            max_retries,
        }
    }

    /// Retries already spent are `attempt - 1`
    fn can_retry(&self) -> bool {
        self.attempt <= self.max_retries
    }
}

/// Terminal outcome of one date plus how many source calls it took
#[derive(Debug, Clone, PartialEq)]
pub struct RetryResult {
    /// Final outcome
    pub outcome: FetchOutcome,
    /// Calls made to the source (0 when cancelled before the first)
    pub attempts: u32,
}

/// Applies a [`RetryPolicy`] to every fetch
#[derive(Clone)]
pub struct RetryingFetcher {
    fetcher: Arc<dyn MetricsFetcher>,
    policy: RetryPolicy,
    shutdown: Option<SharedShutdown>,
}

impl RetryingFetcher {
    /// Wrap `fetcher` with `policy`
    pub fn new(fetcher: Arc<dyn MetricsFetcher>, policy: RetryPolicy) -> Self {
        Self {
            fetcher,
            policy,
            shutdown: None,
        }
    }

    /// End backoff waits early when shutdown is requested
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Policy in effect
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetch `date`, retrying rate-limit failures, and return the terminal outcome
    pub async fn attempt_fetch(&self, date: NaiveDate) -> FetchOutcome {
        self.fetch_with_retry(date).await.outcome
    }

    /// Like [`RetryingFetcher::attempt_fetch`], also reporting the attempt count
    pub async fn fetch_with_retry(&self, date: NaiveDate) -> RetryResult {
        let mut metrics = DateFetchMetrics::start(date);
        let outcome = self.run_attempts(date, &mut metrics).await;
        metrics.record_outcome(&outcome);

        RetryResult {
            outcome,
            attempts: metrics.attempts(),
        }
    }

    async fn run_attempts(&self, date: NaiveDate, metrics: &mut DateFetchMetrics) -> FetchOutcome {
        let mut state = RetryState::new(date, self.policy.max_retries);
        let max_attempts = self.policy.max_attempts();

        loop {
            if self.shutdown_requested() {
                return skipped(date, SkipReason::Cancelled);
            }

            state.attempt += 1;
            metrics.record_attempt();
            debug!(date = %state.date, attempt = state.attempt, max_attempts, "Fetching");

            let error = match self.fetcher.fetch(date).await {
                Ok(day_metrics) => {
                    if state.attempt > 1 {
                        let ctx = RetryContext {
                            attempt: state.attempt,
                            max_attempts,
                            error_kind: ErrorKind::RateLimit,
                            backoff_duration: self.policy.backoff,
                            date,
                            error_message: String::new(),
                        };
                        info!("{}", ctx.format_success());
                    }
                    return FetchOutcome::Success {
                        date,
                        metrics: day_metrics,
                    };
                }
                Err(e) => e,
            };

            let ctx = RetryContext::new(
                state.attempt,
                max_attempts,
                &error,
                self.policy.backoff,
                date,
            );

            match error.kind() {
                ErrorKind::RateLimit if state.can_retry() => {
                    warn!("{}", ctx.format_retry());
                    record_retry_backoff(self.policy.backoff, state.attempt);
                    if !self.wait_backoff().await {
                        return skipped(date, SkipReason::Cancelled);
                    }
                }
                ErrorKind::RateLimit => {
                    warn!("{}", ctx.format_failure());
                    return skipped(date, SkipReason::RateLimited);
                }
                ErrorKind::Timeout => {
                    warn!("{}", ctx.format_failure());
                    return skipped(date, SkipReason::Timeout);
                }
                ErrorKind::Other => {
                    warn!("{}", ctx.format_failure());
                    return skipped(date, SkipReason::Other(error.to_string()));
                }
            }
        }
    }

    /// Sleep for the backoff interval; false if shutdown cut it short
    async fn wait_backoff(&self) -> bool {
        match &self.shutdown {
            Some(shutdown) => {
                tokio::select! {
                    _ = tokio::time::sleep(self.policy.backoff) => true,
                    _ = shutdown.wait_for_shutdown() => false,
                }
            }
            None => {
                tokio::time::sleep(self.policy.backoff).await;
                true
            }
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|s| s.is_shutdown_requested())
            .unwrap_or(false)
    }
}

fn skipped(date: NaiveDate, reason: SkipReason) -> FetchOutcome {
    FetchOutcome::Skipped { date, reason }
}
