//! Retry message formatting.
//!
//! Keeps the wording of per-date retry, recovery and give-up messages
//! consistent between the retry loop and anything else that reports on it.

use chrono::NaiveDate;
use std::time::Duration;

use super::{ErrorKind, FetcherError};
use crate::range::DATE_FORMAT;

impl ErrorKind {
    /// User-friendly description used inside retry log messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Timeout => "request timeout",
            Self::RateLimit => "rate limit exceeded",
            Self::Other => "source error",
        }
    }

    /// Suggested remediation shown when a date is dropped.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Timeout => "Increase --request-timeout-secs or retry the date later",
            Self::RateLimit => "Lower --concurrency or --requests-per-minute, or raise --backoff-secs",
            Self::Other => "Check the source URL and the source's status",
        }
    }
}

/// Context for formatting retry messages.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Attempt that just failed or succeeded (1-based)
    pub attempt: u32,
    /// Maximum attempts allowed (retries + 1)
    pub max_attempts: u32,
    /// Classification of the last error
    pub error_kind: ErrorKind,
    /// Wait before the next attempt
    pub backoff_duration: Duration,
    /// Day being fetched
    pub date: NaiveDate,
    /// Last error message
    pub error_message: String,
}

impl RetryContext {
    /// Build a context from the error that ended an attempt
    pub fn new(
        attempt: u32,
        max_attempts: u32,
        error: &FetcherError,
        backoff_duration: Duration,
        date: NaiveDate,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_kind: error.kind(),
            backoff_duration,
            date,
            error_message: error.to_string(),
        }
    }

    /// Standard retry message with attempt counters.
    pub fn format_retry(&self) -> String {
        format!(
            "Retrying {} (attempt {}/{}) after {} - waiting {:.1} seconds...",
            self.date.format(DATE_FORMAT),
            self.attempt + 1,
            self.max_attempts,
            self.error_kind.description(),
            self.backoff_duration.as_secs_f64()
        )
    }

    /// Message when an attempt succeeds after earlier failures.
    pub fn format_success(&self) -> String {
        format!(
            "Retry attempt {}/{} succeeded for {}",
            self.attempt,
            self.max_attempts,
            self.date.format(DATE_FORMAT)
        )
    }

    /// Give-up summary with a suggestion.
    pub fn format_failure(&self) -> String {
        [
            format!(
                "[SKIPPED] {} after {} attempt(s)",
                self.date.format(DATE_FORMAT),
                self.attempt
            ),
            format!("  Last error: {}", self.error_message),
            format!("  Suggestion: {}", self.error_kind.suggestion()),
        ]
        .join("\n")
    }
}
