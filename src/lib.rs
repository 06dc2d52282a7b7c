//! # Ads Metrics Downloader Library
//!
//! Pulls per-day advertising metrics (clicks, impressions, cost, ...) from a
//! rate-limited data source across an inclusive date range and aggregates the
//! results into a single CSV file.
//!
//! ## Features
//!
//! - **Concurrent Fan-Out**: One task per date, bounded by a configurable worker count
//! - **Bounded Retry**: Rate-limit failures are retried with a fixed backoff, other failures are skipped
//! - **Deterministic Output**: Rows are always written in ascending date order
//! - **Pluggable Sources**: Any [`fetcher::MetricsFetcher`] implementation, HTTP included
//!
//! ## Quick Start
//!
//! ```no_run
//! use ads_metrics_downloader::downloader::{DownloadExecutor, DownloadJob, PipelineConfig};
//! use ads_metrics_downloader::fetcher::StaticMetricsFetcher;
//! use ads_metrics_downloader::range::DateRange;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let range = DateRange::parse("2024-01-01", "2024-01-31")?;
//! let job = DownloadJob::new(range, "./aggregated_data.csv".into());
//!
//! let fetcher = Arc::new(StaticMetricsFetcher::default());
//! let executor = DownloadExecutor::new(fetcher, PipelineConfig::default());
//! let summary = executor.execute(job).await?;
//! println!("{} of {} dates written", summary.succeeded, summary.requested_dates);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`range`] - Inclusive calendar date ranges and the tasks derived from them
//! - [`fetcher`] - Source trait, error classification, static and HTTP sources
//! - [`downloader`] - Retrying fetcher, scheduler and run orchestration
//! - [`report`] - Aggregation of per-date outcomes into an ordered report
//! - [`output`] - Report writers (CSV)

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// CLI command implementations
pub mod cli;

/// Download orchestration
pub mod downloader;

/// Metric sources
pub mod fetcher;

/// Observability metrics
pub mod metrics;

/// Report writers
pub mod output;

/// Date range generation
pub mod range;

/// Result aggregation
pub mod report;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

pub use range::{DateRange, DateTask};
pub use report::AggregatedReport;

/// Ordered mapping of metric name to value for a single day.
///
/// Keys keep the order in which they were first inserted, which is the order
/// the source reported them in. The CSV header is derived from this order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    entries: Vec<(String, Decimal)>,
}

impl Metrics {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapping from name/value pairs, later duplicates overwrite earlier ones
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Decimal)>,
    {
        let mut metrics = Self::new();
        for (key, value) in pairs {
            metrics.insert(key, value);
        }
        metrics
    }

    /// Insert or replace a metric, keeping the original position of an existing key
    pub fn insert(&mut self, key: impl Into<String>, value: Decimal) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Look up a metric by name
    pub fn get(&self, key: &str) -> Option<Decimal> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    /// Metric names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Name/value pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of metrics
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no metrics are present
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Metrics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, &value.to_string())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Metrics {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(MetricsVisitor)
    }
}

struct MetricsVisitor;

impl<'de> Visitor<'de> for MetricsVisitor {
    type Value = Metrics;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a flat object of numeric metric values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut metrics = Metrics::new();
        while let Some((key, raw)) = access.next_entry::<String, serde_json::Value>()? {
            let value = parse_metric_value(&raw).ok_or_else(|| {
                serde::de::Error::custom(format!("metric '{key}' is not numeric: {raw}"))
            })?;
            metrics.insert(key, value);
        }
        Ok(metrics)
    }
}

/// Parse a JSON number (or numeric string) into an exact decimal.
///
/// Uses the textual form so `50.0` keeps its scale and is written back as `50.0`.
fn parse_metric_value(raw: &serde_json::Value) -> Option<Decimal> {
    let text = match raw {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Why a date ended without metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Rate limited on every attempt
    RateLimited,
    /// The source timed out
    Timeout,
    /// Any other source failure
    Other(String),
    /// Shutdown was requested before the date finished
    Cancelled,
}

impl SkipReason {
    /// Short label used in logs and metric labels
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::RateLimited => "rate_limited",
            SkipReason::Timeout => "timeout",
            SkipReason::Other(_) => "other",
            SkipReason::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Other(detail) => write!(f, "other ({detail})"),
            _ => write!(f, "{}", self.label().replace('_', "-")),
        }
    }
}

/// Terminal result of fetching one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// The source returned metrics
    Success {
        /// Day the metrics belong to
        date: NaiveDate,
        /// Reported metrics
        metrics: Metrics,
    },
    /// The date was dropped
    Skipped {
        /// Day that was dropped
        date: NaiveDate,
        /// Why it was dropped
        reason: SkipReason,
    },
}

impl FetchOutcome {
    /// Date this outcome belongs to
    pub fn date(&self) -> NaiveDate {
        match self {
            FetchOutcome::Success { date, .. } | FetchOutcome::Skipped { date, .. } => *date,
        }
    }

    /// Whether the date produced metrics
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    /// Disposition label for logs and metrics ("success" or the skip reason)
    pub fn disposition(&self) -> &'static str {
        match self {
            FetchOutcome::Success { .. } => "success",
            FetchOutcome::Skipped { reason, .. } => reason.label(),
        }
    }
}
