//! Fixed-value source used when no remote endpoint is configured

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{FetcherResult, MetricsFetcher};
use crate::Metrics;

/// Returns the same metrics for every date
#[derive(Debug, Clone)]
pub struct StaticMetricsFetcher {
    metrics: Metrics,
}

impl StaticMetricsFetcher {
    /// Create a source that always answers with `metrics`
    pub fn new(metrics: Metrics) -> Self {
        Self { metrics }
    }
}

impl Default for StaticMetricsFetcher {
    /// `{clicks: 100, impressions: 1000, cost: 50.0}`
    fn default() -> Self {
        Self::new(Metrics::from_pairs([
            ("clicks", Decimal::from(100)),
            ("impressions", Decimal::from(1000)),
            ("cost", Decimal::new(500, 1)),
        ]))
    }
}

#[async_trait]
impl MetricsFetcher for StaticMetricsFetcher {
    async fn fetch(&self, _date: NaiveDate) -> FetcherResult<Metrics> {
        Ok(self.metrics.clone())
    }

    fn source_name(&self) -> &str {
        "static"
    }
}
