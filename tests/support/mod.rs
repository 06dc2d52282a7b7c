//! Shared test doubles

use ads_metrics_downloader::fetcher::{FetcherError, FetcherResult, MetricsFetcher};
use ads_metrics_downloader::Metrics;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// `{clicks: 100, impressions: 1000, cost: 50.0}`
pub fn sample_metrics() -> Metrics {
    Metrics::from_pairs([
        ("clicks", Decimal::from(100)),
        ("impressions", Decimal::from(1000)),
        ("cost", Decimal::new(500, 1)),
    ])
}

/// Fetcher whose answers are scripted per date.
///
/// Each date first drains its script, then keeps returning its fallback
/// (sample metrics unless overridden).
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<NaiveDate, VecDeque<FetcherResult<Metrics>>>>,
    fallbacks: HashMap<NaiveDate, FetcherResult<Metrics>>,
    delays: HashMap<NaiveDate, Duration>,
    calls: Mutex<HashMap<NaiveDate, u32>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers for the first calls on `date`
    pub fn script(self, date: NaiveDate, answers: Vec<FetcherResult<Metrics>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(date, answers.into_iter().collect());
        self
    }

    /// Answer for every call on `date` once its script is exhausted
    pub fn always(mut self, date: NaiveDate, answer: FetcherResult<Metrics>) -> Self {
        self.fallbacks.insert(date, answer);
        self
    }

    /// Sleep before answering for `date`
    pub fn delay(mut self, date: NaiveDate, delay: Duration) -> Self {
        self.delays.insert(date, delay);
        self
    }

    pub fn calls(&self, date: NaiveDate) -> u32 {
        self.calls.lock().unwrap().get(&date).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl MetricsFetcher for ScriptedFetcher {
    async fn fetch(&self, date: NaiveDate) -> FetcherResult<Metrics> {
        *self.calls.lock().unwrap().entry(date).or_insert(0) += 1;

        if let Some(delay) = self.delays.get(&date) {
            tokio::time::sleep(*delay).await;
        }

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&date)
            .and_then(|answers| answers.pop_front());

        scripted.unwrap_or_else(|| {
            self.fallbacks
                .get(&date)
                .cloned()
                .unwrap_or_else(|| Ok(sample_metrics()))
        })
    }

    fn source_name(&self) -> &str {
        "scripted"
    }
}

pub fn rate_limited() -> FetcherResult<Metrics> {
    Err(FetcherError::RateLimited)
}

pub fn timed_out() -> FetcherResult<Metrics> {
    Err(FetcherError::Timeout("deadline elapsed".to_string()))
}
