//! Aggregation of per-date outcomes into the final report

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use crate::{FetchOutcome, Metrics};

/// One successfully fetched day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRecord {
    /// Day the metrics belong to
    pub date: NaiveDate,
    /// Metrics reported for that day
    pub metrics: Metrics,
}

/// Successful days, strictly ascending by date
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedReport {
    records: Vec<DailyRecord>,
}

impl AggregatedReport {
    /// Keep successes, sort by date, drop repeated dates.
    ///
    /// Sorting is authoritative: the result does not depend on the order the
    /// outcomes arrive in. The sort is stable, so if a date appears twice the
    /// first occurrence in `outcomes` wins.
    pub fn aggregate<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = FetchOutcome>,
    {
        let mut records: Vec<DailyRecord> = outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                FetchOutcome::Success { date, metrics } => Some(DailyRecord { date, metrics }),
                FetchOutcome::Skipped { .. } => None,
            })
            .collect();

        records.sort_by_key(|record| record.date);

        let before = records.len();
        records.dedup_by_key(|record| record.date);
        if records.len() != before {
            warn!(
                duplicates = before - records.len(),
                "Dropped repeated dates while aggregating"
            );
        }

        Self { records }
    }

    /// Records in ascending date order
    pub fn records(&self) -> &[DailyRecord] {
        &self.records
    }

    /// Number of days in the report
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no day succeeded
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Days present in the report
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.records.iter().map(|record| record.date)
    }
}

impl IntoIterator for AggregatedReport {
    type Item = DailyRecord;
    type IntoIter = std::vec::IntoIter<DailyRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
