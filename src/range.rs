//! Inclusive calendar date ranges.
//!
//! A [`DateRange`] is validated once on construction and can be iterated any
//! number of times; every call to [`DateRange::iter`] starts again from the
//! first day.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Input format for dates on the command line and in logs
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Date range errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RangeError {
    /// Start date falls after end date
    #[error("invalid range: start date {start} is after end date {end}")]
    InvalidRange {
        /// Requested first day
        start: NaiveDate,
        /// Requested last day
        end: NaiveDate,
    },

    /// Input could not be parsed as YYYY-MM-DD
    #[error("invalid date '{input}': {reason}")]
    InvalidDate {
        /// Raw input
        input: String,
        /// Parser message
        reason: String,
    },
}

/// A single calendar date to fetch, tagged with its position in the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateTask {
    /// Position in the input sequence, used to address the result slot
    pub index: usize,
    /// Day to fetch
    pub date: NaiveDate,
}

/// Inclusive range of calendar days with `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

/// Unchecked bounds as they appear on the wire
#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = RangeError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl DateRange {
    /// Create a range, failing if `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse both bounds from YYYY-MM-DD strings
    pub fn parse(start: &str, end: &str) -> Result<Self, RangeError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// First day
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day (inclusive)
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days in the range
    pub fn len(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    /// Always false; a valid range holds at least one day
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `date` falls inside the range
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Lazily iterate the days in ascending order
    pub fn iter(&self) -> DateRangeIter {
        DateRangeIter {
            next: Some(self.start),
            end: self.end,
        }
    }

    /// One task per day, indexed from zero
    pub fn tasks(&self) -> impl Iterator<Item = DateTask> {
        self.iter()
            .enumerate()
            .map(|(index, date)| DateTask { index, date })
    }
}

impl IntoIterator for DateRange {
    type Item = NaiveDate;
    type IntoIter = DateRangeIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for &DateRange {
    type Item = NaiveDate;
    type IntoIter = DateRangeIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the days of a [`DateRange`]
#[derive(Debug, Clone)]
pub struct DateRangeIter {
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl Iterator for DateRangeIter {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = if current < self.end {
            current.checked_add_days(Days::new(1))
        } else {
            None
        };
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .next
            .map(|next| (self.end - next).num_days() as usize + 1)
            .unwrap_or(0);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DateRangeIter {}

/// Parse a YYYY-MM-DD date
pub fn parse_date(input: &str) -> Result<NaiveDate, RangeError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|e| RangeError::InvalidDate {
        input: input.to_string(),
        reason: e.to_string(),
    })
}
