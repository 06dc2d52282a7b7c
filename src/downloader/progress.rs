//! Run progress tracking.
//!
//! The scheduler's consumer loop feeds every terminal outcome into a
//! [`ProgressState`], which decides when a progress line is worth logging and
//! formats it with counts, percentage, rate and a remaining-time estimate.

use std::time::{Duration, Instant};

use crate::downloader::config::PROGRESS_LOG_EVERY;
use crate::FetchOutcome;

const DEFAULT_PERCENTAGE_STEP: f64 = 10.0;

/// Progress across all dates of a run.
#[derive(Debug, Clone)]
pub struct ProgressState {
    /// Dates dispatched in this run.
    pub total: usize,
    /// Dates with a terminal outcome.
    pub completed: usize,
    /// Dates that produced metrics.
    pub succeeded: usize,
    /// Dates that were dropped.
    pub skipped: usize,
    /// When the run started.
    pub start_time: Instant,
    /// Completion percentage at the last emitted line.
    pub last_reported_percentage: f64,
    /// Completed count at the last emitted line.
    pub last_reported_completed: usize,
    /// Minimum percentage delta that triggers a new line.
    pub min_percentage_step: f64,
}

impl ProgressState {
    /// Track a run of `total` dates.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            succeeded: 0,
            skipped: 0,
            start_time: Instant::now(),
            last_reported_percentage: 0.0,
            last_reported_completed: 0,
            min_percentage_step: DEFAULT_PERCENTAGE_STEP,
        }
    }

    /// Count one terminal outcome.
    pub fn update(&mut self, outcome: &FetchOutcome) {
        self.completed = self.completed.saturating_add(1);
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.skipped += 1;
        }
    }

    /// Whether the run is finished.
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }

    /// Completion percentage (0-100).
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.completed as f64 / self.total as f64) * 100.0
    }

    /// Whether a progress line should be logged now.
    pub fn should_emit_update(&self) -> bool {
        if self.completed == 0 || self.completed == self.last_reported_completed {
            return false;
        }
        self.is_complete()
            || self.percentage() - self.last_reported_percentage >= self.min_percentage_step
            || self.completed - self.last_reported_completed >= PROGRESS_LOG_EVERY
    }

    /// Call after logging a progress line.
    pub fn mark_emitted(&mut self) {
        self.last_reported_percentage = self.percentage();
        self.last_reported_completed = self.completed;
    }

    /// Dates completed per second so far.
    pub fn rate(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.completed as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Estimated time until every date is done.
    pub fn estimate_remaining(&self) -> Option<Duration> {
        let rate = self.rate();
        let remaining = self.total.saturating_sub(self.completed);
        if rate > 0.0 && remaining > 0 {
            Some(Duration::from_secs_f64(remaining as f64 / rate))
        } else {
            None
        }
    }

    /// Human-readable progress string for logging.
    pub fn format_progress(&self) -> String {
        let mut parts = vec![format!(
            "[PROGRESS] {}/{} dates - {:.1}% complete ({} ok, {} skipped)",
            self.completed,
            self.total,
            self.percentage(),
            self.succeeded,
            self.skipped
        )];

        let rate = self.rate();
        if rate > 0.0 {
            parts.push(format!("at {rate:.1} dates/sec"));
        }

        if let Some(remaining) = self.estimate_remaining() {
            parts.push(format!("- ~{} remaining", format_duration(remaining)));
        }

        parts.join(" ")
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{:.1}h", secs as f64 / 3600.0)
    }
}
