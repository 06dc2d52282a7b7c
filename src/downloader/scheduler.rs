//! Fixed-concurrency fan-out over date tasks
//!
//! Tasks are dispatched through `buffer_unordered`, so at most `concurrency`
//! dates are in flight at any time and each in-flight future handles exactly
//! one date. Completions arrive in any order; a single consumer loop places
//! each one into the slot addressed by the task's position in the input,
//! which keeps the returned vector in input order without a shared
//! append-only list. For tasks built by `DateRange::tasks` the position
//! equals `DateTask::index`.

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tracing::{debug, info};

use crate::downloader::progress::ProgressState;
use crate::downloader::retry::{RetryResult, RetryingFetcher};
use crate::range::DateTask;
use crate::shutdown::SharedShutdown;
use crate::{FetchOutcome, SkipReason};

/// Outcomes of a scheduler run, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleResult {
    /// One terminal outcome per input task, indexed like the input
    pub outcomes: Vec<FetchOutcome>,
    /// Source calls made across all tasks
    pub total_attempts: u64,
}

/// Dispatches date tasks across a bounded set of workers
pub struct Scheduler {
    fetcher: RetryingFetcher,
    shutdown: Option<SharedShutdown>,
    progress_bar: Option<ProgressBar>,
}

impl Scheduler {
    /// Create a scheduler that runs every task through `fetcher`
    pub fn new(fetcher: RetryingFetcher) -> Self {
        Self {
            fetcher,
            shutdown: None,
            progress_bar: None,
        }
    }

    /// Stop starting new tasks once shutdown is requested
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Advance `bar` as dates complete
    pub fn with_progress_bar(mut self, bar: ProgressBar) -> Self {
        self.progress_bar = Some(bar);
        self
    }

    /// Run every task with at most `concurrency` in flight.
    ///
    /// Returns only after every task has a terminal outcome. The outcome at
    /// position `i` belongs to `tasks[i]`.
    pub async fn run(&self, tasks: Vec<DateTask>, concurrency: usize) -> Vec<FetchOutcome> {
        self.run_detailed(tasks, concurrency).await.outcomes
    }

    /// Like [`Scheduler::run`], also reporting total source calls
    pub async fn run_detailed(&self, tasks: Vec<DateTask>, concurrency: usize) -> ScheduleResult {
        let concurrency = concurrency.max(1);
        let total = tasks.len();
        info!(tasks = total, concurrency, "Dispatching date tasks");

        let mut slots: Vec<Option<FetchOutcome>> = vec![None; total];
        let mut progress = ProgressState::new(total);
        let mut total_attempts = 0u64;

        if let Some(bar) = &self.progress_bar {
            bar.set_length(total as u64);
        }

        let mut completions = stream::iter(tasks.into_iter().enumerate())
            .map(|(position, task)| async move {
                let result = self.run_task(task).await;
                (position, task, result)
            })
            .buffer_unordered(concurrency);

        while let Some((position, task, result)) = completions.next().await {
            debug!(
                index = task.index,
                date = %task.date,
                disposition = result.outcome.disposition(),
                "Task finished"
            );

            total_attempts += u64::from(result.attempts);
            progress.update(&result.outcome);
            if progress.should_emit_update() {
                info!("{}", progress.format_progress());
                progress.mark_emitted();
            }
            if let Some(bar) = &self.progress_bar {
                bar.inc(1);
            }

            slots[position] = Some(result.outcome);
        }

        // Every stream item has been consumed, so every slot is filled.
        let outcomes = slots.into_iter().flatten().collect::<Vec<_>>();
        debug_assert_eq!(outcomes.len(), total);

        ScheduleResult {
            outcomes,
            total_attempts,
        }
    }

    async fn run_task(&self, task: DateTask) -> RetryResult {
        if self.shutdown_requested() {
            return RetryResult {
                outcome: FetchOutcome::Skipped {
                    date: task.date,
                    reason: SkipReason::Cancelled,
                },
                attempts: 0,
            };
        }
        self.fetcher.fetch_with_retry(task.date).await
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|s| s.is_shutdown_requested())
            .unwrap_or(false)
    }
}
