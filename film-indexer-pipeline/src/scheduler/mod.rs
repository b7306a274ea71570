//! Scheduler loop.
//!
//! Repeats the supervised pass on a fixed interval, forever.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::backoff::{retry_with_backoff, BackoffConfig, Sleeper};
use crate::supervisor::{RetrySupervisor, RunOutcome};

/// Configuration for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    /// Pause between the end of one pass and the start of the next.
    pub interval: Duration,
    /// Retry a failed pass with backoff before going back to sleep.
    pub retry_failed_runs: bool,
    pub backoff: BackoffConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            retry_failed_runs: true,
            backoff: BackoffConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Drives a [`RetrySupervisor`] through `Idle -> Running -> Idle` cycles.
pub struct Scheduler {
    supervisor: RetrySupervisor,
    config: SchedulerConfig,
    sleeper: Arc<dyn Sleeper>,
    state: SchedulerState,
}

impl Scheduler {
    pub fn new(
        supervisor: RetrySupervisor,
        config: SchedulerConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            supervisor,
            config,
            sleeper,
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Create the search index, retrying with backoff until it succeeds.
    pub async fn prepare(&self) {
        let status = retry_with_backoff(
            self.config.backoff,
            self.sleeper.as_ref(),
            "ensure_index",
            || self.supervisor.ensure_index(),
        )
        .await;
        info!(status = ?status, "Search index ready");
    }

    /// One `Idle -> Running -> Idle` transition.
    ///
    /// With `retry_failed_runs` a failed pass is repeated with backoff until
    /// one completes, so the returned outcome is always completed.
    pub async fn tick(&mut self) -> RunOutcome {
        self.state = SchedulerState::Running;

        let outcome = if self.config.retry_failed_runs {
            let supervisor = &self.supervisor;
            let report = retry_with_backoff(
                self.config.backoff,
                self.sleeper.as_ref(),
                "sync_run",
                || async move {
                    match supervisor.run_once().await {
                        RunOutcome::Completed(report) => Ok(report),
                        RunOutcome::Failed { error, .. } => Err(error),
                    }
                },
            )
            .await;
            RunOutcome::Completed(report)
        } else {
            self.supervisor.run_once().await
        };

        self.state = SchedulerState::Idle;
        outcome
    }

    /// Prepare the index, then tick and sleep forever.
    pub async fn run(&mut self) {
        self.prepare().await;

        loop {
            self.tick().await;
            debug!(
                interval_secs = self.config.interval.as_secs_f64(),
                "Sleeping until next sync run"
            );
            self.sleeper.sleep(self.config.interval).await;
        }
    }
}
