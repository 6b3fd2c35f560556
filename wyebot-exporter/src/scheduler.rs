//! Fixed-interval cycle scheduling.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};
use wyebot_api::Transport;

use crate::cycle::{CycleError, CycleOutcome, CycleRunner};

/// Runs a cycle, then waits `interval` from its end, until shutdown.
pub struct Scheduler<T> {
    runner: CycleRunner<T>,
    interval: Duration,
}

impl<T: Transport> Scheduler<T> {
    pub fn new(runner: CycleRunner<T>, interval: Duration) -> Self {
        Self { runner, interval }
    }

    /// Run exactly one cycle and log its outcome.
    pub async fn run_once(&self) -> CycleOutcome {
        let outcome = self.runner.run_cycle().await;
        log_outcome(&outcome);
        outcome
    }

    /// Run cycles until the shutdown flag becomes true.
    ///
    /// A cycle in progress is never interrupted; the flag is checked between
    /// cycles and during the wait. Returns the number of cycles run.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> u64 {
        info!(interval = ?self.interval, "Starting collection loop");
        let mut cycles = 0;

        loop {
            self.run_once().await;
            cycles += 1;

            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(cycles, "Collection loop stopped");
        cycles
    }
}

fn log_outcome(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Completed(summary) => info!(
            locations = summary.locations,
            sensors = summary.sensors,
            samples = summary.samples,
            dropped = summary.dropped,
            expired = summary.expired,
            "Collection cycle completed"
        ),
        CycleOutcome::Aborted { error, partial } => error!(
            error = %error,
            endpoint = error_endpoint(error),
            locations = partial.locations,
            sensors = partial.sensors,
            samples = partial.samples,
            "Collection cycle aborted"
        ),
    }
}

fn error_endpoint(error: &CycleError) -> &'static str {
    match error {
        CycleError::Api(api) => api.endpoint().map_or("", |e| e.as_str()),
        CycleError::Registry(_) => "",
    }
}
