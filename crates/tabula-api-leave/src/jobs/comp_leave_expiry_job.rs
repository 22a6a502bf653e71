//! Scheduled expiry-to-pay job.
//!
//! Wraps the domain converter for the two call sites: the in-app scheduler
//! loop and the manual `/cron/execute` trigger. The converter is idempotent
//! per month, so the daily re-run of an already-swept month is a zero-grant
//! no-op.

use std::time::Duration;

use tabula_comp_leave::services::{ExpiryConverter, ExpiryRunSummary};
use tabula_comp_leave::types::PayrollMonth;
use tabula_comp_leave::Result;
use tracing::{error, info};

/// Default scheduler interval: once a day.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 86_400;

/// Runs the expiry conversion batch.
#[derive(Clone)]
pub struct CompLeaveExpiryJob {
    converter: ExpiryConverter,
    poll_interval: Duration,
}

impl CompLeaveExpiryJob {
    pub fn new(converter: ExpiryConverter) -> Self {
        Self {
            converter,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Run one batch. `target` backfills an explicit month; the scheduler
    /// passes `None` to sweep the previous month.
    pub async fn run_once(&self, target: Option<PayrollMonth>) -> Result<ExpiryRunSummary> {
        self.converter.run(target).await
    }

    /// Scheduler loop: run the batch, sleep, repeat. Errors are recorded in
    /// the execution ledger by the converter and only logged here; the loop
    /// never dies.
    pub async fn run_loop(self) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.run_once(None).await {
                Ok(summary) => {
                    info!(
                        month = %summary.month,
                        converted = summary.grants_converted,
                        failed = summary.failures.len(),
                        "scheduled comp-leave expiry run finished"
                    );
                }
                Err(err) => {
                    error!(error = %err, "scheduled comp-leave expiry run failed");
                }
            }
        }
    }
}
