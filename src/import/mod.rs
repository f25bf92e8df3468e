//! Import path: push filesystem records back into the store in bulk.
//!
//! The import system is built from three components:
//!
//! 1. **BulkActionRecord**: one decoded, pending store mutation
//! 2. **BulkWriteScheduler**: bounded-concurrency async dispatch with
//!    per-operation timeout and completion accounting
//! 3. **FailureToleranceGate**: threshold-based pass/fail classification of
//!    the finished tally
//!
//! [`ImportTask`] is the map-only task body: one input file is one split,
//! decoded into actions and submitted as one batch. The per-split verdict
//! feeds the run-level failure policy, which mirrors the split policy one
//! level up: a run passes when the share of failed splits stays within the
//! same threshold, and aborts early once the hard tracker-failure cap is
//! exceeded.

use std::path::Path;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::codec::RecordCodec;
use crate::config::{ImportConfig, JobPolicy};
use crate::error::Result;
use crate::store::DocumentStore;

pub mod action;
pub mod gate;
pub mod scheduler;

pub use action::{ActionKind, BulkActionRecord};
pub use gate::{FailureTally, FailureToleranceGate, Verdict};
pub use scheduler::{BulkWriteScheduler, FailureClass, OperationOutcome};

/// Result of one task attempt over one split.
#[derive(Debug)]
pub struct TaskReport {
    /// Outcome counters, including records that failed to decode.
    pub tally: FailureTally,
    /// Gate classification of the tally.
    pub verdict: Verdict,
    /// Wall time of the attempt.
    pub elapsed_ms: u64,
}

/// Executes import task attempts over a borrowed store connection.
///
/// The connection is owned by the surrounding run; each distributed-task
/// attempt would own its own connection lifecycle, so one `ImportTask` is
/// never shared across concurrent attempts.
pub struct ImportTask<'a> {
    store: &'a dyn DocumentStore,
    config: &'a ImportConfig,
    policy: &'a JobPolicy,
    cancel: CancellationToken,
}

impl<'a> ImportTask<'a> {
    pub fn new(store: &'a dyn DocumentStore, config: &'a ImportConfig, policy: &'a JobPolicy) -> Self {
        Self {
            store,
            config,
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Use the given token to cancel the run between and inside splits.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run one task attempt over one split.
    ///
    /// Records that fail to decode are absorbed into the tally as failures;
    /// only an unreadable split propagates an error.
    pub async fn run_split(&self, path: &Path) -> Result<TaskReport> {
        let started = Instant::now();
        let codec = RecordCodec::new(self.config.format.clone());

        let contents = tokio::fs::read_to_string(path).await?;

        let mut decode_failures: u64 = 0;
        let mut actions = Vec::new();
        for row in codec.split_rows(&contents) {
            let decoded = match codec.decode(row) {
                Ok(decoded) => decoded,
                Err(e) => {
                    warn!("Skipping malformed record: {e}");
                    decode_failures += 1;
                    continue;
                }
            };
            match BulkActionRecord::from_decoded(self.config.action, decoded, self.config.expiry) {
                Ok(action) => actions.push(action),
                Err(e) => {
                    warn!("Skipping unusable record: {e}");
                    decode_failures += 1;
                }
            }
        }

        let scheduler = BulkWriteScheduler::new(
            self.store,
            self.config.concurrency,
            Duration::from_secs(self.config.op_timeout_secs),
        )
        .with_cancellation(self.cancel.clone());

        let mut tally = scheduler.submit(actions).await;
        for _ in 0..decode_failures {
            tally.record_failure();
        }

        let gate = FailureToleranceGate::new(self.policy.max_failure_percent);
        let verdict = gate.evaluate(&tally);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            "Split '{}': {} attempted, {} failed, {:?} in {} ms",
            path.display(),
            tally.attempted(),
            tally.failed(),
            verdict,
            elapsed_ms
        );

        Ok(TaskReport {
            tally,
            verdict,
            elapsed_ms,
        })
    }

    /// Run every configured input split and classify the whole run.
    pub async fn run(&self) -> Result<Verdict> {
        let gate = FailureToleranceGate::new(self.policy.max_failure_percent);
        let mut split_tally = FailureTally::new();

        for path in &self.config.inputs {
            if self.cancel.is_cancelled() {
                warn!("Run cancelled; {} splits left unprocessed", {
                    self.config.inputs.len() as u64 - split_tally.attempted()
                });
                return Ok(Verdict::Fail);
            }

            info!("___________________________________");
            info!("Running task for split '{}'...", path.display());

            match self.run_split(path).await {
                Ok(report) if report.verdict == Verdict::Pass => split_tally.record_success(),
                Ok(_) => {
                    warn!("Split '{}' exceeded the failure threshold", path.display());
                    split_tally.record_failure();
                }
                Err(e) => {
                    error!("Split '{}' failed: {e}", path.display());
                    split_tally.record_failure();
                }
            }

            if split_tally.failed() > u64::from(self.policy.max_tracker_failures) {
                error!(
                    "Aborting run: {} split failures exceed the tracker cap of {}",
                    split_tally.failed(),
                    self.policy.max_tracker_failures
                );
                return Ok(Verdict::Fail);
            }
        }

        Ok(gate.evaluate(&split_tally))
    }
}
