//! Failure accounting and threshold classification.
//!
//! A [`FailureTally`] counts operation outcomes for one task execution; the
//! [`FailureToleranceGate`] turns the final tally into a pass/fail verdict
//! against a maximum failure percentage. The verdict is the signal surfaced
//! to the surrounding job's retry policy. The gate never retries individual
//! keys itself: retry happens at task-attempt granularity and re-submits the
//! whole split.

/// Attempted/failed counters scoped to one task execution.
///
/// Both counters only ever increase. The tally is commutative, so outcomes
/// may be folded in completion order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureTally {
    attempted: u64,
    failed: u64,
}

impl FailureTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one successful outcome.
    pub fn record_success(&mut self) {
        self.attempted += 1;
    }

    /// Fold in one failed outcome.
    pub fn record_failure(&mut self) {
        self.attempted += 1;
        self.failed += 1;
    }

    pub fn attempted(&self) -> u64 {
        self.attempted
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }
}

/// Task classification produced by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The failure rate is within tolerance.
    Pass,

    /// The failure rate exceeds the threshold; the task attempt must
    /// report failure so the outer retry policy takes over.
    Fail,
}

/// Threshold-based pass/fail classification.
#[derive(Debug, Clone, Copy)]
pub struct FailureToleranceGate {
    max_failure_percent: u32,
}

impl FailureToleranceGate {
    pub fn new(max_failure_percent: u32) -> Self {
        Self {
            max_failure_percent,
        }
    }

    /// Classify a finished tally.
    ///
    /// Fails iff `failed * 100 > attempted * max_failure_percent`, computed
    /// in integers to avoid rounding surprises. An empty tally always
    /// passes.
    pub fn evaluate(&self, tally: &FailureTally) -> Verdict {
        if tally.attempted == 0 {
            return Verdict::Pass;
        }
        if tally.failed * 100 > tally.attempted * u64::from(self.max_failure_percent) {
            Verdict::Fail
        } else {
            Verdict::Pass
        }
    }
}
