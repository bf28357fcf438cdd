//! Rollout attempt — the process-local record of one rollout.
//!
//! An attempt is created when an orchestration starts, carries the "prior"
//! snapshot that rollback reverts to, and tracks the phase and the elapsed
//! polling time. It is discarded when the process exits; nothing about it is
//! persisted.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::RolloutError;

/// Current phase of a rollout.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RolloutPhase {
    /// Snapshot loaded, nothing mutated yet.
    Pending,
    /// Applying the mutating cutover steps.
    Cutover,
    /// Polling for the new capacity / revision to become ready.
    AwaitingReadiness,
    /// Waiting for workload to leave the old capacity.
    Draining,
    /// Reverting the service to the prior revision.
    RollingBack,
    /// Completed successfully.
    Completed,
    /// Reverted to the prior revision after a readiness timeout.
    RolledBack,
    /// Aborted.
    Failed { reason: String },
}

impl RolloutPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RolloutPhase::Completed | RolloutPhase::RolledBack | RolloutPhase::Failed { .. }
        )
    }
}

/// A rollout in progress.
#[derive(Debug, Clone)]
pub struct RolloutAttempt<P> {
    pub rollout_id: String,
    pub phase: RolloutPhase,
    /// State captured before cutover; the sole rollback target.
    pub prior: P,
    /// Seconds spent polling in the current phase.
    pub elapsed_secs: u64,
    pub timeout_secs: u64,
    pub started_at: Instant,
}

impl<P> RolloutAttempt<P> {
    pub fn new(rollout_id: &str, prior: P, timeout_secs: u64) -> Self {
        Self {
            rollout_id: rollout_id.to_string(),
            phase: RolloutPhase::Pending,
            prior,
            elapsed_secs: 0,
            timeout_secs,
            started_at: Instant::now(),
        }
    }

    /// Move to `phase`. Ignored once the attempt is terminal.
    pub fn enter(&mut self, phase: RolloutPhase) {
        if self.phase.is_terminal() {
            warn!(
                rollout = %self.rollout_id,
                current = ?self.phase,
                requested = ?phase,
                "ignoring phase change on finished rollout"
            );
            return;
        }
        debug!(rollout = %self.rollout_id, from = ?self.phase, to = ?phase, "phase change");
        self.phase = phase;
    }

    /// Restart the polling clock for a new phase.
    pub fn reset_clock(&mut self) {
        self.elapsed_secs = 0;
    }

    /// Account for one poll interval.
    pub fn tick(&mut self, secs: u64) {
        self.elapsed_secs += secs;
    }

    pub fn budget_exhausted(&self) -> bool {
        self.elapsed_secs >= self.timeout_secs
    }

    pub fn complete(&mut self) {
        self.enter(RolloutPhase::Completed);
        info!(
            rollout = %self.rollout_id,
            wall_secs = self.started_at.elapsed().as_secs(),
            "rollout completed"
        );
    }

    pub fn roll_back(&mut self) {
        self.enter(RolloutPhase::RolledBack);
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.enter(RolloutPhase::Failed {
            reason: reason.into(),
        });
    }

    /// Fail the attempt with `err` and hand the error back for propagation.
    ///
    /// Only the phase is logged here; the caller reports the error itself.
    pub fn abort(&mut self, err: RolloutError) -> RolloutError {
        warn!(rollout = %self.rollout_id, phase = ?self.phase, "rollout aborted");
        self.fail(err.to_string());
        err
    }
}
