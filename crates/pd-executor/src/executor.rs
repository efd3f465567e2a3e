//! `PlanExecutor`: runs one plan against the gateway.
//!
//! # Per-action state machine
//!
//! ```text
//! pending ─┬─ ok ────────────────────────────► next action
//!          ├─ refused move, tile occupied ─► retrying ─(backoff)─► pending
//!          │                                 (at most max_retries times)
//!          └─ any other refusal, or retries exhausted ─► failed (plan aborts)
//! ```
//!
//! Cancellation is cooperative: the token is checked before every attempt
//! and raced against every backoff sleep, never mid-action.  One
//! [`StepEvent`] is sent per attempt on an unbounded channel, so producing
//! events never blocks.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use pd_core::{Action, AgentConfig, Position};
use pd_planner::Plan;

use crate::{EnvironmentGateway, ExecutorError, ExecutorResult, OccupancyProbe};

// ── Events ────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum StepStatus {
    Ok,
    Retrying,
    Failed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StepStatus::Ok       => "ok",
            StepStatus::Retrying => "retrying",
            StepStatus::Failed   => "failed",
        })
    }
}

/// Outcome of one action attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepEvent {
    /// Index of the action within the plan.
    pub index:    usize,
    pub action:   Action,
    /// 0 for the first try, `n` for the n-th retry.  A `Retrying` event
    /// reports the attempt that was refused.
    pub attempt:  u32,
    pub status:   StepStatus,
    /// Believed position after the attempt.
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Completed { position: Position },
    /// Stopped at a check point; `executed` actions had succeeded.
    Cancelled { position: Position, executed: usize },
}

// ── PlanExecutor ──────────────────────────────────────────────────────────────

pub struct PlanExecutor {
    gateway:       Arc<dyn EnvironmentGateway>,
    probe:         Arc<dyn OccupancyProbe>,
    max_retries:   u32,
    backoff:       Duration,
    wait_duration: Duration,
}

impl PlanExecutor {
    pub fn new(
        gateway: Arc<dyn EnvironmentGateway>,
        probe:   Arc<dyn OccupancyProbe>,
        config:  &AgentConfig,
    ) -> Self {
        Self {
            gateway,
            probe,
            max_retries:   config.max_retries,
            backoff:       config.retry_backoff(),
            wait_duration: Duration::from_millis(config.movement_duration_ms),
        }
    }

    /// Run `plan` from `start`.
    ///
    /// Returns `Ok(Completed)` when every action succeeded, `Ok(Cancelled)`
    /// when `cancel` fired at a check point, and an error when an action
    /// failed for good.
    pub async fn execute(
        &self,
        plan:   Plan,
        start:  Position,
        cancel: &CancellationToken,
        events: &UnboundedSender<StepEvent>,
    ) -> ExecutorResult<ExecutionOutcome> {
        let mut position = start;
        for (index, action) in plan.actions.into_iter().enumerate() {
            let mut attempt = 0;
            loop {
                if cancel.is_cancelled() {
                    debug!(index, action = %action, "plan cancelled");
                    return Ok(ExecutionOutcome::Cancelled { position, executed: index });
                }

                let emit = |status, position| {
                    // A closed receiver only means nobody is listening.
                    let _ = events.send(StepEvent { index, action, attempt, status, position });
                };

                if self.perform(action, cancel).await {
                    if let Action::Move(dir) = action {
                        position = position.step(dir);
                    }
                    emit(StepStatus::Ok, position);
                    break;
                }

                let blocked = match action {
                    Action::Move(dir) => self.probe.is_occupied(position.step(dir)).await,
                    _ => false,
                };
                if !blocked {
                    emit(StepStatus::Failed, position);
                    warn!(index, action = %action, "action refused");
                    return Err(ExecutorError::ActionFailed { action, index });
                }
                if attempt >= self.max_retries {
                    emit(StepStatus::Failed, position);
                    warn!(index, action = %action, attempts = attempt + 1, "blocked move, retries exhausted");
                    return Err(ExecutorError::RetriesExhausted { action, attempts: attempt + 1 });
                }

                emit(StepStatus::Retrying, position);
                attempt += 1;
                debug!(index, action = %action, attempt, "blocked move, backing off");
                tokio::select! {
                    _ = tokio::time::sleep(self.backoff) => {}
                    _ = cancel.cancelled() => {
                        return Ok(ExecutionOutcome::Cancelled { position, executed: index });
                    }
                }
            }
        }
        Ok(ExecutionOutcome::Completed { position })
    }

    async fn perform(&self, action: Action, cancel: &CancellationToken) -> bool {
        match action {
            Action::Move(dir) => self.gateway.move_to(dir).await,
            Action::Pickup    => self.gateway.pickup().await,
            Action::Putdown   => self.gateway.putdown().await,
            Action::Wait => {
                tokio::select! {
                    _ = tokio::time::sleep(self.wait_duration) => {}
                    _ = cancel.cancelled() => {}
                }
                true
            }
        }
    }
}
