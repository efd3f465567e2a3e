//! Agent observer trait for progress reporting and data collection.

use pd_behavior::{DropReason, Intention};
use pd_core::{AgentId, Role, Timestamp};
use pd_executor::StepEvent;

/// Callbacks invoked by [`Agent::run`][crate::Agent::run] at key points of
/// the deliberation loop.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
///
/// # Example: delivery counter
///
/// ```rust,ignore
/// struct Deliveries(usize);
///
/// impl AgentObserver for Deliveries {
///     fn on_intention_dropped(&mut self, _: &AgentId, i: &Intention, r: DropReason, _: Timestamp) {
///         if r == DropReason::Achieved && i.kind().is_deliver_family() {
///             self.0 += 1;
///         }
///     }
/// }
/// ```
pub trait AgentObserver: Send {
    /// Called at the start of every deliberation tick.
    fn on_tick(&mut self, _agent: &AgentId, _now: Timestamp) {}

    /// Called once per executed action attempt, in execution order.
    fn on_step(&mut self, _agent: &AgentId, _event: &StepEvent, _now: Timestamp) {}

    fn on_intention_adopted(&mut self, _agent: &AgentId, _intention: &Intention, _now: Timestamp) {}

    fn on_intention_dropped(
        &mut self,
        _agent:     &AgentId,
        _intention: &Intention,
        _reason:    DropReason,
        _now:       Timestamp,
    ) {}

    fn on_role_changed(&mut self, _agent: &AgentId, _from: Role, _to: Role, _now: Timestamp) {}

    /// Called once when the loop exits.
    fn on_stop(&mut self, _agent: &AgentId, _now: Timestamp) {}
}

/// An [`AgentObserver`] that does nothing.
pub struct NoopObserver;

impl AgentObserver for NoopObserver {}
