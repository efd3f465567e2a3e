//! `Plan` and the `PlanSource` seam.

use std::collections::VecDeque;

use async_trait::async_trait;

use pd_behavior::Intention;
use pd_belief::BeliefStore;
use pd_core::{Action, Timestamp};

/// An ordered action sequence and the intention it realises.
///
/// The intention may differ from the one requested: a pickup plan that
/// crosses a delivery tile while carrying comes back as a delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    pub intention: Intention,
    pub actions:   VecDeque<Action>,
}

impl Plan {
    pub fn new(intention: Intention, actions: impl IntoIterator<Item = Action>) -> Self {
        Self { intention, actions: actions.into_iter().collect() }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn move_count(&self) -> usize {
        self.actions.iter().filter(|a| a.is_move()).count()
    }
}

/// Per-call inputs that are not beliefs.
#[derive(Copy, Clone, Debug)]
pub struct PlanContext {
    pub now: Timestamp,
}

/// Anything that turns an intention into a plan.
///
/// `None` means "no feasible plan now"; the caller tries its next desire.
/// An empty plan means the intention is already satisfied.
#[async_trait]
pub trait PlanSource: Send + Sync {
    async fn plan_for(
        &self,
        intention: &Intention,
        beliefs:   &BeliefStore,
        ctx:       &PlanContext,
    ) -> Option<Plan>;
}
