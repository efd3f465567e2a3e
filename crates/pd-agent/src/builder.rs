//! Fluent builder for constructing an [`Agent`].

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use pd_behavior::{DesireModel, RewardDrivenDesires, RewardModel};
use pd_core::{AgentConfig, AgentId};
use pd_executor::{EnvironmentGateway, OccupancyProbe};
use pd_planner::{HandlerPlanner, PlanSource};
use pd_spatial::AStarRouter;

use crate::{Agent, AgentError, AgentResult};

/// Fluent builder for [`Agent<D, P>`].
///
/// # Required inputs
///
/// - `AgentId`: the identity the environment assigned
/// - [`AgentConfig`]: read once from the configuration source
/// - `D: DesireModel`, `P: PlanSource`
/// - the gateway and occupancy probe of the environment
///
/// # Optional inputs (have defaults)
///
/// | Method            | Default                       |
/// |-------------------|-------------------------------|
/// | `.teammates(v)`   | none (no negotiation traffic) |
/// | `.shutdown(t)`    | a fresh `CancellationToken`   |
///
/// # Example
///
/// ```rust,ignore
/// let agent = AgentBuilder::standard(id, config, gateway.clone(), gateway)
///     .teammates([mate])
///     .shutdown(token.child_token())
///     .build()?;
/// agent.run(perceptions, &mut NoopObserver).await;
/// ```
pub struct AgentBuilder<D: DesireModel, P: PlanSource> {
    id:        AgentId,
    config:    AgentConfig,
    desires:   D,
    planner:   P,
    gateway:   Arc<dyn EnvironmentGateway>,
    probe:     Arc<dyn OccupancyProbe>,
    teammates: Vec<AgentId>,
    shutdown:  Option<CancellationToken>,
}

impl AgentBuilder<RewardDrivenDesires, HandlerPlanner<AStarRouter>> {
    /// Builder with reward-driven desires and the A* handler planner.
    pub fn standard(
        id:      AgentId,
        config:  AgentConfig,
        gateway: Arc<dyn EnvironmentGateway>,
        probe:   Arc<dyn OccupancyProbe>,
    ) -> Self {
        let model = RewardModel::from_config(&config);
        Self::new(
            id,
            config,
            RewardDrivenDesires::new(model),
            HandlerPlanner::new(AStarRouter, model),
            gateway,
            probe,
        )
    }
}

impl<D: DesireModel, P: PlanSource> AgentBuilder<D, P> {
    pub fn new(
        id:      AgentId,
        config:  AgentConfig,
        desires: D,
        planner: P,
        gateway: Arc<dyn EnvironmentGateway>,
        probe:   Arc<dyn OccupancyProbe>,
    ) -> Self {
        Self {
            id,
            config,
            desires,
            planner,
            gateway,
            probe,
            teammates: Vec::new(),
            shutdown:  None,
        }
    }

    /// Declare the teammates messages are exchanged with.
    pub fn teammates<I: IntoIterator<Item = AgentId>>(mut self, teammates: I) -> Self {
        self.teammates = teammates.into_iter().collect();
        self
    }

    /// Token whose cancellation stops the loop.
    pub fn shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    /// Validate inputs and return a ready-to-run [`Agent`].
    pub fn build(self) -> AgentResult<Agent<D, P>> {
        if self.id.as_str().trim().is_empty() {
            return Err(AgentError::Identity(self.id.as_str().to_string()));
        }
        self.config.validate()?;

        let mut seen = BTreeSet::new();
        for t in &self.teammates {
            if *t == self.id {
                return Err(AgentError::Teammate { id: t.clone(), reason: "agent cannot be its own teammate" });
            }
            if t.as_str().trim().is_empty() {
                return Err(AgentError::Teammate { id: t.clone(), reason: "empty id" });
            }
            if !seen.insert(t) {
                return Err(AgentError::Teammate { id: t.clone(), reason: "declared twice" });
            }
        }

        Ok(Agent::new(
            self.id,
            Arc::new(self.config),
            self.teammates,
            self.desires,
            self.planner,
            self.gateway,
            self.probe,
            self.shutdown.unwrap_or_default(),
        ))
    }
}
