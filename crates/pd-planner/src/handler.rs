//! The handler planner: one routine per intention family, all routed with
//! the dynamic pathfinder so other agents count as obstacles.

use async_trait::async_trait;
use tracing::{debug, trace};

use pd_behavior::{Intention, RewardModel};
use pd_belief::BeliefStore;
use pd_core::{Action, Position, Role};
use pd_spatial::{route_to_actions, Obstacles, Route, Router, TileMap};

use crate::{Plan, PlanContext, PlanSource};

/// Plans every intention kind with an exhaustive `match`.
pub struct HandlerPlanner<R: Router> {
    router: R,
    model:  RewardModel,
}

impl<R: Router> HandlerPlanner<R> {
    pub fn new(router: R, model: RewardModel) -> Self {
        Self { router, model }
    }

    /// Synchronous core of [`PlanSource::plan_for`].
    pub fn plan(&self, intention: &Intention, beliefs: &BeliefStore, ctx: &PlanContext) -> Option<Plan> {
        let me  = beliefs.position()?;
        let map = beliefs.map()?;
        let obstacles = beliefs.obstacles();
        let env = Env { map, me, obstacles: &obstacles };

        let plan = match intention {
            Intention::Pickup { candidates }
            | Intention::ExplorerPickup { candidates }
            | Intention::CourierPickup { candidates } => {
                self.plan_pickup(intention, candidates, beliefs, &env, ctx)
            }
            Intention::Deliver | Intention::CourierDeliver => self.plan_deliver(intention, &env),
            Intention::ExplorerDeliver { midpoint } => {
                let route = self.route(&env, *midpoint)?;
                finish(intention.clone(), me, &route.tiles, Action::Putdown)
            }
            Intention::Move { target }
            | Intention::ExplorerMove { target }
            | Intention::CourierMove { target } => {
                let route = self.route(&env, *target)?;
                let actions = route.to_actions(me).ok()?;
                Some(Plan::new(intention.clone(), actions))
            }
        };
        match &plan {
            Some(p) => trace!(intention = %intention, actions = p.len(), "planned"),
            None    => debug!(intention = %intention, "no feasible plan"),
        }
        plan
    }

    fn route(&self, env: &Env<'_>, goal: Position) -> Option<Route> {
        self.router.find_path(env.map, env.me, goal, env.obstacles).ok()
    }

    /// Best candidate by normalized value of (decayed reward, route length).
    fn plan_pickup(
        &self,
        intention:  &Intention,
        candidates: &[pd_core::ParcelId],
        beliefs:    &BeliefStore,
        env:        &Env<'_>,
        ctx:        &PlanContext,
    ) -> Option<Plan> {
        let mut best: Option<(f64, Route)> = None;
        for id in candidates {
            let Some(parcel) = beliefs.parcel(id) else { continue };
            if parcel.is_carried() {
                continue;
            }
            let Some(route) = self.route(env, parcel.position) else { continue };
            let value = self.model.value(self.model.estimated(parcel, ctx.now), route.len() as u32);
            if best.as_ref().is_none_or(|(v, _)| value > *v) {
                best = Some((value, route));
            }
        }
        let (_, route) = best?;

        if beliefs.is_carrying() {
            // Deliver on the way if the route crosses a delivery tile first.
            let last = route.tiles.len().saturating_sub(1);
            if let Some(cut) = route.tiles[..last].iter().position(|&t| env.map.is_delivery(t)) {
                let deliver = match beliefs.role() {
                    Role::Courier => Intention::CourierDeliver,
                    Role::None | Role::Explorer => Intention::Deliver,
                };
                debug!(at = %route.tiles[cut], "opportunistic delivery on pickup route");
                return finish(deliver, env.me, &route.tiles[..=cut], Action::Putdown);
            }
        }
        finish(intention.clone(), env.me, &route.tiles, Action::Pickup)
    }

    /// Nearest delivery tile by route length.
    fn plan_deliver(&self, intention: &Intention, env: &Env<'_>) -> Option<Plan> {
        let route = env
            .map
            .delivery_tiles()
            .iter()
            .filter_map(|&t| self.route(env, t))
            .min_by_key(Route::len)?;
        finish(intention.clone(), env.me, &route.tiles, Action::Putdown)
    }
}

#[async_trait]
impl<R: Router> PlanSource for HandlerPlanner<R> {
    async fn plan_for(
        &self,
        intention: &Intention,
        beliefs:   &BeliefStore,
        ctx:       &PlanContext,
    ) -> Option<Plan> {
        self.plan(intention, beliefs, ctx)
    }
}

struct Env<'a> {
    map:       &'a TileMap,
    me:        Position,
    obstacles: &'a Obstacles,
}

/// Moves along `tiles`, then `last`.
fn finish(intention: Intention, start: Position, tiles: &[Position], last: Action) -> Option<Plan> {
    let mut actions = route_to_actions(start, tiles).ok()?;
    actions.push(last);
    Some(Plan::new(intention, actions))
}
