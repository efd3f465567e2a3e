//! Desire generation: the ranked list of goals the agent could pursue now.
//!
//! # Order
//!
//! 1. Carrying: additional pickups with positive detour gain, then the
//!    role's delivery.
//! 2. Not carrying: parcels on the agent's own tile, then the role's pickup
//!    over the remaining candidates.
//! 3. Always last: moves, exploring the stalest nearby tile first, then a
//!    delivery/spawn tile far enough away.
//!
//! Parcels are ranked by static index distance.  Move targets are limited
//! to tiles reachable around the agents currently believed in the way, so a
//! teammate blocking a corridor never leaves the agent without a plannable
//! desire while open tiles remain on its side.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;

use pd_belief::{BeliefStore, Parcel};
use pd_core::{ParcelId, Position, Role, Timestamp};
use pd_spatial::flood;

use crate::{Intention, RewardModel};

/// Per-call inputs that are not beliefs.
#[derive(Copy, Clone, Debug)]
pub struct DeliberationContext {
    pub now: Timestamp,
}

/// Pluggable desire generation.
pub trait DesireModel: Send + Sync {
    /// Candidate intentions, most preferred first.  Empty when the agent
    /// lacks a position or a map.
    fn generate(&self, beliefs: &BeliefStore, ctx: &DeliberationContext) -> Vec<Intention>;
}

// ── Candidate filtering ───────────────────────────────────────────────────────

/// Parcels the agent may pick up in its current role: not carried, not
/// booked by a teammate, still worth something and reachable.  Explorers
/// skip parcels near the midpoint, which belong to the courier.
pub fn pickup_candidates<'a>(
    beliefs: &'a BeliefStore,
    model:   &'a RewardModel,
    now:     Timestamp,
) -> impl Iterator<Item = &'a Parcel> + 'a {
    let me = beliefs.position();
    let exclusion = match (beliefs.role(), beliefs.midpoint()) {
        (Role::Explorer, Some(m)) => Some((m, beliefs.config().midpoint_exclusion_radius)),
        _ => None,
    };
    beliefs.pickupable().filter(move |p| {
        model.estimated(p, now) > 0
            && me.is_some_and(|me| beliefs.distance(me, p.position).is_some())
            && !exclusion.is_some_and(|(m, r)| m.manhattan(p.position) <= r)
    })
}

// ── RewardDrivenDesires ───────────────────────────────────────────────────────

/// The default desire model.
pub struct RewardDrivenDesires {
    model: RewardModel,
}

impl RewardDrivenDesires {
    pub fn new(model: RewardModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &RewardModel {
        &self.model
    }

    /// Where carried parcels go in the current role.
    fn drop_targets(beliefs: &BeliefStore) -> Vec<Position> {
        match (beliefs.role(), beliefs.midpoint()) {
            (Role::Explorer, Some(m)) => vec![m],
            _ => beliefs.map().map_or_else(Vec::new, |m| m.delivery_tiles().to_vec()),
        }
    }

    fn nearest_drop(beliefs: &BeliefStore, from: Position, targets: &[Position]) -> Option<u32> {
        beliefs.index()?.nearest(from, targets.iter().copied()).map(|(_, d)| d)
    }

    /// Positive-gain detour pickups, best first.
    fn additional_pickups(&self, beliefs: &BeliefStore, me: Position, now: Timestamp) -> Vec<ParcelId> {
        let targets = Self::drop_targets(beliefs);
        let Some(base_distance) = Self::nearest_drop(beliefs, me, &targets) else {
            return vec![];
        };
        let carried: Vec<u32> = beliefs.carried().map(|p| self.model.estimated(p, now)).collect();

        let mut gains: Vec<(f64, &ParcelId)> = pickup_candidates(beliefs, &self.model, now)
            .filter_map(|p| {
                let to_parcel = beliefs.distance(me, p.position)?;
                let onward    = Self::nearest_drop(beliefs, p.position, &targets)?;
                let gain = self.model.additional_pickup_gain(
                    &carried,
                    base_distance,
                    self.model.estimated(p, now),
                    to_parcel + onward,
                );
                (gain > 0.0).then_some((gain, &p.id))
            })
            .collect();
        gains.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        gains.into_iter().map(|(_, id)| id.clone()).collect()
    }

    fn deliver(beliefs: &BeliefStore) -> Intention {
        match (beliefs.role(), beliefs.midpoint()) {
            (Role::Explorer, Some(midpoint)) => Intention::ExplorerDeliver { midpoint },
            (Role::Courier, _) => Intention::CourierDeliver,
            _ => Intention::Deliver,
        }
    }

    /// Candidates split into "on my tile" and "elsewhere", each best first.
    fn pickups(&self, beliefs: &BeliefStore, me: Position, now: Timestamp) -> (Vec<ParcelId>, Vec<ParcelId>) {
        let mut ranked: Vec<(f64, &Parcel)> = pickup_candidates(beliefs, &self.model, now)
            .filter_map(|p| {
                let d = beliefs.distance(me, p.position)?;
                Some((self.model.value(self.model.estimated(p, now), d), p))
            })
            .collect();
        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        let mut here  = Vec::new();
        let mut there = Vec::new();
        for (_, p) in ranked {
            if p.position == me {
                here.push(p.id.clone());
            } else {
                there.push(p.id.clone());
            }
        }
        (here, there)
    }

    /// The tile maximising `staleness / (distance + 1)` among live-reachable
    /// tiles outside the observation range and within the lookahead.
    fn explore_target(beliefs: &BeliefStore, reach: &Reach, now: Timestamp) -> Option<Position> {
        let lookahead = beliefs.config().explore_lookahead;
        let mut best: Option<(f64, u32, Position)> = None;
        for (&t, &d) in reach {
            if d == 0 || d > lookahead || beliefs.in_parcel_range(t) {
                continue;
            }
            let staleness = beliefs
                .last_seen(t)
                .map_or(f64::INFINITY, |seen| now.since(seen) as f64);
            let score = staleness / (d as f64 + 1.0);
            // Ties go to the nearer tile, then row-major order, so the
            // choice does not depend on hash iteration order.
            let better = match best {
                None => true,
                Some((s, bd, bt)) => score > s || (score == s && (d, t.y, t.x) < (bd, bt.y, bt.x)),
            };
            if better {
                best = Some((score, d, t));
            }
        }
        best.map(|(_, _, t)| t)
    }

    /// Nearest delivery or spawn tile at least `min_fallback_distance` away.
    fn fallback_target(beliefs: &BeliefStore, reach: &Reach) -> Option<Position> {
        let map = beliefs.map()?;
        let min = beliefs.config().min_fallback_distance;
        map.delivery_tiles()
            .iter()
            .chain(map.spawn_tiles())
            .filter_map(|&t| reach.get(&t).map(|&d| (d, t)))
            .filter(|&(d, _)| d >= min)
            .min_by_key(|&(d, _)| d)
            .map(|(_, t)| t)
    }

    /// Walkable neighbour of the midpoint closest to `me`.
    fn courier_post(beliefs: &BeliefStore, reach: &Reach, midpoint: Position) -> Option<Position> {
        let map = beliefs.map()?;
        map.walkable_neighbors(midpoint)
            .filter_map(|n| reach.get(&n).map(|&d| (d, n)))
            .min_by_key(|&(d, _)| d)
            .map(|(_, n)| n)
    }

    /// Move desires, best first, all reachable around current obstacles.
    /// A courier with a reachable post only ever heads there and waits.
    fn moves(beliefs: &BeliefStore, me: Position, now: Timestamp) -> Vec<Intention> {
        let Some(map) = beliefs.map() else { return vec![] };
        let reach = flood(map, me, &beliefs.obstacles());
        let role = beliefs.role();

        if let (Role::Courier, Some(m)) = (role, beliefs.midpoint()) {
            if let Some(post) = Self::courier_post(beliefs, &reach, m) {
                return vec![Intention::CourierMove { target: post }];
            }
        }
        let mut out: Vec<Intention> = Vec::with_capacity(2);
        let targets = Self::explore_target(beliefs, &reach, now)
            .into_iter()
            .chain(Self::fallback_target(beliefs, &reach));
        for t in targets {
            let mv = Intention::move_to(role, t);
            if !out.contains(&mv) {
                out.push(mv);
            }
        }
        out
    }
}

/// Live hop distances from the agent's tile.
type Reach = FxHashMap<Position, u32>;

impl DesireModel for RewardDrivenDesires {
    fn generate(&self, beliefs: &BeliefStore, ctx: &DeliberationContext) -> Vec<Intention> {
        let (Some(me), Some(_)) = (beliefs.position(), beliefs.index()) else {
            return vec![];
        };
        let role = beliefs.role();
        let mut out = Vec::new();

        if beliefs.is_carrying() {
            let extra = self.additional_pickups(beliefs, me, ctx.now);
            if !extra.is_empty() {
                out.push(Intention::pickup(role, extra));
            }
            out.push(Self::deliver(beliefs));
        } else {
            let (here, there) = self.pickups(beliefs, me, ctx.now);
            if !here.is_empty() {
                out.push(Intention::pickup(role, here));
            }
            if !there.is_empty() {
                out.push(Intention::pickup(role, there));
            }
        }

        out.extend(Self::moves(beliefs, me, ctx.now));
        out
    }
}
