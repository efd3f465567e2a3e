//! Plan source backed by an external STRIPS solver.
//!
//! Beliefs are serialised into a PDDL problem over a fixed domain:
//!
//! | Fact                | Meaning                                   |
//! |---------------------|-------------------------------------------|
//! | `(tile t)`          | `t` is walkable                           |
//! | `(delivery t)`      | `t` is a delivery tile                    |
//! | `(blocked t)`       | another agent stands on `t`               |
//! | `(agent a)`, `(me a)` | agents; `me` marks the planning agent   |
//! | `(parcel p)`        | a believed, uncarried or self-carried parcel |
//! | `(at x t)`          | agent or parcel `x` is on `t`             |
//! | `(right t1 t2)` …   | `t2` is one step right of `t1` (also `left`, `up`, `down`) |
//! | `(carriedBy p a)`   | `a` carries `p`                           |
//!
//! The solver answers with named steps; only the vocabulary
//! `moveRight moveLeft moveUp moveDown pickup putdown` is understood.

use std::fmt::Write as _;

use async_trait::async_trait;
use tracing::{debug, warn};

use pd_behavior::Intention;
use pd_belief::BeliefStore;
use pd_core::{Action, Direction, ParcelId, Position};

use crate::{Plan, PlanContext, PlanSource, PlannerError, PlannerResult};

/// One step of a solver answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolverStep {
    pub action: String,
    pub args:   Vec<String>,
}

impl SolverStep {
    pub fn new(action: impl Into<String>, args: &[&str]) -> Self {
        Self { action: action.into(), args: args.iter().map(|s| s.to_string()).collect() }
    }
}

/// The external formal-planning collaborator.  Domain and problem are
/// opaque strings.
#[async_trait]
pub trait Solver: Send + Sync {
    async fn solve(&self, domain: &str, problem: &str) -> PlannerResult<Vec<SolverStep>>;
}

pub const DOMAIN: &str = "\
(define (domain courier)
  (:requirements :strips :negative-preconditions)
  (:predicates (tile ?t) (delivery ?t) (blocked ?t) (agent ?a) (me ?a) (parcel ?p)
               (at ?x ?t) (right ?t1 ?t2) (left ?t1 ?t2) (up ?t1 ?t2) (down ?t1 ?t2)
               (carriedBy ?p ?a))
  (:action moveRight :parameters (?me ?from ?to)
    :precondition (and (me ?me) (at ?me ?from) (right ?from ?to) (not (blocked ?to)))
    :effect (and (at ?me ?to) (not (at ?me ?from))))
  (:action moveLeft :parameters (?me ?from ?to)
    :precondition (and (me ?me) (at ?me ?from) (left ?from ?to) (not (blocked ?to)))
    :effect (and (at ?me ?to) (not (at ?me ?from))))
  (:action moveUp :parameters (?me ?from ?to)
    :precondition (and (me ?me) (at ?me ?from) (up ?from ?to) (not (blocked ?to)))
    :effect (and (at ?me ?to) (not (at ?me ?from))))
  (:action moveDown :parameters (?me ?from ?to)
    :precondition (and (me ?me) (at ?me ?from) (down ?from ?to) (not (blocked ?to)))
    :effect (and (at ?me ?to) (not (at ?me ?from))))
  (:action pickup :parameters (?me ?p ?t)
    :precondition (and (me ?me) (parcel ?p) (at ?me ?t) (at ?p ?t))
    :effect (and (carriedBy ?p ?me) (not (at ?p ?t))))
  (:action putdown :parameters (?me ?p ?t)
    :precondition (and (me ?me) (at ?me ?t) (carriedBy ?p ?me))
    :effect (and (at ?p ?t) (not (carriedBy ?p ?me)))))
";

// ── Problem serialisation ─────────────────────────────────────────────────────

fn tile(p: Position) -> String {
    format!("t_{}_{}", p.x, p.y)
}

/// PDDL object name for an environment id.  Anything but ASCII letters and
/// digits is written as `_<hex>_`, so distinct ids never share a name.
fn object(prefix: &str, raw: &str) -> String {
    let mut out = format!("{prefix}_");
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else {
            let _ = write!(out, "_{:x}_", c as u32);
        }
    }
    out
}

/// Serialise the beliefs with `goal` as the goal formula.  `None` if the
/// agent has no position or map yet.
pub fn problem(beliefs: &BeliefStore, goal: &str) -> Option<String> {
    let me  = beliefs.position()?;
    let map = beliefs.map()?;
    let me_obj = object("a", beliefs.id().as_str());

    let mut objects = vec![me_obj.clone()];
    let mut init = vec![format!("(agent {me_obj})"), format!("(me {me_obj})"), format!("(at {me_obj} {})", tile(me))];

    for t in map.walkable() {
        objects.push(tile(t));
        init.push(format!("(tile {})", tile(t)));
        if map.is_delivery(t) {
            init.push(format!("(delivery {})", tile(t)));
        }
        for dir in Direction::ALL {
            let n = t.step(dir);
            if map.is_walkable(n) {
                let pred = match dir {
                    Direction::Right => "right",
                    Direction::Left  => "left",
                    Direction::Up    => "up",
                    Direction::Down  => "down",
                };
                init.push(format!("({pred} {} {})", tile(t), tile(n)));
            }
        }
    }
    for t in beliefs.obstacles() {
        if map.is_walkable(t) {
            init.push(format!("(blocked {})", tile(t)));
        }
    }
    for p in beliefs.parcels() {
        let obj = object("p", p.id.as_str());
        if p.is_carried_by(beliefs.id()) {
            init.push(format!("(carriedBy {obj} {me_obj})"));
        } else if p.is_carried() {
            continue;
        } else {
            init.push(format!("(at {obj} {})", tile(p.position)));
        }
        init.push(format!("(parcel {obj})"));
        objects.push(obj);
    }

    let mut out = String::new();
    let _ = writeln!(out, "(define (problem courier-{})", tile(me));
    let _ = writeln!(out, "  (:domain courier)");
    let _ = writeln!(out, "  (:objects {})", objects.join(" "));
    let _ = writeln!(out, "  (:init {})", init.join(" "));
    let _ = writeln!(out, "  (:goal {goal}))");
    Some(out)
}

/// Goal formula for `intention`, or `None` if nothing is left to achieve.
pub fn goal_for(intention: &Intention, beliefs: &BeliefStore) -> Option<String> {
    let me = beliefs.position()?;
    let carried_at = |t: Position| -> Option<String> {
        let facts: Vec<String> = beliefs
            .carried()
            .map(|p| format!("(at {} {})", object("p", p.id.as_str()), tile(t)))
            .collect();
        (!facts.is_empty()).then(|| format!("(and {})", facts.join(" ")))
    };
    match intention {
        Intention::Pickup { candidates }
        | Intention::ExplorerPickup { candidates }
        | Intention::CourierPickup { candidates } => {
            let id: &ParcelId = candidates
                .iter()
                .find(|id| beliefs.parcel(id).is_some_and(|p| !p.is_carried()))?;
            Some(format!(
                "(carriedBy {} {})",
                object("p", id.as_str()),
                object("a", beliefs.id().as_str())
            ))
        }
        Intention::Deliver | Intention::CourierDeliver => {
            let (target, _) = beliefs
                .index()?
                .nearest(me, beliefs.map()?.delivery_tiles().iter().copied())?;
            carried_at(target)
        }
        Intention::ExplorerDeliver { midpoint } => carried_at(*midpoint),
        Intention::Move { target }
        | Intention::ExplorerMove { target }
        | Intention::CourierMove { target } => Some(format!(
            "(at {} {})",
            object("a", beliefs.id().as_str()),
            tile(*target)
        )),
    }
}

/// Translate solver steps into actions.  Consecutive `pickup`/`putdown`
/// steps collapse into one action, since the environment handles every
/// parcel on the tile at once.
pub fn steps_to_actions(steps: &[SolverStep]) -> PlannerResult<Vec<Action>> {
    let mut out: Vec<Action> = Vec::with_capacity(steps.len());
    for step in steps {
        let action = match step.action.to_ascii_lowercase().as_str() {
            "moveright" => Action::Move(Direction::Right),
            "moveleft"  => Action::Move(Direction::Left),
            "moveup"    => Action::Move(Direction::Up),
            "movedown"  => Action::Move(Direction::Down),
            "pickup"    => Action::Pickup,
            "putdown"   => Action::Putdown,
            _ => return Err(PlannerError::UnknownStep(step.action.clone())),
        };
        if !action.is_move() && out.last() == Some(&action) {
            continue;
        }
        out.push(action);
    }
    Ok(out)
}

// ── PddlPlanner ───────────────────────────────────────────────────────────────

pub struct PddlPlanner<S: Solver> {
    solver: S,
}

impl<S: Solver> PddlPlanner<S> {
    pub fn new(solver: S) -> Self {
        Self { solver }
    }
}

#[async_trait]
impl<S: Solver> PlanSource for PddlPlanner<S> {
    async fn plan_for(
        &self,
        intention: &Intention,
        beliefs:   &BeliefStore,
        _ctx:      &PlanContext,
    ) -> Option<Plan> {
        let goal    = goal_for(intention, beliefs)?;
        let problem = problem(beliefs, &goal)?;
        let steps = match self.solver.solve(DOMAIN, &problem).await {
            Ok(steps) => steps,
            Err(e) => {
                warn!(intention = %intention, error = %e, "solver failed");
                return None;
            }
        };
        match steps_to_actions(&steps) {
            Ok(actions) => Some(Plan::new(intention.clone(), actions)),
            Err(e) => {
                debug!(intention = %intention, error = %e, "solver answer rejected");
                None
            }
        }
    }
}
