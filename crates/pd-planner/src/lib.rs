//! `pd-planner` — turning one intention into an action sequence.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                      |
//! |-------------|---------------------------------------------------------------|
//! | [`plan`]    | `Plan`, `PlanContext`, `PlanSource` (async trait)             |
//! | [`handler`] | `HandlerPlanner<R: Router>`: per-family routing handlers      |
//! | [`pddl`]    | `PddlPlanner<S: Solver>`, `Solver`, problem serialisation     |
//! | [`error`]   | `PlannerError`, `PlannerResult<T>`                            |
//!
//! Both plan sources emit the same `Action` vocabulary and are
//! interchangeable behind `PlanSource`.

pub mod error;
pub mod handler;
pub mod pddl;
pub mod plan;


pub use error::{PlannerError, PlannerResult};
pub use handler::HandlerPlanner;
pub use pddl::{PddlPlanner, Solver, SolverStep};
pub use plan::{Plan, PlanContext, PlanSource};
