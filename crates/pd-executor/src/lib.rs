//! `pd-executor` — running plans against the live environment.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                        |
//! |--------------|-----------------------------------------------------------------|
//! | [`gateway`]  | `EnvironmentGateway`, `OccupancyProbe` (async traits), `Perception` |
//! | [`executor`] | `PlanExecutor`, `StepEvent`, `StepStatus`, `ExecutionOutcome`   |
//! | [`error`]    | `ExecutorError`, `ExecutorResult<T>`                            |
//!
//! # Execution model
//!
//! 1. The agent loop spawns `PlanExecutor::execute` on its own task with a
//!    child `CancellationToken`.
//! 2. Each action awaits the gateway; refused moves into an occupied tile
//!    are retried after a fixed backoff, up to `max_retries` times.
//! 3. Every attempt produces one `StepEvent` on an unbounded channel.
//! 4. The loop awaits the task's `JoinHandle` to learn the outcome.

pub mod error;
pub mod executor;
pub mod gateway;


pub use error::{ExecutorError, ExecutorResult};
pub use executor::{ExecutionOutcome, PlanExecutor, StepEvent, StepStatus};
pub use gateway::{EnvironmentGateway, OccupancyProbe, Perception};
