//! `pd-world` — an in-memory grid environment.
//!
//! Implements [`EnvironmentGateway`](pd_executor::EnvironmentGateway) and
//! [`OccupancyProbe`](pd_executor::OccupancyProbe) over shared state so
//! agents can be run end-to-end without a game server.
//!
//! | Module      | Contents                                         |
//! |-------------|--------------------------------------------------|
//! | [`world`]   | `World`: parcels, agents, scoring, sensing       |
//! | [`gateway`] | `WorldGateway`: one agent's handle on the world  |
//! | [`config`]  | `WorldConfig`                                    |
//! | [`error`]   | `WorldError`, `WorldResult<T>`                   |
//!
//! Rules: one agent per tile; a move blocks for `movement_duration_ms` and
//! then fails if the target is blocked or occupied; `pickup` takes every
//! parcel on the tile; `putdown` on a delivery tile scores the carried
//! rewards, elsewhere it drops the parcels.  After every change each
//! agent is sent what lies inside its observation ranges.

pub mod config;
pub mod error;
pub mod gateway;
pub mod world;


pub use config::WorldConfig;
pub use error::{WorldError, WorldResult};
pub use gateway::WorldGateway;
pub use world::World;
