//! `pd-core` — foundational types for the parcel-courier agent framework.
//!
//! This crate is a dependency of every other `pd-*` crate.  It intentionally
//! has no `pd-*` dependencies.  `serde` derives are always on because
//! positions, ids and intention kinds travel inside teammate messages.
//!
//! # What lives here
//!
//! | Module        | Contents                                              |
//! |---------------|-------------------------------------------------------|
//! | [`ids`]       | `AgentId`, `ParcelId` (string), `TileId` (dense)      |
//! | [`position`]  | `Position`, `Direction`, Manhattan distance           |
//! | [`action`]    | `Action`: the atomic command vocabulary               |
//! | [`time`]      | `Timestamp` (milliseconds since agent start)          |
//! | [`rng`]       | `AgentRng` (per agent), `SimRng` (in-memory world)    |
//! | [`role`]      | `Role`, `IntentionKind`                               |
//! | [`config`]    | `AgentConfig`, `ConfigSource`, `JsonConfig`           |
//! | [`error`]     | `CoreError`, `CoreResult`                             |

pub mod action;
pub mod config;
pub mod error;
pub mod ids;
pub mod position;
pub mod rng;
pub mod role;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use action::Action;
pub use config::{AgentConfig, ConfigSource, JsonConfig, NormalizationKind};
pub use error::{CoreError, CoreResult};
pub use ids::{AgentId, ParcelId, TileId};
pub use position::{Direction, Position};
pub use rng::{AgentRng, SimRng};
pub use role::{IntentionKind, Role};
pub use time::Timestamp;
