//! The boundary to the live environment.
//!
//! The transport behind it (socket session, in-memory world, …) is not this
//! crate's concern; the core depends only on these request/response
//! semantics and on the [`Perception`] stream.

use async_trait::async_trait;

use pd_belief::{AgentSighting, ParcelSighting, SelfState};
use pd_core::{AgentId, Direction, Position};
use pd_spatial::Tile;

/// Request/response operations of the environment.
#[async_trait]
pub trait EnvironmentGateway: Send + Sync {
    /// Step one tile; `false` if the move was refused.
    async fn move_to(&self, dir: Direction) -> bool;

    /// Pick up every parcel on the current tile; `false` if there was none.
    async fn pickup(&self) -> bool;

    /// Put down every carried parcel; `false` if nothing was carried.
    async fn putdown(&self) -> bool;

    /// Send `payload` to one teammate.  Best effort: delivery is not
    /// acknowledged beyond the call returning.
    async fn say(&self, to: &AgentId, payload: String);
}

/// One sensing event pushed by the environment.
#[derive(Clone, Debug)]
pub enum Perception {
    SelfState(SelfState),
    Parcels(Vec<ParcelSighting>),
    Agents(Vec<AgentSighting>),
    /// The mission map, sent once.
    Map(Vec<Tile>),
    /// A raw teammate message.
    Message { from: AgentId, payload: String },
}

/// Answers "is this tile occupied by another agent right now?", which is
/// what makes a refused move retryable.
#[async_trait]
pub trait OccupancyProbe: Send + Sync {
    async fn is_occupied(&self, pos: Position) -> bool;
}
