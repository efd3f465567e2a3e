//! Fact types held by the belief store and the sightings they are built from.
//!
//! Sightings are what the environment reports; facts are what the agent
//! keeps.  Agent positions arrive fractional while a move is in flight and
//! are snapped to a tile on the way in.

use serde::{Deserialize, Serialize};

use pd_core::{AgentId, ParcelId, Position, Timestamp};

// ── Sightings ─────────────────────────────────────────────────────────────────

/// The agent's own state as reported by the environment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelfState {
    pub id:    AgentId,
    pub name:  String,
    pub x:     f32,
    pub y:     f32,
    pub score: i64,
}

/// One parcel inside the observation range.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelSighting {
    pub id:         ParcelId,
    pub position:   Position,
    pub carried_by: Option<AgentId>,
    pub reward:     u32,
}

/// Another agent inside the observation range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentSighting {
    pub id:    AgentId,
    pub name:  String,
    pub x:     f32,
    pub y:     f32,
    pub score: i64,
}

// ── Facts ─────────────────────────────────────────────────────────────────────

/// A believed parcel.  `reward` is the value at `observed_at`; parcels that
/// left the observation range keep their last observation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parcel {
    pub id:          ParcelId,
    pub position:    Position,
    pub carried_by:  Option<AgentId>,
    pub reward:      u32,
    pub observed_at: Timestamp,
}

impl Parcel {
    pub fn from_sighting(s: &ParcelSighting, now: Timestamp) -> Self {
        Self {
            id:          s.id.clone(),
            position:    s.position,
            carried_by:  s.carried_by.clone(),
            reward:      s.reward,
            observed_at: now,
        }
    }

    #[inline]
    pub fn is_carried(&self) -> bool {
        self.carried_by.is_some()
    }

    #[inline]
    pub fn is_carried_by(&self, agent: &AgentId) -> bool {
        self.carried_by.as_ref() == Some(agent)
    }
}

/// Another agent as last observed.  Overwritten on every sensing event.
#[derive(Clone, Debug, PartialEq)]
pub struct OtherAgent {
    pub id:          AgentId,
    pub name:        String,
    pub position:    Position,
    pub score:       i64,
    pub observed_at: Timestamp,
}

/// An active explorer/courier pairing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Collaboration {
    pub partner:    AgentId,
    pub midpoint:   Position,
    pub started_at: Timestamp,
    /// Last successful delivery or hand-off; the timeout counts from here.
    pub last_progress: Timestamp,
}
