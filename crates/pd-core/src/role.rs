//! Collaboration roles and the intention-kind tag.
//!
//! Both live here rather than in `pd-behavior` because they are beliefs
//! (`pd-belief`) and travel inside teammate messages (`pd-negotiation`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Transient collaboration role assigned by the negotiation handshake.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    None,
    /// Keeps foraging and hands parcels off at the midpoint.
    Explorer,
    /// Shuttles parcels from the midpoint to a delivery tile.
    Courier,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::None     => "none",
            Role::Explorer => "explorer",
            Role::Courier  => "courier",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data-free tag of an intention, shared with teammates via
/// `intention_update`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentionKind {
    Pickup,
    Deliver,
    Move,
    ExplorerPickup,
    ExplorerDeliver,
    CourierPickup,
    CourierDeliver,
    ExplorerMove,
    CourierMove,
}

impl IntentionKind {
    pub fn is_pickup_family(self) -> bool {
        matches!(
            self,
            IntentionKind::Pickup | IntentionKind::ExplorerPickup | IntentionKind::CourierPickup
        )
    }

    pub fn is_deliver_family(self) -> bool {
        matches!(
            self,
            IntentionKind::Deliver | IntentionKind::ExplorerDeliver | IntentionKind::CourierDeliver
        )
    }

    pub fn is_move_family(self) -> bool {
        matches!(
            self,
            IntentionKind::Move | IntentionKind::ExplorerMove | IntentionKind::CourierMove
        )
    }

    /// The role this kind belongs to; `Role::None` for the untagged kinds.
    pub fn role(self) -> Role {
        match self {
            IntentionKind::ExplorerPickup
            | IntentionKind::ExplorerDeliver
            | IntentionKind::ExplorerMove => Role::Explorer,
            IntentionKind::CourierPickup
            | IntentionKind::CourierDeliver
            | IntentionKind::CourierMove => Role::Courier,
            IntentionKind::Pickup | IntentionKind::Deliver | IntentionKind::Move => Role::None,
        }
    }

    #[inline]
    pub fn is_role_tagged(self) -> bool {
        self.role() != Role::None
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IntentionKind::Pickup          => "pickup",
            IntentionKind::Deliver         => "deliver",
            IntentionKind::Move            => "move",
            IntentionKind::ExplorerPickup  => "explorer_pickup",
            IntentionKind::ExplorerDeliver => "explorer_deliver",
            IntentionKind::CourierPickup   => "courier_pickup",
            IntentionKind::CourierDeliver  => "courier_deliver",
            IntentionKind::ExplorerMove    => "explorer_move",
            IntentionKind::CourierMove     => "courier_move",
        }
    }
}

impl fmt::Display for IntentionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
