//! Intentions: the goals an agent can commit to.

use std::fmt;

use pd_core::{IntentionKind, ParcelId, Position, Role};

/// A goal with the data needed to plan it.
///
/// Pickup variants carry their candidate parcels best first; the planner
/// chooses among them.  Move variants carry a target tile.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Intention {
    Pickup { candidates: Vec<ParcelId> },
    Deliver,
    Move { target: Position },
    ExplorerPickup { candidates: Vec<ParcelId> },
    /// Carry parcels to the midpoint and put them down for the courier.
    ExplorerDeliver { midpoint: Position },
    CourierPickup { candidates: Vec<ParcelId> },
    CourierDeliver,
    ExplorerMove { target: Position },
    /// Wait next to the midpoint for the explorer's hand-off.
    CourierMove { target: Position },
}

impl Intention {
    pub fn kind(&self) -> IntentionKind {
        match self {
            Intention::Pickup { .. }          => IntentionKind::Pickup,
            Intention::Deliver                => IntentionKind::Deliver,
            Intention::Move { .. }            => IntentionKind::Move,
            Intention::ExplorerPickup { .. }  => IntentionKind::ExplorerPickup,
            Intention::ExplorerDeliver { .. } => IntentionKind::ExplorerDeliver,
            Intention::CourierPickup { .. }   => IntentionKind::CourierPickup,
            Intention::CourierDeliver         => IntentionKind::CourierDeliver,
            Intention::ExplorerMove { .. }    => IntentionKind::ExplorerMove,
            Intention::CourierMove { .. }     => IntentionKind::CourierMove,
        }
    }

    /// The role-appropriate pickup over `candidates`.
    pub fn pickup(role: Role, candidates: Vec<ParcelId>) -> Intention {
        match role {
            Role::None     => Intention::Pickup { candidates },
            Role::Explorer => Intention::ExplorerPickup { candidates },
            Role::Courier  => Intention::CourierPickup { candidates },
        }
    }

    /// The role-appropriate move to `target`.
    pub fn move_to(role: Role, target: Position) -> Intention {
        match role {
            Role::None     => Intention::Move { target },
            Role::Explorer => Intention::ExplorerMove { target },
            Role::Courier  => Intention::CourierMove { target },
        }
    }

    /// Candidate parcels of a pickup; empty for every other kind.
    pub fn candidates(&self) -> &[ParcelId] {
        match self {
            Intention::Pickup { candidates }
            | Intention::ExplorerPickup { candidates }
            | Intention::CourierPickup { candidates } => candidates,
            _ => &[],
        }
    }

    /// Target tile of a move or of the explorer hand-off.
    pub fn target(&self) -> Option<Position> {
        match self {
            Intention::Move { target }
            | Intention::ExplorerMove { target }
            | Intention::CourierMove { target } => Some(*target),
            Intention::ExplorerDeliver { midpoint } => Some(*midpoint),
            _ => None,
        }
    }
}

impl fmt::Display for Intention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())?;
        if let Some(t) = self.target() {
            write!(f, "@{t}")?;
        }
        let c = self.candidates();
        if !c.is_empty() {
            write!(f, "[")?;
            for (i, id) in c.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{id}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}
