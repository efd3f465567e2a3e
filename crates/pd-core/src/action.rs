//! The atomic action vocabulary shared by planners and the executor.
//!
//! Every plan source (the handler planner and the external-solver adapter)
//! must emit exactly these variants.

use crate::Direction;

/// One primitive command executable against the environment.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Action {
    /// Step one tile in a direction.
    Move(Direction),
    /// Pick up every parcel on the current tile.
    Pickup,
    /// Put down every carried parcel on the current tile.
    Putdown,
    /// Do nothing for one step.
    Wait,
}

impl Action {
    /// `true` for directional moves: the only retryable actions.
    #[inline]
    pub fn is_move(self) -> bool {
        matches!(self, Action::Move(_))
    }

    /// Human-readable label, used in log fields and trace rows.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Move(d) => match d {
                crate::Direction::Up    => "move_up",
                crate::Direction::Down  => "move_down",
                crate::Direction::Left  => "move_left",
                crate::Direction::Right => "move_right",
            },
            Action::Pickup  => "pickup",
            Action::Putdown => "putdown",
            Action::Wait    => "wait",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
