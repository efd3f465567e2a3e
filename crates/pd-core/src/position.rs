//! Integer grid coordinates and the four movement directions.
//!
//! The grid uses a mathematical orientation: `Up` increases `y`, `Right`
//! increases `x`.  Movement is 4-connected with uniform cost, so Manhattan
//! distance is both admissible and consistent as an A\* heuristic.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A grid cell coordinate.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
#[derive(Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan (L1) distance in grid steps.
    #[inline]
    pub fn manhattan(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// The cell one step away in `dir`.
    #[inline]
    pub fn step(self, dir: Direction) -> Position {
        let (dx, dy) = dir.delta();
        Position::new(self.x + dx, self.y + dy)
    }

    /// The four orthogonal neighbours, in `Direction::ALL` order.
    #[inline]
    pub fn neighbors(self) -> [Position; 4] {
        Direction::ALL.map(|d| self.step(d))
    }

    /// Direction of a single orthogonal step from `self` to `to`, or `None`
    /// if the two cells are not 4-adjacent.
    pub fn direction_to(self, to: Position) -> Option<Direction> {
        match (to.x - self.x, to.y - self.y) {
            (1, 0)  => Some(Direction::Right),
            (-1, 0) => Some(Direction::Left),
            (0, 1)  => Some(Direction::Up),
            (0, -1) => Some(Direction::Down),
            _       => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the four grid movement directions.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// `(dx, dy)` of one step.
    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up    => (0, 1),
            Direction::Down  => (0, -1),
            Direction::Left  => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up    => "up",
            Direction::Down  => "down",
            Direction::Left  => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
