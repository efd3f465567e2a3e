//! Routing trait and the default obstacle-aware A\* implementation.
//!
//! # Pluggability
//!
//! Planners call routing through the [`Router`] trait so applications can
//! swap in other search strategies without touching the planner.
//!
//! # Obstacles
//!
//! Obstacles are the instantaneous tile positions of other agents.  They are
//! hard: an obstacle tile is never expanded, so a goal occupied by another
//! agent is unreachable until it moves.  The start tile is never treated as
//! an obstacle.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use rustc_hash::FxHashMap;

use pd_core::{Action, Position};

use crate::{Obstacles, SpatialError, SpatialResult, TileMap};

// ── Route ─────────────────────────────────────────────────────────────────────

/// The result of a routing query: the tiles to step onto, in order.
///
/// The start tile is excluded and the goal is included, so `len()` is the
/// number of moves.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Route {
    pub tiles: Vec<Position>,
}

impl Route {
    /// Number of moves.
    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// `true` if start and goal coincide.
    #[inline]
    pub fn is_trivial(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Convert the route into move actions from `start`.
    pub fn to_actions(&self, start: Position) -> SpatialResult<Vec<Action>> {
        route_to_actions(start, &self.tiles)
    }
}

/// Translate a tile sequence into directional moves by comparing consecutive
/// tile deltas.  Every step must change exactly one coordinate by ±1.
pub fn route_to_actions(start: Position, tiles: &[Position]) -> SpatialResult<Vec<Action>> {
    let mut prev = start;
    tiles
        .iter()
        .map(|&next| {
            let dir = prev
                .direction_to(next)
                .ok_or(SpatialError::NonAdjacentStep { from: prev, to: next })?;
            prev = next;
            Ok(Action::Move(dir))
        })
        .collect()
}

// ── Router trait ──────────────────────────────────────────────────────────────

/// Pluggable single-query path search.
///
/// Implementations must be `Send + Sync` so one router can be shared by the
/// planner and the desire generator.
pub trait Router: Send + Sync {
    /// Compute a path from `start` to `goal` avoiding `obstacles`.
    ///
    /// `start == goal` yields an empty route.  Returns
    /// [`SpatialError::NoRoute`] if no obstacle-free path exists.
    fn find_path(
        &self,
        map:       &TileMap,
        start:     Position,
        goal:      Position,
        obstacles: &Obstacles,
    ) -> SpatialResult<Route>;
}

// ── Flood ─────────────────────────────────────────────────────────────────────

/// Live hop distance from `start` to every tile reachable around
/// `obstacles`, `start` included at 0.  Unlike the [`MapIndex`] this sees
/// other agents, so a tile behind one in a corridor is absent.
///
/// [`MapIndex`]: crate::MapIndex
pub fn flood(map: &TileMap, start: Position, obstacles: &Obstacles) -> FxHashMap<Position, u32> {
    let mut dist: FxHashMap<Position, u32> = FxHashMap::default();
    if !map.is_walkable(start) {
        return dist;
    }
    dist.insert(start, 0);
    let mut queue = VecDeque::from([start]);
    while let Some(cur) = queue.pop_front() {
        let d = dist[&cur] + 1;
        for nb in map.walkable_neighbors(cur) {
            if obstacles.contains(&nb) || dist.contains_key(&nb) {
                continue;
            }
            dist.insert(nb, d);
            queue.push_back(nb);
        }
    }
    dist
}

// ── AStarRouter ───────────────────────────────────────────────────────────────

/// A\* over the 4-connected tile grid with a Manhattan heuristic.
///
/// Unit move cost makes Manhattan distance admissible and consistent, so the
/// first time the goal is popped its cost is optimal.  Among equal f-scores
/// the entry with the smaller heuristic (closer to the goal) pops first; this
/// ordering is not part of the contract.
pub struct AStarRouter;

impl Router for AStarRouter {
    fn find_path(
        &self,
        map:       &TileMap,
        start:     Position,
        goal:      Position,
        obstacles: &Obstacles,
    ) -> SpatialResult<Route> {
        astar(map, start, goal, obstacles)
    }
}

fn astar(
    map:       &TileMap,
    start:     Position,
    goal:      Position,
    obstacles: &Obstacles,
) -> SpatialResult<Route> {
    if start == goal {
        return Ok(Route::default());
    }
    if !map.is_walkable(goal) || obstacles.contains(&goal) {
        return Err(SpatialError::NoRoute { from: start, to: goal });
    }

    // g[v] = best known cost; came_from[v] = predecessor on that path.
    let mut g: FxHashMap<Position, u32> = FxHashMap::default();
    let mut came_from: FxHashMap<Position, Position> = FxHashMap::default();

    // Min-heap on (f, h, position).  Reverse turns BinaryHeap into a min-heap.
    let mut open: BinaryHeap<Reverse<(u32, u32, Position)>> = BinaryHeap::new();
    g.insert(start, 0);
    open.push(Reverse((start.manhattan(goal), start.manhattan(goal), start)));

    while let Some(Reverse((f, h, cur))) = open.pop() {
        if cur == goal {
            return Ok(reconstruct(&came_from, start, goal));
        }

        let cur_g = g[&cur];
        // Skip stale heap entries.
        if f > cur_g + h {
            continue;
        }

        for nb in map.walkable_neighbors(cur) {
            if obstacles.contains(&nb) {
                continue;
            }
            let tentative = cur_g + 1;
            if g.get(&nb).is_none_or(|&old| tentative < old) {
                g.insert(nb, tentative);
                came_from.insert(nb, cur);
                let nh = nb.manhattan(goal);
                open.push(Reverse((tentative + nh, nh, nb)));
            }
        }
    }

    Err(SpatialError::NoRoute { from: start, to: goal })
}

fn reconstruct(
    came_from: &FxHashMap<Position, Position>,
    start:     Position,
    goal:      Position,
) -> Route {
    let mut tiles = vec![goal];
    let mut cur = goal;
    while let Some(&prev) = came_from.get(&cur) {
        if prev == start {
            break;
        }
        tiles.push(prev);
        cur = prev;
    }
    tiles.reverse();
    Route { tiles }
}
