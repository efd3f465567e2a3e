use std::cmp::Reverse;

use pd_core::Position;
use pd_spatial::{MapIndex, TileMap};

/// Hand-off tile for agents standing at `a` and `b`.
///
/// Candidates are walkable, non-spawn tiles reachable from both.  The
/// winner minimises the combined distance, then the imbalance between the
/// two legs; remaining ties go to the tile farther from any spawn tile,
/// then to the smaller position so the choice is deterministic.
pub fn midpoint(map: &TileMap, index: &MapIndex, a: Position, b: Position) -> Option<Position> {
    map.walkable()
        .filter(|&t| !map.is_spawn(t))
        .filter_map(|t| {
            let da = index.distance(a, t)?;
            let db = index.distance(b, t)?;
            let spawn = index
                .nearest(t, map.spawn_tiles().iter().copied())
                .map_or(0, |(_, d)| d);
            Some(((da + db, da.abs_diff(db), Reverse(spawn), t), t))
        })
        .min_by_key(|(key, _)| *key)
        .map(|(_, t)| t)
}
