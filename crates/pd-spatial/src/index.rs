//! All-pairs shortest paths over the static tile map.
//!
//! # Algorithm
//!
//! Floyd–Warshall over the 4-connected graph of walkable tiles:
//!
//! ```text
//! for k: for i: for j:
//!     dist[i][j] = min(dist[i][j], dist[i][k] + dist[k][j])
//! ```
//!
//! Paths are carried incrementally in a successor matrix: whenever the route
//! through `k` wins, `next[i][j]` becomes `next[i][k]`, i.e. the best-known
//! `i → k` sub-path is concatenated with `k → j`.  [`MapIndex::path`] walks
//! the successor chain, so every pair has a materialised path without storing
//! O(N³) tiles.  Ties keep the earlier (k, i, j) winner.
//!
//! # Layout
//!
//! Only walkable tiles get a matrix slot; blocked cells map to `NO_SLOT` and
//! are unreachable from everything.  Distances are integer hop counts with
//! `u32::MAX` as ∞.  Building is O(T³) in the walkable tile count and happens
//! once per map; afterwards the index is read-only and shared behind an `Arc`.

use pd_core::Position;

use crate::TileMap;

const INF: u32 = u32::MAX;
const NO_SLOT: u32 = u32::MAX;

/// Precomputed distances and shortest paths between every pair of tiles.
pub struct MapIndex {
    width:  u32,
    height: u32,
    /// `TileId` → matrix slot (`NO_SLOT` for blocked cells).
    slot_of: Vec<u32>,
    /// Matrix slot → position.
    pos_of: Vec<Position>,
    /// Row-major `n × n` hop counts.
    dist: Vec<u32>,
    /// Row-major `n × n` successor slots (`NO_SLOT` when unreachable).
    next: Vec<u32>,
}

impl MapIndex {
    /// Run Floyd–Warshall over `map`.  An empty map yields an empty index.
    pub fn build(map: &TileMap) -> MapIndex {
        let mut slot_of = vec![NO_SLOT; map.cell_count()];
        let mut pos_of  = Vec::new();
        for pos in map.walkable() {
            if let Some(id) = map.tile_id(pos) {
                slot_of[id.index()] = pos_of.len() as u32;
                pos_of.push(pos);
            }
        }

        let n = pos_of.len();
        let mut dist = vec![INF; n * n];
        let mut next = vec![NO_SLOT; n * n];

        for (i, &pos) in pos_of.iter().enumerate() {
            dist[i * n + i] = 0;
            next[i * n + i] = i as u32;
            for nb in map.walkable_neighbors(pos) {
                if let Some(id) = map.tile_id(nb) {
                    let j = slot_of[id.index()] as usize;
                    dist[i * n + j] = 1;
                    next[i * n + j] = j as u32;
                }
            }
        }

        relax_all(&mut dist, &mut next, n);

        MapIndex {
            width: map.width(),
            height: map.height(),
            slot_of,
            pos_of,
            dist,
            next,
        }
    }

    /// Number of walkable tiles covered by the matrix.
    pub fn len(&self) -> usize {
        self.pos_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pos_of.is_empty()
    }

    #[inline]
    fn slot(&self, pos: Position) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x as u32 >= self.width || pos.y as u32 >= self.height {
            return None;
        }
        let s = self.slot_of[(pos.y as u32 * self.width + pos.x as u32) as usize];
        (s != NO_SLOT).then_some(s as usize)
    }

    /// Hop count from `a` to `b`; `None` if either is blocked or no path
    /// exists.
    #[inline]
    pub fn distance(&self, a: Position, b: Position) -> Option<u32> {
        let (i, j) = (self.slot(a)?, self.slot(b)?);
        let d = self.dist[i * self.len() + j];
        (d != INF).then_some(d)
    }

    /// `true` if a path exists between `a` and `b`.
    #[inline]
    pub fn reachable(&self, a: Position, b: Position) -> bool {
        self.distance(a, b).is_some()
    }

    /// Shortest path from `a` to `b`, excluding `a` and including `b`.
    /// `Some(vec![])` when `a == b`.
    pub fn path(&self, a: Position, b: Position) -> Option<Vec<Position>> {
        let n = self.len();
        let (mut i, j) = (self.slot(a)?, self.slot(b)?);
        if self.dist[i * n + j] == INF {
            return None;
        }
        let mut out = Vec::with_capacity(self.dist[i * n + j] as usize);
        while i != j {
            i = self.next[i * n + j] as usize;
            out.push(self.pos_of[i]);
        }
        Some(out)
    }

    /// The candidate nearest to `from` by path distance, with its distance.
    /// Ties keep the first candidate in iteration order.
    pub fn nearest<I>(&self, from: Position, candidates: I) -> Option<(Position, u32)>
    where
        I: IntoIterator<Item = Position>,
    {
        candidates
            .into_iter()
            .filter_map(|c| self.distance(from, c).map(|d| (c, d)))
            .min_by_key(|&(_, d)| d)
    }
}

// ── Floyd–Warshall relaxation ─────────────────────────────────────────────────

/// Relax row `i` through pivot `k`.  Row `k` never changes during pivot `k`
/// (`dist[k][k] = 0`), nor does `dist[i][k]`, so rows are independent.
#[inline]
fn relax_row(row_d: &mut [u32], row_n: &mut [u32], k: usize, k_dist: &[u32]) {
    let d_ik = row_d[k];
    if d_ik == INF {
        return;
    }
    let n_ik = row_n[k];
    for (j, &d_kj) in k_dist.iter().enumerate() {
        if d_kj == INF {
            continue;
        }
        let through = d_ik + d_kj;
        if through < row_d[j] {
            row_d[j] = through;
            row_n[j] = n_ik;
        }
    }
}

#[cfg(not(feature = "parallel"))]
fn relax_all(dist: &mut [u32], next: &mut [u32], n: usize) {
    if n == 0 {
        return;
    }
    let mut k_dist = vec![0u32; n];
    for k in 0..n {
        k_dist.copy_from_slice(&dist[k * n..(k + 1) * n]);
        for (row_d, row_n) in dist.chunks_mut(n).zip(next.chunks_mut(n)) {
            relax_row(row_d, row_n, k, &k_dist);
        }
    }
}

#[cfg(feature = "parallel")]
fn relax_all(dist: &mut [u32], next: &mut [u32], n: usize) {
    use rayon::prelude::*;

    if n == 0 {
        return;
    }
    let mut k_dist = vec![0u32; n];
    for k in 0..n {
        k_dist.copy_from_slice(&dist[k * n..(k + 1) * n]);
        let k_dist = &k_dist;
        dist.par_chunks_mut(n)
            .zip(next.par_chunks_mut(n))
            .for_each(|(row_d, row_n)| relax_row(row_d, row_n, k, k_dist));
    }
}
