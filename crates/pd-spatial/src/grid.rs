//! Tile map representation and builder.
//!
//! # Data layout
//!
//! Cells are stored row-major in a single `Vec<TileKind>`; the `TileId` of
//! cell `(x, y)` is `y * width + x`.  Out-of-bounds positions behave as
//! `Blocked`.  Delivery and spawn tiles are additionally collected into
//! small lists because desire generation scans them every tick.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) over walkable tiles snaps fractional coordinates
//! to the nearest walkable tile.  The environment reports agents mid-move at
//! positions like `(2.6, 4.0)`; midpoints between two agents are snapped the
//! same way.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use pd_core::{Position, TileId};

use crate::{SpatialError, SpatialResult};

// ── Tile ──────────────────────────────────────────────────────────────────────

/// Traversability class of one cell.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum TileKind {
    #[default]
    Blocked,
    Free,
    /// Parcels appear here.
    Spawn,
    /// Parcels put down here are scored.
    Delivery,
}

impl TileKind {
    #[inline]
    pub fn is_walkable(self) -> bool {
        !matches!(self, TileKind::Blocked)
    }

    fn from_char(c: char) -> Option<TileKind> {
        match c {
            '#' | '0' => Some(TileKind::Blocked),
            '.' | '3' => Some(TileKind::Free),
            'S' | '1' => Some(TileKind::Spawn),
            'D' | '2' => Some(TileKind::Delivery),
            _ => None,
        }
    }
}

/// A position with its traversability class, as reported by the environment.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Tile {
    pub pos:  Position,
    pub kind: TileKind,
}

// ── R-tree entry ──────────────────────────────────────────────────────────────

#[derive(Clone)]
struct TileEntry {
    point: [f32; 2],
    pos:   Position,
}

impl RTreeObject for TileEntry {
    type Envelope = AABB<[f32; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for TileEntry {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ── TileMap ───────────────────────────────────────────────────────────────────

/// The immutable tile set of one mission.
///
/// Do not construct directly; use [`TileMapBuilder`] or [`TileMap::parse`].
pub struct TileMap {
    width:  u32,
    height: u32,
    kinds:  Vec<TileKind>,

    delivery: Vec<Position>,
    spawn:    Vec<Position>,

    spatial_idx: RTree<TileEntry>,
}

impl TileMap {
    /// A 0×0 map with no tiles.
    pub fn empty() -> Self {
        TileMapBuilder::new(0, 0).build()
    }

    /// Parse an ASCII picture.  Line `k` of the text is row `y = k`, so
    /// `Direction::Up` moves to the next line.
    ///
    /// | Char       | Kind       |
    /// |------------|------------|
    /// | `#` or `0` | `Blocked`  |
    /// | `.` or `3` | `Free`     |
    /// | `S` or `1` | `Spawn`    |
    /// | `D` or `2` | `Delivery` |
    ///
    /// Leading/trailing whitespace per line is ignored.  All rows must have
    /// equal width.
    pub fn parse(text: &str) -> SpatialResult<TileMap> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let width = rows.first().map_or(0, |r| r.chars().count());
        let mut b = TileMapBuilder::new(width as u32, rows.len() as u32);
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(SpatialError::Parse(format!(
                    "row {y} has {} cells, expected {width}",
                    row.chars().count()
                )));
            }
            for (x, c) in row.chars().enumerate() {
                let kind = TileKind::from_char(c)
                    .ok_or_else(|| SpatialError::Parse(format!("unknown tile '{c}' at ({x}, {y})")))?;
                b.set(Position::new(x as i32, y as i32), kind)?;
            }
        }
        Ok(b.build())
    }

    /// Build from an environment tile list.  Dimensions are derived from the
    /// largest coordinates; unlisted cells are blocked.
    pub fn from_tiles(tiles: &[Tile]) -> SpatialResult<TileMap> {
        let width  = tiles.iter().map(|t| t.pos.x + 1).max().unwrap_or(0).max(0) as u32;
        let height = tiles.iter().map(|t| t.pos.y + 1).max().unwrap_or(0).max(0) as u32;
        let mut b = TileMapBuilder::new(width, height);
        for t in tiles {
            b.set(t.pos, t.kind)?;
        }
        Ok(b.build())
    }

    // ── Dimensions ────────────────────────────────────────────────────────

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of cells (`width × height`), blocked ones included.
    pub fn cell_count(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    // ── Cell lookup ───────────────────────────────────────────────────────

    #[inline]
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    #[inline]
    pub fn tile_id(&self, pos: Position) -> Option<TileId> {
        self.in_bounds(pos)
            .then(|| TileId(pos.y as u32 * self.width + pos.x as u32))
    }

    #[inline]
    pub fn position(&self, id: TileId) -> Position {
        Position::new((id.0 % self.width) as i32, (id.0 / self.width) as i32)
    }

    /// Kind of the cell at `pos`; `Blocked` outside the map.
    #[inline]
    pub fn kind(&self, pos: Position) -> TileKind {
        self.tile_id(pos).map_or(TileKind::Blocked, |id| self.kinds[id.index()])
    }

    #[inline]
    pub fn is_walkable(&self, pos: Position) -> bool {
        self.kind(pos).is_walkable()
    }

    #[inline]
    pub fn is_delivery(&self, pos: Position) -> bool {
        self.kind(pos) == TileKind::Delivery
    }

    #[inline]
    pub fn is_spawn(&self, pos: Position) -> bool {
        self.kind(pos) == TileKind::Spawn
    }

    /// Walkable 4-neighbours of `pos`.
    #[inline]
    pub fn walkable_neighbors(&self, pos: Position) -> impl Iterator<Item = Position> + '_ {
        pos.neighbors().into_iter().filter(move |&n| self.is_walkable(n))
    }

    /// Every walkable tile, row-major.
    pub fn walkable(&self) -> impl Iterator<Item = Position> + '_ {
        self.kinds
            .iter()
            .enumerate()
            .filter(|(_, k)| k.is_walkable())
            .map(|(i, _)| self.position(TileId(i as u32)))
    }

    /// Every walkable tile with its kind.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        self.walkable().map(|pos| Tile { pos, kind: self.kind(pos) })
    }

    pub fn delivery_tiles(&self) -> &[Position] {
        &self.delivery
    }

    pub fn spawn_tiles(&self) -> &[Position] {
        &self.spawn
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// The walkable tile nearest to the fractional point `(x, y)`.
    ///
    /// Returns `None` only if the map has no walkable tiles.
    pub fn snap_to_walkable(&self, x: f32, y: f32) -> Option<Position> {
        self.spatial_idx.nearest_neighbor(&[x, y]).map(|e| e.pos)
    }

    /// Up to `k` walkable tiles nearest to `(x, y)`, by ascending Euclidean
    /// distance.
    pub fn k_nearest_walkable(&self, x: f32, y: f32, k: usize) -> Vec<Position> {
        self.spatial_idx
            .nearest_neighbor_iter(&[x, y])
            .take(k)
            .map(|e| e.pos)
            .collect()
    }
}

// ── TileMapBuilder ────────────────────────────────────────────────────────────

/// Construct a [`TileMap`] cell by cell, then call [`build`](Self::build).
///
/// Every cell starts `Blocked`.
///
/// # Example
///
/// ```
/// use pd_core::Position;
/// use pd_spatial::{TileKind, TileMapBuilder};
///
/// let mut b = TileMapBuilder::new(2, 1);
/// b.set(Position::new(0, 0), TileKind::Spawn).unwrap();
/// b.set(Position::new(1, 0), TileKind::Delivery).unwrap();
/// let map = b.build();
/// assert_eq!(map.delivery_tiles(), &[Position::new(1, 0)]);
/// ```
pub struct TileMapBuilder {
    width:  u32,
    height: u32,
    kinds:  Vec<TileKind>,
}

impl TileMapBuilder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            kinds: vec![TileKind::Blocked; (width * height) as usize],
        }
    }

    /// Set the kind of one cell; later calls overwrite earlier ones.
    pub fn set(&mut self, pos: Position, kind: TileKind) -> SpatialResult<()> {
        if pos.x < 0 || pos.y < 0 || pos.x as u32 >= self.width || pos.y as u32 >= self.height {
            return Err(SpatialError::OutOfBounds(pos));
        }
        self.kinds[(pos.y as u32 * self.width + pos.x as u32) as usize] = kind;
        Ok(())
    }

    /// Consume the builder and produce a [`TileMap`].
    ///
    /// Time complexity: O(W·H) scan + O(T log T) R-tree bulk load over the
    /// T walkable tiles.
    pub fn build(self) -> TileMap {
        let width = self.width;
        let pos_of = |i: usize| Position::new((i as u32 % width) as i32, (i as u32 / width) as i32);

        let mut delivery = Vec::new();
        let mut spawn    = Vec::new();
        let mut entries  = Vec::new();
        for (i, &kind) in self.kinds.iter().enumerate() {
            let pos = pos_of(i);
            match kind {
                TileKind::Blocked  => continue,
                TileKind::Delivery => delivery.push(pos),
                TileKind::Spawn    => spawn.push(pos),
                TileKind::Free     => {}
            }
            entries.push(TileEntry { point: [pos.x as f32, pos.y as f32], pos });
        }

        TileMap {
            width,
            height: self.height,
            kinds: self.kinds,
            delivery,
            spawn,
            spatial_idx: RTree::bulk_load(entries),
        }
    }
}

impl std::fmt::Debug for TileMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileMap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("delivery", &self.delivery.len())
            .field("spawn", &self.spawn.len())
            .finish()
    }
}
