//! `pd-spatial` — tile map, all-pairs index, and dynamic routing.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                     |
//! |------------|--------------------------------------------------------------|
//! | [`grid`]   | `TileMap` (+ R-tree snapping), `TileMapBuilder`, `TileKind`  |
//! | [`index`]  | `MapIndex`: Floyd–Warshall distances and shortest paths      |
//! | [`router`] | `Router`, `AStarRouter`, `route_to_actions`, live `flood`    |
//! | [`error`]  | `SpatialError`, `SpatialResult<T>`                           |
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                    |
//! |------------|-----------------------------------------------------------|
//! | `parallel` | Builds `MapIndex` rows on Rayon's thread pool.            |

pub mod error;
pub mod grid;
pub mod index;
pub mod router;


pub use error::{SpatialError, SpatialResult};
pub use grid::{Tile, TileKind, TileMap, TileMapBuilder};
pub use index::MapIndex;
pub use router::{flood, route_to_actions, AStarRouter, Route, Router};

/// Obstacle set passed to [`Router::find_path`].
pub type Obstacles = rustc_hash::FxHashSet<pd_core::Position>;
