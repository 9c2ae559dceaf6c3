//! Tile cache.
//!
//! - [`TileCache`] - bounded concurrent store with generation-based eviction
//! - [`OccupancyPolicy`] - maps the viewport's needed tile count to the
//!   cache's `(min, max)` target
//! - [`CachedTile`] - payload stored by the planner (data or "no data here")
//! - [`CacheStats`] - hit/miss/eviction counters

mod memory;
mod occupancy;
mod stats;
mod tile;

pub use memory::TileCache;
pub use occupancy::{OccupancyPolicy, DEFAULT_MAX_EXTRA, DEFAULT_MIN_EXTRA};
pub use stats::CacheStats;
pub use tile::CachedTile;
