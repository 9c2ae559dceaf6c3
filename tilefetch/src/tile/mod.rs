//! Tile addressing types.
//!
//! - [`TileIndex`] - (column, row, level) key used by the cache and tracker
//! - [`Extent`] - axis-aligned rectangle in map units
//! - [`TileRequest`] - a tile index plus the extent and level it covers
//! - [`TileSchema`] - the pyramid a source serves, with [`GridSchema`] as a
//!   simple regular-grid implementation

mod extent;
mod index;
mod request;
mod schema;

pub use extent::Extent;
pub use index::TileIndex;
pub use request::TileRequest;
pub use schema::{nearest_level, GridSchema, Level, TileSchema, DEFAULT_TILE_SIZE};
