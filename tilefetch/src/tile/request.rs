//! Tile fetch request types.
//!
//! Provides the `TileRequest` type that bundles everything a tile source
//! needs to produce one tile: where it sits in the grid, the area it covers
//! and the resolution level it belongs to.

use super::{Extent, Level, TileIndex};

/// Request to fetch a single tile.
///
/// Produced by a [`FetchStrategy`](crate::strategy::FetchStrategy), queued by
/// the fetch tracker and finally handed to a
/// [`TileSource`](crate::fetch::TileSource). Requests are immutable; the
/// tracker keys all of its bookkeeping on [`TileRequest::index`].
///
/// # Example
///
/// ```
/// use tilefetch::tile::{Extent, Level, TileIndex, TileRequest};
///
/// let request = TileRequest::new(
///     TileIndex::new(3, 5, 4),
///     Extent::new(0.0, 0.0, 256.0, 256.0),
///     Level::new(4, 1.0),
/// );
/// assert_eq!(request.index().col, 3);
/// assert_eq!(request.level().id, 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileRequest {
    /// Grid position of the tile
    index: TileIndex,
    /// Area covered by the tile, in map units
    extent: Extent,
    /// Resolution level the tile belongs to
    level: Level,
}

impl TileRequest {
    /// Create a new tile request.
    pub fn new(index: TileIndex, extent: Extent, level: Level) -> Self {
        Self {
            index,
            extent,
            level,
        }
    }

    /// Get the tile index.
    pub fn index(&self) -> TileIndex {
        self.index
    }

    /// Get the tile extent.
    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    /// Get the resolution level.
    pub fn level(&self) -> Level {
        self.level
    }
}
