//! Tile index type.

use std::fmt;

/// Grid position of a tile at a given level.
///
/// The index is a plain value: structurally compared, hashable and never
/// mutated after creation. It is the key for the tile cache and for every
/// set kept by the fetch tracker.
///
/// # Example
///
/// ```
/// use tilefetch::tile::TileIndex;
///
/// let index = TileIndex::new(4, 7, 3);
/// assert_eq!(index.col, 4);
/// assert_eq!(index.row, 7);
/// assert_eq!(index.level, 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileIndex {
    /// Tile column (X position in the tile matrix, increases eastward)
    pub col: u32,
    /// Tile row (Y position in the tile matrix, increases southward)
    pub row: u32,
    /// Level identifier within the tile schema
    pub level: u8,
}

impl TileIndex {
    /// Create a new tile index.
    pub const fn new(col: u32, row: u32, level: u8) -> Self {
        Self { col, row, level }
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.col, self.row)
    }
}
