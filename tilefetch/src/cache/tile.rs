//! Cached tile payload.

/// What the planner stores for a fetched tile.
///
/// `Empty` remembers that the source has no data at an index, so the tile
/// is not fetched again while it stays cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedTile<T> {
    Data(T),
    Empty,
}

impl<T> CachedTile<T> {
    /// The payload, if the source returned one.
    pub fn data(&self) -> Option<&T> {
        match self {
            CachedTile::Data(data) => Some(data),
            CachedTile::Empty => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            CachedTile::Data(data) => Some(data),
            CachedTile::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CachedTile::Empty)
    }
}

impl<T> From<Option<T>> for CachedTile<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(data) => CachedTile::Data(data),
            None => CachedTile::Empty,
        }
    }
}
