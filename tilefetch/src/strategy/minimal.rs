//! Single-level fetch strategy.

use super::{nearest_first, FetchStrategy};
use crate::tile::{Extent, TileRequest, TileSchema};

/// Fetches only the tiles of the requested level, nearest to the extent
/// center first.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinimalFetchStrategy;

impl FetchStrategy for MinimalFetchStrategy {
    fn get(&self, schema: &dyn TileSchema, extent: &Extent, level: u8) -> Vec<TileRequest> {
        nearest_first(schema, extent, level)
    }

    fn name(&self) -> &'static str {
        "minimal"
    }
}
