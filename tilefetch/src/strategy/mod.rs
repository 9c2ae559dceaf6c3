//! Fetch strategy trait.
//!
//! A fetch strategy turns "this extent at this level" into the ordered list
//! of tile requests needed to cover it. Strategies are pure: no side
//! effects, idempotent for identical inputs and cheap enough to call on
//! every viewport change.
//!
//! # Available Strategies
//!
//! - [`MinimalFetchStrategy`]: only the target level, nearest tiles first.
//! - [`LevelsUpFetchStrategy`]: the target level followed by up to
//!   `max_levels_up` coarser levels as a blurry fallback, optionally with a
//!   margin around the visible extent.
//!
//! # Example
//!
//! ```
//! use tilefetch::strategy::{FetchStrategy, MinimalFetchStrategy};
//! use tilefetch::tile::GridSchema;
//!
//! let schema = GridSchema::web_mercator(4);
//! let extent = *schema.bounds();
//! let requests = MinimalFetchStrategy.get(&schema, &extent, 1);
//! assert_eq!(requests.len(), 4);
//! ```

mod levels_up;
mod minimal;

pub use levels_up::LevelsUpFetchStrategy;
pub use minimal::MinimalFetchStrategy;

use crate::tile::{Extent, TileRequest, TileSchema};

/// Trait for fetch strategies.
///
/// Implementations must be `Send + Sync` so one strategy instance can be
/// shared by the planner across worker threads.
pub trait FetchStrategy: Send + Sync {
    /// Tile requests covering `extent` at `level`, in fetch order.
    ///
    /// Empty extents and levels unknown to the schema yield an empty list.
    fn get(&self, schema: &dyn TileSchema, extent: &Extent, level: u8) -> Vec<TileRequest>;

    /// Short name for logging.
    fn name(&self) -> &'static str;
}

/// Requests for one level, ordered nearest-to-farthest from the center of
/// `extent`.
///
/// The sort is stable, so tiles at equal distance keep the schema's
/// row-major order.
pub(crate) fn nearest_first(
    schema: &dyn TileSchema,
    extent: &Extent,
    level: u8,
) -> Vec<TileRequest> {
    if extent.is_empty() {
        return Vec::new();
    }
    let Some(level_info) = schema.level(level) else {
        return Vec::new();
    };

    let mut requests: Vec<(f64, TileRequest)> = schema
        .tiles_in_extent(extent, level)
        .into_iter()
        .filter_map(|index| {
            let tile_extent = schema.tile_extent(index)?;
            let distance = tile_extent.center_distance_sq(extent);
            Some((distance, TileRequest::new(index, tile_extent, level_info)))
        })
        .collect();

    requests.sort_by(|a, b| a.0.total_cmp(&b.0));
    requests.into_iter().map(|(_, request)| request).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{GridSchema, Level, TileIndex};

    fn grid() -> GridSchema {
        GridSchema::new(
            Extent::new(0.0, 0.0, 400.0, 400.0),
            100,
            vec![Level::new(0, 4.0), Level::new(1, 2.0), Level::new(2, 1.0)],
        )
    }

    #[test]
    fn test_nearest_first_center_tile_leads() {
        let schema = grid();
        // Level 2 is a 4x4 grid of 100-unit tiles; center on tile (1, 2)
        let extent = Extent::from_center(150.0, 150.0, 300.0, 300.0);
        let requests = nearest_first(&schema, &extent, 2);

        assert_eq!(requests.len(), 9);
        assert_eq!(requests[0].index(), TileIndex::new(1, 2, 2));
    }

    #[test]
    fn test_nearest_first_distances_non_decreasing() {
        let schema = grid();
        let extent = Extent::new(30.0, 30.0, 370.0, 250.0);
        let requests = nearest_first(&schema, &extent, 2);
        let (cx, cy) = extent.center();

        let distances: Vec<f64> = requests
            .iter()
            .map(|r| {
                let (x, y) = r.extent().center();
                (x - cx).powi(2) + (y - cy).powi(2)
            })
            .collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_nearest_first_unknown_level() {
        let schema = grid();
        assert!(nearest_first(&schema, schema.bounds(), 9).is_empty());
    }

    #[test]
    fn test_nearest_first_empty_extent() {
        let schema = grid();
        let extent = Extent::new(10.0, 10.0, 10.0, 10.0);
        assert!(nearest_first(&schema, &extent, 1).is_empty());
    }

    #[test]
    fn test_trait_object_usage() {
        let strategies: Vec<Box<dyn FetchStrategy>> = vec![
            Box::new(MinimalFetchStrategy),
            Box::new(LevelsUpFetchStrategy::new(2)),
        ];
        let schema = grid();
        for strategy in &strategies {
            assert!(!strategy.get(&schema, schema.bounds(), 1).is_empty());
        }
    }

    // =========================================================================
    // Property tests
    // =========================================================================

    mod properties {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        fn extent_strategy() -> impl Strategy<Value = Extent> {
            (-50.0..450.0f64, -50.0..450.0f64, 1.0..300.0f64, 1.0..300.0f64)
                .prop_map(|(x, y, w, h)| Extent::new(x, y, x + w, y + h))
        }

        proptest! {
            #[test]
            fn test_minimal_is_nearest_first_and_unique(
                extent in extent_strategy(),
                level in 0u8..3,
            ) {
                let schema = grid();
                let requests = MinimalFetchStrategy.get(&schema, &extent, level);

                let unique: HashSet<TileIndex> = requests.iter().map(|r| r.index()).collect();
                prop_assert_eq!(unique.len(), requests.len());
                prop_assert!(requests.iter().all(|r| r.index().level == level));
                prop_assert!(requests.iter().all(|r| r.extent().intersects(&extent)));

                let distances: Vec<f64> = requests
                    .iter()
                    .map(|r| r.extent().center_distance_sq(&extent))
                    .collect();
                prop_assert!(distances.windows(2).all(|w| w[0] <= w[1]));
            }

            #[test]
            fn test_levels_up_starts_with_target_level(
                extent in extent_strategy(),
                levels_up in 0u8..3,
            ) {
                let schema = grid();
                let minimal = MinimalFetchStrategy.get(&schema, &extent, 2);
                let layered = LevelsUpFetchStrategy::new(levels_up).get(&schema, &extent, 2);

                prop_assert!(layered.len() >= minimal.len());
                prop_assert_eq!(&layered[..minimal.len()], &minimal[..]);

                let levels: Vec<u8> = layered.iter().map(|r| r.index().level).collect();
                prop_assert!(levels.windows(2).all(|w| w[0] >= w[1]));
                prop_assert!(levels.iter().all(|&l| l >= 2 - levels_up.min(2)));
            }
        }
    }
}
