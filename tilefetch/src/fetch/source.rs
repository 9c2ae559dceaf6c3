//! Tile source abstraction.
//!
//! The engine never talks to a network or disk itself. Callers plug in a
//! [`TileSource`] that resolves one tile request at a time; timeouts and
//! transport policy belong to the source.

use std::future::Future;
use std::pin::Pin;

use crate::error::FetchError;
use crate::tile::TileRequest;

/// Boxed future type for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Resolves tile requests to payloads.
///
/// `Ok(None)` means "the source has no data for this tile". It is not an
/// error and gets cached so the tile is not requested again.
///
/// Implementations must resolve every request eventually (success or error);
/// a future that never completes keeps its tile in flight.
pub trait TileSource<T>: Send + Sync {
    fn fetch(&self, request: TileRequest) -> BoxFuture<'_, Result<Option<T>, FetchError>>;
}

/// Adapts an async closure into a [`TileSource`].
///
/// # Example
///
/// ```
/// use tilefetch::fetch::{FnTileSource, TileSource};
/// use tilefetch::FetchError;
///
/// let source = FnTileSource::new(|request: tilefetch::tile::TileRequest| async move {
///     Ok::<_, FetchError>(Some(request.index().to_string()))
/// });
/// # let _: &dyn TileSource<String> = &source;
/// ```
pub struct FnTileSource<F> {
    fetch: F,
}

impl<F> FnTileSource<F> {
    pub fn new(fetch: F) -> Self {
        Self { fetch }
    }
}

impl<T, F, Fut> TileSource<T> for FnTileSource<F>
where
    F: Fn(TileRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<T>, FetchError>> + Send + 'static,
{
    fn fetch(&self, request: TileRequest) -> BoxFuture<'_, Result<Option<T>, FetchError>> {
        Box::pin((self.fetch)(request))
    }
}

impl<F> std::fmt::Debug for FnTileSource<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTileSource").finish_non_exhaustive()
    }
}
