//! Fetch error types.

use std::time::Duration;

use thiserror::Error;

/// Errors a [`TileSource`](crate::fetch::TileSource) may report for one tile.
///
/// Fetch errors never escape the engine: they are recorded against the
/// tile, surfaced through [`FetchEvent::DataChanged`](crate::fetch::FetchEvent)
/// and the tile is retried after the next viewport change.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The source could not serve the tile (HTTP 5xx, connection refused...)
    #[error("Tile unavailable: {0}")]
    Unavailable(String),

    /// The source gave up waiting
    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The payload arrived but could not be decoded
    #[error("Failed to decode tile: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// Short machine-readable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Unavailable(_) => "unavailable",
            FetchError::Timeout(_) => "timeout",
            FetchError::Decode(_) => "decode",
            FetchError::Io(_) => "io",
            FetchError::Other(_) => "other",
        }
    }
}
