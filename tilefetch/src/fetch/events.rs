//! Planner notifications.

use std::sync::Arc;

use crate::error::FetchError;
use crate::tile::TileIndex;

/// Events broadcast by the [`FetchPlanner`](super::FetchPlanner).
#[derive(Debug, Clone)]
pub enum FetchEvent {
    /// The busy flag flipped. Never sent twice in a row with the same value.
    BusyChanged(bool),
    /// A fetch job finished. Sent after every job, successful or not; the
    /// renderer redraws on success and can log `error` otherwise.
    DataChanged {
        index: TileIndex,
        error: Option<Arc<FetchError>>,
    },
}

impl FetchEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, FetchEvent::DataChanged { error: Some(_), .. })
    }
}
