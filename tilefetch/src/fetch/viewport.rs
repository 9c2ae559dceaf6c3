//! Viewport snapshot handed to the planner.

use crate::tile::Extent;

/// How the viewport got to its new state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ChangeType {
    /// A jump: zoom step, programmatic navigation, initial load
    #[default]
    Discrete,
    /// Part of an ongoing gesture such as a drag
    Continuous,
}

/// What the renderer currently shows.
///
/// Each state supersedes the previous one entirely; the planner only ever
/// acts on the most recent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub extent: Extent,
    /// Map units per screen pixel
    pub resolution: f64,
    pub change: ChangeType,
}

impl ViewportState {
    /// A discrete viewport change.
    pub fn new(extent: Extent, resolution: f64) -> Self {
        Self {
            extent,
            resolution,
            change: ChangeType::Discrete,
        }
    }

    pub fn with_change(mut self, change: ChangeType) -> Self {
        self.change = change;
        self
    }
}
