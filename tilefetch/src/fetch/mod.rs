//! Fetch planning and dispatch.
//!
//! ```text
//! on_viewport_changed ──► Mailbox ──► FetchPlanner ──► FetchTracker
//!                                         │   (strategy + cache lookup)
//!                                         ▼
//!                         get_fetch_jobs ─► FetchJob ─► TileSource
//!                                                          │
//!                         FetchEvent ◄── cache + tracker ◄─┘
//! ```
//!
//! - [`FetchTracker`] - to-fetch / in-progress / failed sets, admission control,
//!   ticketed [`Claim`]s
//! - [`Mailbox`] - single-slot viewport hand-off
//! - [`FetchPlanner`] - orchestration, busy state, events
//! - [`FetchJob`] - one claimed tile, run by a worker
//! - [`TileSource`] - where tile data comes from

mod events;
mod job;
mod mailbox;
mod planner;
mod source;
mod tracker;
mod viewport;

pub use events::FetchEvent;
pub use job::FetchJob;
pub use mailbox::Mailbox;
pub use planner::FetchPlanner;
pub use source::{BoxFuture, FnTileSource, TileSource};
pub use tracker::{
    Claim, FetchTracker, RecomputeOutcome, TrackerSnapshot, DEFAULT_MAX_TILES_PER_UPDATE,
};
pub use viewport::{ChangeType, ViewportState};
