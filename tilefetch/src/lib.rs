//! TileFetch - viewport-driven tile fetch planning and caching.
//!
//! Given a stream of viewport changes, the engine works out which map tiles
//! are needed, fetches them through a caller-supplied [`TileSource`] with
//! bounded concurrency, retries failures after the next viewport change, and
//! keeps a cache sized to the viewport so small pans do not flicker.
//!
//! # Architecture
//!
//! ```text
//! viewport ──► FetchPlanner ──► FetchTracker ──► FetchJob ──► TileSource
//!                  │  ▲              ▲               │
//!                  │  └── strategy   └── complete ◄──┤
//!                  ▼                    / fail       ▼
//!              FetchEvent                        TileCache ◄── renderer find
//! ```
//!
//! - [`tile`] - tile indices, extents, requests and schemas
//! - [`strategy`] - which tiles cover a viewport, in which order
//! - [`cache`] - bounded tile cache with generation-based eviction
//! - [`fetch`] - tracker, mailbox, planner, jobs and the source trait
//! - [`worker`] - tokio worker pool driving the planner
//! - [`config`], [`logging`], [`telemetry`] - ambient plumbing
//!
//! [`TileSource`]: fetch::TileSource

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod strategy;
pub mod telemetry;
pub mod tile;
pub mod worker;

pub use error::FetchError;
