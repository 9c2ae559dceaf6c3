//! Fetch telemetry.
//!
//! Lock-free counters recorded by the planner and its jobs, plus a
//! point-in-time snapshot for display.
//!
//! ```text
//! Planner / jobs ─────► FetchMetrics ─────► TelemetrySnapshot ─────► CLI, logs
//!                      (atomic counters)   (copy + cache/tracker state)
//! ```

mod metrics;
mod snapshot;

pub use metrics::FetchMetrics;
pub use snapshot::TelemetrySnapshot;
