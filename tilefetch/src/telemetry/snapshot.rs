//! Point-in-time telemetry.

use std::fmt;
use std::time::Duration;

use crate::cache::CacheStats;

/// Copy of the fetch counters plus queue and cache state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub uptime: Duration,
    pub viewport_updates: u64,
    pub recomputes: u64,
    /// Recomputations cut short by the safety cap
    pub truncations: u64,
    pub jobs_issued: u64,
    pub claims_refused: u64,
    pub fetch_successes: u64,
    pub fetch_failures: u64,
    /// Successful fetches where the source had no data
    pub empty_tiles: u64,
    pub to_fetch: usize,
    pub in_progress: usize,
    pub failed: usize,
    pub cache: CacheStats,
}

impl TelemetrySnapshot {
    pub fn fetches_completed(&self) -> u64 {
        self.fetch_successes + self.fetch_failures
    }

    /// Fraction of completed fetches that succeeded, `1.0` before any.
    pub fn success_rate(&self) -> f64 {
        let completed = self.fetches_completed();
        if completed == 0 {
            1.0
        } else {
            self.fetch_successes as f64 / completed as f64
        }
    }

    /// Completed fetches per second of uptime.
    pub fn fetches_per_second(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs > 0.0 {
            self.fetches_completed() as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Uptime:      {:.1}s", self.uptime.as_secs_f64())?;
        writeln!(
            f,
            "Viewports:   {} updates, {} recomputes ({} truncated)",
            self.viewport_updates, self.recomputes, self.truncations
        )?;
        writeln!(
            f,
            "Jobs:        {} issued, {} claims refused",
            self.jobs_issued, self.claims_refused
        )?;
        writeln!(
            f,
            "Fetches:     {} ok ({} empty), {} failed, {:.1}% success, {:.1}/s",
            self.fetch_successes,
            self.empty_tiles,
            self.fetch_failures,
            self.success_rate() * 100.0,
            self.fetches_per_second()
        )?;
        writeln!(
            f,
            "Queue:       {} to fetch, {} in progress, {} failed",
            self.to_fetch, self.in_progress, self.failed
        )?;
        write!(f, "Cache:       {}", self.cache)
    }
}
