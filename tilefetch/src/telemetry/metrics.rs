//! Atomic fetch counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::TelemetrySnapshot;
use crate::cache::CacheStats;

/// Counters shared by the planner and every fetch job.
///
/// All updates use relaxed atomics; a snapshot is a consistent-enough view
/// for reporting, not a transaction.
#[derive(Debug)]
pub struct FetchMetrics {
    started: Instant,
    viewport_updates: AtomicU64,
    recomputes: AtomicU64,
    truncations: AtomicU64,
    jobs_issued: AtomicU64,
    claims_refused: AtomicU64,
    fetch_successes: AtomicU64,
    fetch_failures: AtomicU64,
    empty_tiles: AtomicU64,
}

impl Default for FetchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchMetrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            viewport_updates: AtomicU64::new(0),
            recomputes: AtomicU64::new(0),
            truncations: AtomicU64::new(0),
            jobs_issued: AtomicU64::new(0),
            claims_refused: AtomicU64::new(0),
            fetch_successes: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            empty_tiles: AtomicU64::new(0),
        }
    }

    // =========================================================================
    // Planner events
    // =========================================================================

    pub fn viewport_updated(&self) {
        self.viewport_updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a recomputation and whether the safety cap truncated it.
    pub fn recomputed(&self, truncated: bool) {
        self.recomputes.fetch_add(1, Ordering::Relaxed);
        if truncated {
            self.truncations.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn jobs_issued(&self, count: usize) {
        self.jobs_issued.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// A claim was refused by admission control while tiles were queued.
    pub fn claim_refused(&self) {
        self.claims_refused.fetch_add(1, Ordering::Relaxed);
    }

    // =========================================================================
    // Job outcomes
    // =========================================================================

    pub fn fetch_succeeded(&self, empty: bool) {
        self.fetch_successes.fetch_add(1, Ordering::Relaxed);
        if empty {
            self.empty_tiles.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn fetch_failed(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the counters, combined with the current queue and cache state.
    pub fn snapshot(
        &self,
        to_fetch: usize,
        in_progress: usize,
        failed: usize,
        cache: CacheStats,
    ) -> TelemetrySnapshot {
        TelemetrySnapshot {
            uptime: self.started.elapsed(),
            viewport_updates: self.viewport_updates.load(Ordering::Relaxed),
            recomputes: self.recomputes.load(Ordering::Relaxed),
            truncations: self.truncations.load(Ordering::Relaxed),
            jobs_issued: self.jobs_issued.load(Ordering::Relaxed),
            claims_refused: self.claims_refused.load(Ordering::Relaxed),
            fetch_successes: self.fetch_successes.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            empty_tiles: self.empty_tiles.load(Ordering::Relaxed),
            to_fetch,
            in_progress,
            failed,
            cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters() {
        let metrics = FetchMetrics::new();
        metrics.viewport_updated();
        metrics.viewport_updated();
        metrics.recomputed(false);
        metrics.recomputed(true);
        metrics.jobs_issued(3);
        metrics.claim_refused();
        metrics.fetch_succeeded(false);
        metrics.fetch_succeeded(true);
        metrics.fetch_failed();

        let snapshot = metrics.snapshot(1, 2, 3, CacheStats::default());
        assert_eq!(snapshot.viewport_updates, 2);
        assert_eq!(snapshot.recomputes, 2);
        assert_eq!(snapshot.truncations, 1);
        assert_eq!(snapshot.jobs_issued, 3);
        assert_eq!(snapshot.claims_refused, 1);
        assert_eq!(snapshot.fetch_successes, 2);
        assert_eq!(snapshot.empty_tiles, 1);
        assert_eq!(snapshot.fetch_failures, 1);
        assert_eq!(
            (snapshot.to_fetch, snapshot.in_progress, snapshot.failed),
            (1, 2, 3)
        );
    }

    #[test]
    fn test_concurrent_updates() {
        let metrics = Arc::new(FetchMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.fetch_succeeded(false);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = metrics.snapshot(0, 0, 0, CacheStats::default());
        assert_eq!(snapshot.fetch_successes, 4000);
    }
}
