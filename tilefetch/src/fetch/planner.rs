//! Fetch planner: turns viewport changes into bounded batches of jobs.
//!
//! The planner wires the mailbox, tracker, strategy and cache together.
//! Callers (usually a [`WorkerPool`](crate::worker::WorkerPool)) pull work
//! with [`get_fetch_jobs`](FetchPlanner::get_fetch_jobs); nothing is pushed.
//!
//! # Busy State
//!
//! ```text
//!          on_viewport_changed
//!   Idle ───────────────────────► Busy
//!    ▲                              │
//!    └──────────────────────────────┘
//!      mailbox empty and tracker done
//! ```
//!
//! Each transition is broadcast once as [`FetchEvent::BusyChanged`]; setting
//! the same value again is silent.
//!
//! # Lock Order
//!
//! busy flag, then tracker. The cache is only read while the tracker lock
//! is not held.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, Notify};
use tracing::{debug, info, warn};

use super::{Claim, FetchEvent, FetchJob, FetchTracker, Mailbox, TileSource, ViewportState};
use crate::cache::{CachedTile, OccupancyPolicy, TileCache};
use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::strategy::FetchStrategy;
use crate::telemetry::{FetchMetrics, TelemetrySnapshot};
use crate::tile::{TileIndex, TileSchema};

/// Plans and dispatches tile fetches for one layer.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tilefetch::config::FetchConfig;
/// use tilefetch::fetch::{FetchPlanner, FnTileSource, ViewportState};
/// use tilefetch::tile::{GridSchema, TileRequest};
/// use tilefetch::FetchError;
///
/// let schema = GridSchema::web_mercator(3);
/// let bounds = *schema.bounds();
/// let source = FnTileSource::new(|_: TileRequest| async move { Ok::<_, FetchError>(Some(1u8)) });
/// let planner: Arc<FetchPlanner<u8>> = Arc::new(FetchPlanner::new(
///     Arc::new(schema),
///     Arc::new(source),
///     &FetchConfig::default(),
/// ));
///
/// planner.on_viewport_changed(ViewportState::new(bounds, 1e9));
/// assert!(planner.busy());
/// let jobs = planner.get_fetch_jobs(0, 2);
/// assert_eq!(jobs.len(), 1); // coarsest level: a single tile
/// ```
pub struct FetchPlanner<T> {
    schema: Arc<dyn TileSchema>,
    strategy: Arc<dyn FetchStrategy>,
    source: Arc<dyn TileSource<T>>,
    tracker: FetchTracker,
    cache: TileCache<CachedTile<T>>,
    mailbox: Mailbox<ViewportState>,
    busy: Mutex<bool>,
    events: broadcast::Sender<FetchEvent>,
    wake: Notify,
    metrics: FetchMetrics,
    occupancy: OccupancyPolicy,
    desired_concurrency: usize,
    max_in_progress: usize,
}

impl<T: Clone + Send + Sync + 'static> FetchPlanner<T> {
    /// Create a planner using the strategy selected by `config`.
    pub fn new(
        schema: Arc<dyn TileSchema>,
        source: Arc<dyn TileSource<T>>,
        config: &FetchConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            schema,
            strategy: config.strategy(),
            source,
            tracker: FetchTracker::new(config.max_tiles_per_update),
            cache: TileCache::with_policy(&config.occupancy),
            mailbox: Mailbox::new(),
            busy: Mutex::new(false),
            events,
            wake: Notify::new(),
            metrics: FetchMetrics::new(),
            occupancy: config.occupancy,
            desired_concurrency: config.desired_concurrency,
            max_in_progress: config.max_in_progress,
        }
    }

    /// Replace the configured strategy.
    pub fn with_strategy(mut self, strategy: Arc<dyn FetchStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    // =========================================================================
    // Caller API
    // =========================================================================

    /// Record a new viewport.
    ///
    /// Overwrites any viewport not yet planned, flips busy on immediately and
    /// wakes idle workers. Recomputation happens on the next
    /// [`get_fetch_jobs`](Self::get_fetch_jobs).
    pub fn on_viewport_changed(&self, viewport: ViewportState) {
        self.metrics.viewport_updated();
        debug!(
            resolution = viewport.resolution,
            change = ?viewport.change,
            "Viewport changed"
        );
        self.mailbox.put(viewport);
        {
            let mut busy = self.busy.lock();
            self.set_busy(&mut busy, true);
        }
        self.wake.notify_waiters();
    }

    /// Hand out up to `available_slots` jobs.
    ///
    /// Plans the pending viewport first, if any. Never returns more jobs
    /// than `desired_concurrency - active_fetches`, and stops at the first
    /// claim the tracker refuses.
    pub fn get_fetch_jobs(
        self: &Arc<Self>,
        active_fetches: usize,
        available_slots: usize,
    ) -> Vec<FetchJob<T>> {
        {
            let mut busy = self.busy.lock();
            if let Some(viewport) = self.mailbox.try_take() {
                self.plan(&viewport);
            }
            self.refresh_busy(&mut busy);
        }

        let to_claim = self
            .desired_concurrency
            .saturating_sub(active_fetches)
            .min(available_slots);

        let mut jobs = Vec::with_capacity(to_claim);
        for _ in 0..to_claim {
            match self.tracker.claim(self.max_in_progress) {
                Some(claim) => jobs.push(FetchJob::new(Arc::clone(self), claim)),
                None => {
                    if self.tracker.to_fetch_count() > 0 {
                        self.metrics.claim_refused();
                    }
                    break;
                }
            }
        }

        if !jobs.is_empty() {
            self.metrics.jobs_issued(jobs.len());
            debug!(count = jobs.len(), active_fetches, "Issued fetch jobs");
        }
        jobs
    }

    /// Drop all pending work, tracker state and cached tiles.
    ///
    /// Fetches already in flight still finish and write their results to the
    /// cache; the tracker ignores their completions.
    pub fn clear_cache(&self) {
        let mut busy = self.busy.lock();
        let _ = self.mailbox.try_take();
        self.tracker.clear();
        self.cache.clear();
        info!("Fetch state cleared");
        self.refresh_busy(&mut busy);
    }

    /// Whether there is work left for the current viewport.
    pub fn busy(&self) -> bool {
        *self.busy.lock()
    }

    /// Subscribe to busy and data-changed events.
    pub fn subscribe(&self) -> broadcast::Receiver<FetchEvent> {
        self.events.subscribe()
    }

    /// Read a cached tile for drawing. Never triggers a fetch.
    pub fn find(&self, index: &TileIndex) -> Option<CachedTile<T>> {
        self.cache.find(index)
    }

    pub fn metrics(&self) -> TelemetrySnapshot {
        let tracker = self.tracker.snapshot();
        self.metrics.snapshot(
            tracker.to_fetch.len(),
            tracker.in_progress.len(),
            tracker.failed.len(),
            self.cache.stats(),
        )
    }

    pub fn tracker(&self) -> &FetchTracker {
        &self.tracker
    }

    pub fn cache(&self) -> &TileCache<CachedTile<T>> {
        &self.cache
    }

    pub fn strategy(&self) -> &dyn FetchStrategy {
        self.strategy.as_ref()
    }

    /// Signalled whenever new work may be available.
    pub fn notifier(&self) -> &Notify {
        &self.wake
    }

    // =========================================================================
    // Job plumbing
    // =========================================================================

    pub(crate) fn source(&self) -> &dyn TileSource<T> {
        self.source.as_ref()
    }

    /// Record the outcome of one fetch job.
    ///
    /// Success writes the cache before telling the tracker. A recomputation
    /// running at the same time learns about the completion from the
    /// tracker and does not queue the tile again.
    pub(crate) fn finish(&self, claim: &Claim, result: Result<Option<T>, FetchError>) {
        let index = claim.index();
        let error = match result {
            Ok(data) => {
                self.metrics.fetch_succeeded(data.is_none());
                self.cache.add(index, CachedTile::from(data));
                self.tracker.complete_claim(claim);
                debug!(
                    col = index.col,
                    row = index.row,
                    level = index.level,
                    "Tile fetched"
                );
                None
            }
            Err(err) => {
                self.metrics.fetch_failed();
                warn!(
                    col = index.col,
                    row = index.row,
                    level = index.level,
                    kind = err.kind(),
                    error = %err,
                    "Tile fetch failed"
                );
                self.tracker.fail_claim(claim);
                Some(Arc::new(err))
            }
        };

        {
            let mut busy = self.busy.lock();
            self.refresh_busy(&mut busy);
        }
        let _ = self.events.send(FetchEvent::DataChanged { index, error });
        self.wake.notify_waiters();
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Recompute the queue for `viewport` and retarget the cache.
    fn plan(&self, viewport: &ViewportState) {
        let outcome = self.tracker.recompute_detailed(
            viewport,
            self.schema.as_ref(),
            self.strategy.as_ref(),
            &self.cache,
        );
        self.metrics.recomputed(outcome.truncated);

        let (min, max) = self.occupancy.targets(outcome.needed);
        self.cache.set_target_occupancy(min, max);
        debug!(
            needed = outcome.needed,
            queued = outcome.queued,
            cache_min = min,
            cache_max = max,
            "Viewport planned"
        );
    }
}

impl<T> FetchPlanner<T> {
    /// Release the claim of a job that was dropped before finishing.
    pub(crate) fn abandon(&self, claim: &Claim) {
        let index = claim.index();
        warn!(
            col = index.col,
            row = index.row,
            level = index.level,
            "Fetch job dropped before finishing, releasing its claim"
        );
        self.tracker.fail_claim(claim);
        {
            let mut busy = self.busy.lock();
            self.refresh_busy(&mut busy);
        }
        self.wake.notify_waiters();
    }

    /// Busy while a viewport waits in the mailbox or the tracker has work.
    fn refresh_busy(&self, busy: &mut bool) {
        let value = self.mailbox.has_pending() || !self.tracker.is_done();
        self.set_busy(busy, value);
    }

    fn set_busy(&self, busy: &mut bool, value: bool) {
        if *busy != value {
            *busy = value;
            debug!(busy = value, "Busy state changed");
            let _ = self.events.send(FetchEvent::BusyChanged(value));
        }
    }
}

impl<T> std::fmt::Debug for FetchPlanner<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchPlanner")
            .field("strategy", &self.strategy.name())
            .field("tracker", &self.tracker)
            .field("mailbox", &self.mailbox)
            .field("desired_concurrency", &self.desired_concurrency)
            .field("max_in_progress", &self.max_in_progress)
            .finish_non_exhaustive()
    }
}
