//! Fetch tracker: the sequencing core of the engine.
//!
//! The tracker owns three pairwise disjoint sets of tiles, all guarded by a
//! single mutex:
//!
//! ```text
//!   recompute            try_claim                complete
//! ──────────► to-fetch ────────────► in-progress ──────────► (cache)
//!             (queue)                    │
//!                                        │ fail
//!                                        ▼
//!                                     failed ──── cleared by next recompute
//! ```
//!
//! `try_claim` is the only admission-control point: it refuses to move a
//! tile into in-progress once `max_in_progress` tiles are in flight, and a
//! refusal leaves the queue untouched.
//!
//! Every claim carries a ticket. Completions reported through a [`Claim`]
//! only ever retire the claim they belong to, even when the same tile has
//! been cleared and claimed again in the meantime.
//!
//! The tile cache is checked without the tracker lock; the two are never
//! locked together. Tiles completed while that lookup runs are recorded and
//! kept out of the new queue, since their cache write may have landed after
//! the lookup read it.

use std::collections::{HashMap, HashSet, VecDeque};

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use super::ViewportState;
use crate::cache::TileCache;
use crate::strategy::FetchStrategy;
use crate::tile::{nearest_level, TileIndex, TileRequest, TileSchema};

/// Default cap on tiles requested by one recomputation.
pub const DEFAULT_MAX_TILES_PER_UPDATE: usize = 1024;

/// Result of one recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecomputeOutcome {
    /// Tiles the viewport needs, including cached and in-flight ones
    pub needed: usize,
    /// Tiles placed in the to-fetch queue
    pub queued: usize,
    /// Whether the strategy output exceeded the safety cap
    pub truncated: bool,
}

/// Copy of the tracker sets, for tests and diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerSnapshot {
    /// Queue contents in claim order
    pub to_fetch: Vec<TileIndex>,
    pub in_progress: HashSet<TileIndex>,
    pub failed: HashSet<TileIndex>,
}

impl TrackerSnapshot {
    /// Whether no tile appears in more than one set.
    pub fn is_disjoint(&self) -> bool {
        let queued: HashSet<TileIndex> = self.to_fetch.iter().copied().collect();
        queued.len() == self.to_fetch.len()
            && queued.is_disjoint(&self.in_progress)
            && queued.is_disjoint(&self.failed)
            && self.in_progress.is_disjoint(&self.failed)
    }
}

/// One tile handed out by [`FetchTracker::claim`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Claim {
    request: TileRequest,
    ticket: u64,
}

impl Claim {
    pub fn request(&self) -> &TileRequest {
        &self.request
    }

    pub fn index(&self) -> TileIndex {
        self.request.index()
    }
}

#[derive(Debug, Default)]
struct TrackerState {
    to_fetch: VecDeque<TileRequest>,
    /// Tile to the ticket of its live claim
    in_progress: HashMap<TileIndex, u64>,
    failed: HashSet<TileIndex>,
    /// Tickets of claims that were in flight when `clear` ran. Their
    /// completions are expected and ignored.
    detached: HashMap<u64, TileIndex>,
    /// Successful completions while the current recompute reads the cache
    completed_during_lookup: Option<HashSet<TileIndex>>,
    next_ticket: u64,
}

impl TrackerState {
    fn record_success(&mut self, index: TileIndex) {
        if let Some(completed) = self.completed_during_lookup.as_mut() {
            completed.insert(index);
        }
    }

    fn retire(&mut self, claim: &Claim) -> Retired {
        let index = claim.index();
        if self.in_progress.get(&index) == Some(&claim.ticket) {
            self.in_progress.remove(&index);
            Retired::Live
        } else if self.detached.remove(&claim.ticket).is_some() {
            Retired::Detached
        } else {
            Retired::Unknown
        }
    }

    /// Drop one detached claim of `index`, if any.
    fn forget_detached(&mut self, index: &TileIndex) -> bool {
        let ticket = self
            .detached
            .iter()
            .find(|(_, detached)| *detached == index)
            .map(|(ticket, _)| *ticket);
        ticket
            .and_then(|ticket| self.detached.remove(&ticket))
            .is_some()
    }
}

enum Retired {
    Live,
    Detached,
    Unknown,
}

/// Tracks which tiles still need fetching, which are in flight, and which
/// failed during the current viewport generation.
#[derive(Debug)]
pub struct FetchTracker {
    state: Mutex<TrackerState>,
    max_tiles_per_update: usize,
}

impl Default for FetchTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TILES_PER_UPDATE)
    }
}

impl FetchTracker {
    /// Create a tracker that requests at most `max_tiles_per_update` tiles
    /// per recomputation.
    pub fn new(max_tiles_per_update: usize) -> Self {
        Self {
            state: Mutex::new(TrackerState::default()),
            max_tiles_per_update,
        }
    }

    pub fn max_tiles_per_update(&self) -> usize {
        self.max_tiles_per_update
    }

    /// Rebuild the to-fetch queue for a new viewport.
    ///
    /// Returns the number of tiles the viewport needs (after the safety
    /// cap), which sizes the cache. See [`recompute_detailed`](Self::recompute_detailed).
    pub fn recompute<C: Clone + Send + Sync>(
        &self,
        viewport: &ViewportState,
        schema: &dyn TileSchema,
        strategy: &dyn FetchStrategy,
        cache: &TileCache<C>,
    ) -> usize {
        self.recompute_detailed(viewport, schema, strategy, cache)
            .needed
    }

    /// Rebuild the to-fetch queue and report what happened.
    ///
    /// Runs `strategy` at the schema level nearest to the viewport
    /// resolution, dedupes the result, clears the failed set, then queues
    /// every tile that is neither cached nor in flight. A tile that
    /// completes while the cache is being checked is not queued.
    pub fn recompute_detailed<C: Clone + Send + Sync>(
        &self,
        viewport: &ViewportState,
        schema: &dyn TileSchema,
        strategy: &dyn FetchStrategy,
        cache: &TileCache<C>,
    ) -> RecomputeOutcome {
        let mut requests = match nearest_level(&schema.levels(), viewport.resolution) {
            Some(level) => strategy.get(schema, &viewport.extent, level.id),
            None => {
                debug!(
                    resolution = viewport.resolution,
                    "No schema level for viewport resolution"
                );
                Vec::new()
            }
        };

        let mut seen = HashSet::with_capacity(requests.len());
        requests.retain(|request| seen.insert(request.index()));

        let truncated = requests.len() > self.max_tiles_per_update;
        if truncated {
            warn!(
                requested = requests.len(),
                cap = self.max_tiles_per_update,
                strategy = strategy.name(),
                "Viewport requested too many tiles, truncating"
            );
            requests.truncate(self.max_tiles_per_update);
        }
        let needed = requests.len();

        self.state.lock().completed_during_lookup = Some(HashSet::new());
        requests.retain(|request| !cache.contains(&request.index()));

        let mut state = self.state.lock();
        let completed = state.completed_during_lookup.take().unwrap_or_default();
        state.failed.clear();
        let in_progress = &state.in_progress;
        let to_fetch: VecDeque<TileRequest> = requests
            .into_iter()
            .filter(|request| {
                let index = request.index();
                !in_progress.contains_key(&index) && !completed.contains(&index)
            })
            .collect();
        let queued = to_fetch.len();
        state.to_fetch = to_fetch;

        debug!(
            needed,
            queued,
            in_progress = state.in_progress.len(),
            change = ?viewport.change,
            "Fetch queue recomputed"
        );

        RecomputeOutcome {
            needed,
            queued,
            truncated,
        }
    }

    /// Move the head of the queue into in-progress.
    ///
    /// Returns `None` if the queue is empty or `max_in_progress` tiles are
    /// already in flight. A refusal leaves the queue unchanged.
    pub fn try_claim(&self, max_in_progress: usize) -> Option<TileRequest> {
        self.claim(max_in_progress).map(|claim| claim.request)
    }

    /// Like [`try_claim`](Self::try_claim), but returns a ticketed [`Claim`]
    /// for [`complete_claim`](Self::complete_claim) and
    /// [`fail_claim`](Self::fail_claim).
    pub fn claim(&self, max_in_progress: usize) -> Option<Claim> {
        let mut state = self.state.lock();
        if state.in_progress.len() >= max_in_progress {
            return None;
        }
        let request = state.to_fetch.pop_front()?;
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.in_progress.insert(request.index(), ticket);
        Some(Claim { request, ticket })
    }

    /// Record a successful fetch of `index`.
    ///
    /// The caller writes the cache first. Retires the live claim of the tile
    /// if there is one, otherwise a claim detached by [`clear`](Self::clear).
    /// Returns `false` unless a live claim was retired.
    pub fn complete(&self, index: &TileIndex) -> bool {
        let mut state = self.state.lock();
        state.record_success(*index);
        let retired = if state.in_progress.remove(index).is_some() {
            Retired::Live
        } else if state.forget_detached(index) {
            Retired::Detached
        } else {
            Retired::Unknown
        };
        log_retired(index, retired, "completion")
    }

    /// Record a failed fetch of `index`. The tile stays out of the queue
    /// until the next recomputation.
    pub fn fail(&self, index: &TileIndex) -> bool {
        let mut state = self.state.lock();
        let retired = if state.in_progress.remove(index).is_some() {
            state.failed.insert(*index);
            Retired::Live
        } else if state.forget_detached(index) {
            Retired::Detached
        } else {
            Retired::Unknown
        };
        log_retired(index, retired, "failure")
    }

    /// Record a successful fetch for exactly this claim.
    ///
    /// Returns `false` if the claim was detached by `clear` or already
    /// retired; a newer claim of the same tile is left alone.
    pub fn complete_claim(&self, claim: &Claim) -> bool {
        let index = claim.index();
        let mut state = self.state.lock();
        state.record_success(index);
        let retired = state.retire(claim);
        log_retired(&index, retired, "completion")
    }

    /// Record a failed fetch for exactly this claim.
    pub fn fail_claim(&self, claim: &Claim) -> bool {
        let index = claim.index();
        let mut state = self.state.lock();
        let retired = state.retire(claim);
        if matches!(retired, Retired::Live) {
            state.failed.insert(index);
        }
        log_retired(&index, retired, "failure")
    }

    /// Nothing queued and nothing in flight.
    pub fn is_done(&self) -> bool {
        let state = self.state.lock();
        state.to_fetch.is_empty() && state.in_progress.is_empty()
    }

    /// Empty all three sets.
    ///
    /// Fetches still in flight are remembered so their late completions are
    /// ignored quietly.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let in_flight: Vec<(TileIndex, u64)> = state.in_progress.drain().collect();
        state
            .detached
            .extend(in_flight.into_iter().map(|(index, ticket)| (ticket, index)));
        state.to_fetch.clear();
        state.failed.clear();
    }

    pub fn to_fetch_count(&self) -> usize {
        self.state.lock().to_fetch.len()
    }

    pub fn in_progress_count(&self) -> usize {
        self.state.lock().in_progress.len()
    }

    pub fn failed_count(&self) -> usize {
        self.state.lock().failed.len()
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        let state = self.state.lock();
        TrackerSnapshot {
            to_fetch: state.to_fetch.iter().map(|r| r.index()).collect(),
            in_progress: state.in_progress.keys().copied().collect(),
            failed: state.failed.clone(),
        }
    }
}

fn log_retired(index: &TileIndex, retired: Retired, what: &str) -> bool {
    match retired {
        Retired::Live => true,
        Retired::Detached => {
            debug!(
                col = index.col,
                row = index.row,
                level = index.level,
                "Ignoring {what} of tile detached by clear"
            );
            false
        }
        Retired::Unknown => {
            error!(
                col = index.col,
                row = index.row,
                level = index.level,
                "Reported {what} for a tile that was not in progress"
            );
            false
        }
    }
}
