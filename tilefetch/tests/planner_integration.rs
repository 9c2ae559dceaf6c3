//! Integration tests for the fetch planner.
//!
//! These tests drive the public API end to end:
//! - Viewport change → recompute → bounded, nearest-first job batches
//! - Failure amnesty on the next viewport change
//! - Cache sizing and eviction driven by the viewport
//! - Clearing state while fetches are in flight
//! - Claims released by stale or dropped jobs
//! - Busy convergence with the tokio worker pool
//!
//! Run with: `cargo test --test planner_integration`

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use tilefetch::cache::CachedTile;
use tilefetch::config::FetchConfig;
use tilefetch::fetch::{
    FetchEvent, FetchJob, FetchPlanner, FnTileSource, TrackerSnapshot, ViewportState,
};
use tilefetch::tile::{Extent, GridSchema, Level, TileIndex, TileRequest};
use tilefetch::worker::WorkerPool;
use tilefetch::FetchError;

// ============================================================================
// Helper Functions
// ============================================================================

/// 1000x1000 world with 100px tiles at 1 unit/px: a 10x10 matrix at level 0.
fn schema() -> Arc<GridSchema> {
    Arc::new(GridSchema::new(
        Extent::new(0.0, 0.0, 1000.0, 1000.0),
        100,
        vec![Level::new(0, 1.0)],
    ))
}

/// Viewport covering `cols` x `rows` tiles from the top-left corner.
fn view(cols: u32, rows: u32) -> ViewportState {
    ViewportState::new(
        Extent::new(
            0.0,
            1000.0 - rows as f64 * 100.0,
            cols as f64 * 100.0,
            1000.0,
        ),
        1.0,
    )
}

fn tile(col: u32, row: u32) -> TileIndex {
    TileIndex::new(col, row, 0)
}

/// Source that fails for the tiles in `failing` and counts its calls.
struct TestSource {
    failing: Mutex<HashSet<TileIndex>>,
    calls: Mutex<Vec<TileIndex>>,
}

impl TestSource {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn fail(&self, index: TileIndex) {
        self.failing.lock().insert(index);
    }

    fn heal(&self) {
        self.failing.lock().clear();
    }

    fn calls(&self) -> Vec<TileIndex> {
        self.calls.lock().clone()
    }
}

fn planner_with(config: FetchConfig, source: Arc<TestSource>) -> Arc<FetchPlanner<String>> {
    let fetch = FnTileSource::new(move |request: TileRequest| {
        let source = Arc::clone(&source);
        async move {
            let index = request.index();
            source.calls.lock().push(index);
            if source.failing.lock().contains(&index) {
                Err(FetchError::Unavailable(format!("tile {index} offline")))
            } else {
                Ok(Some(format!("tile {index}")))
            }
        }
    });
    Arc::new(FetchPlanner::new(schema(), Arc::new(fetch), &config))
}

fn indices(jobs: &[FetchJob<String>]) -> Vec<TileIndex> {
    jobs.iter().map(|job| job.index()).collect()
}

async fn run_all(jobs: Vec<FetchJob<String>>) {
    for job in jobs {
        job.run().await;
    }
}

fn busy_transitions(rx: &mut broadcast::Receiver<FetchEvent>) -> Vec<bool> {
    let mut transitions = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let FetchEvent::BusyChanged(busy) = event {
            transitions.push(busy);
        }
    }
    transitions
}

// ============================================================================
// Scenarios
// ============================================================================

/// Three tiles, two admitted; the third follows once one completes.
#[tokio::test]
async fn test_admission_then_next_claim() {
    let planner = planner_with(
        FetchConfig::default()
            .with_desired_concurrency(4)
            .with_max_in_progress(2),
        TestSource::new(),
    );

    // A 3x1 strip: the center tile is nearest, the sides tie in row order
    planner.on_viewport_changed(view(3, 1));
    let jobs = planner.get_fetch_jobs(0, 4);
    assert_eq!(indices(&jobs), vec![tile(1, 0), tile(0, 0)]);
    assert_eq!(planner.tracker().snapshot().to_fetch, vec![tile(2, 0)]);

    let mut jobs = jobs.into_iter();
    let first = jobs.next().unwrap();
    first.run().await;

    let next = planner.get_fetch_jobs(1, 4);
    assert_eq!(indices(&next), vec![tile(2, 0)]);

    run_all(jobs.chain(next).collect()).await;
    assert!(planner.tracker().is_done());
    assert!(!planner.busy());
}

/// A failed tile is not re-offered until the next viewport change.
#[tokio::test]
async fn test_failed_tile_retried_after_viewport_change() {
    let source = TestSource::new();
    source.fail(tile(0, 0));
    let planner = planner_with(FetchConfig::default(), Arc::clone(&source));
    let mut rx = planner.subscribe();

    planner.on_viewport_changed(view(2, 1));
    run_all(planner.get_fetch_jobs(0, 4)).await;

    assert!(planner.tracker().snapshot().failed.contains(&tile(0, 0)));
    assert!(planner.get_fetch_jobs(0, 4).is_empty(), "no retry yet");
    assert!(!planner.busy());

    let errors: Vec<TileIndex> = std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|event| match event {
            FetchEvent::DataChanged {
                index,
                error: Some(_),
            } => Some(index),
            _ => None,
        })
        .collect();
    assert_eq!(errors, vec![tile(0, 0)]);

    // Same viewport again: amnesty
    source.heal();
    planner.on_viewport_changed(view(2, 1));
    let retry = planner.get_fetch_jobs(0, 4);
    assert_eq!(indices(&retry), vec![tile(0, 0)]);
    assert_eq!(planner.tracker().failed_count(), 0);

    run_all(retry).await;
    assert!(planner.find(&tile(0, 0)).is_some());
    assert_eq!(
        source.calls().iter().filter(|&&i| i == tile(0, 0)).count(),
        2
    );
}

/// A cached tile counts toward the cache target but produces no job.
#[tokio::test]
async fn test_cached_tile_needs_no_fetch() {
    let source = TestSource::new();
    let planner = planner_with(FetchConfig::default(), Arc::clone(&source));
    planner
        .cache()
        .add(tile(0, 0), CachedTile::Data("warm".to_string()));

    planner.on_viewport_changed(view(1, 1));
    assert!(planner.get_fetch_jobs(0, 4).is_empty());

    assert!(planner.tracker().is_done());
    assert!(!planner.busy());
    assert_eq!(planner.cache().target_occupancy(), (51, 101));
    assert!(source.calls().is_empty());
}

/// Forty needed tiles give a 90..140 cache; the 141st entry trims to 90.
#[tokio::test]
async fn test_cache_occupancy_follows_viewport() {
    let planner = planner_with(FetchConfig::default(), TestSource::new());

    planner.on_viewport_changed(view(8, 5));
    planner.get_fetch_jobs(0, 0);
    assert_eq!(planner.cache().target_occupancy(), (90, 140));

    let cache = planner.cache();
    for i in 0..140u32 {
        cache.add(TileIndex::new(i, 0, 5), CachedTile::Empty);
    }
    assert_eq!(cache.len(), 140);

    // Touch the oldest entry so it survives
    assert!(planner.find(&TileIndex::new(0, 0, 5)).is_some());

    cache.add(TileIndex::new(140, 0, 5), CachedTile::Empty);
    assert_eq!(cache.len(), 90);
    assert!(cache.contains(&TileIndex::new(0, 0, 5)));
    for i in 1..52u32 {
        assert!(
            !cache.contains(&TileIndex::new(i, 0, 5)),
            "tile {i} should be evicted"
        );
    }
    for i in 52..=140u32 {
        assert!(cache.contains(&TileIndex::new(i, 0, 5)));
    }
}

/// Clearing with fetches in flight: the late completions are harmless.
#[tokio::test]
async fn test_clear_with_fetches_in_flight() {
    let source = TestSource::new();
    source.fail(tile(2, 0));
    let planner = planner_with(FetchConfig::default(), Arc::clone(&source));

    planner.on_viewport_changed(view(4, 1));
    let jobs = planner.get_fetch_jobs(0, 3);
    assert_eq!(jobs.len(), 3);
    assert_eq!(planner.tracker().in_progress_count(), 3);

    planner.clear_cache();
    let snapshot = planner.tracker().snapshot();
    assert!(snapshot.to_fetch.is_empty());
    assert!(snapshot.in_progress.is_empty());
    assert!(snapshot.failed.is_empty());
    assert!(!planner.busy());

    let in_flight = indices(&jobs);
    run_all(jobs).await;

    // Nothing leaked back into the tracker
    assert_eq!(planner.tracker().snapshot(), TrackerSnapshot::default());
    assert!(!planner.busy());
    // Successful stale fetches still populate the cache
    for index in in_flight {
        let cached = planner.find(&index);
        if index == tile(2, 0) {
            assert!(cached.is_none());
        } else {
            assert!(cached.is_some());
        }
    }
}

/// A stale job finishing after a clear leaves the newer claim of its tile alone.
#[tokio::test]
async fn test_stale_job_does_not_release_reclaimed_tile() {
    let source = TestSource::new();
    let planner = planner_with(FetchConfig::default(), Arc::clone(&source));

    planner.on_viewport_changed(view(1, 1));
    let stale = planner.get_fetch_jobs(0, 4);
    planner.clear_cache();
    planner.on_viewport_changed(view(1, 1));
    let live = planner.get_fetch_jobs(0, 4);
    assert_eq!(indices(&stale), indices(&live));

    run_all(stale).await;

    assert_eq!(planner.tracker().in_progress_count(), 1);
    assert!(planner.busy());
    assert!(planner.get_fetch_jobs(0, 4).is_empty(), "tile claimed once");

    run_all(live).await;
    assert!(planner.tracker().is_done());
    assert!(!planner.busy());
    assert_eq!(source.calls(), vec![tile(0, 0), tile(0, 0)]);
}

/// Jobs dropped unrun hand their tiles back for the next viewport.
#[tokio::test]
async fn test_dropped_jobs_release_admission_slots() {
    let planner = planner_with(
        FetchConfig::default().with_max_in_progress(2),
        TestSource::new(),
    );

    planner.on_viewport_changed(view(2, 1));
    drop(planner.get_fetch_jobs(0, 4));
    assert_eq!(planner.tracker().in_progress_count(), 0);
    assert_eq!(planner.tracker().failed_count(), 2);

    planner.on_viewport_changed(view(2, 1));
    let retry = planner.get_fetch_jobs(0, 4);
    assert_eq!(retry.len(), 2);
    run_all(retry).await;
    assert!(!planner.busy());
}

// ============================================================================
// Convergence
// ============================================================================

/// Draining a static viewport by hand takes one job per tile.
#[tokio::test]
async fn test_manual_drain_converges() {
    let planner = planner_with(FetchConfig::default(), TestSource::new());
    let mut rx = planner.subscribe();

    planner.on_viewport_changed(view(5, 4));
    let mut issued = 0;
    loop {
        let jobs = planner.get_fetch_jobs(0, 4);
        if jobs.is_empty() {
            break;
        }
        issued += jobs.len();
        run_all(jobs).await;
    }

    assert_eq!(issued, 20);
    assert!(planner.tracker().is_done());
    assert_eq!(busy_transitions(&mut rx), vec![true, false]);
    assert_eq!(planner.metrics().fetch_successes, 20);
}

/// With the worker pool, busy turns false exactly once per static viewport.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_pool_converges() {
    let source = TestSource::new();
    let config = FetchConfig::default();
    let planner = planner_with(config.clone(), Arc::clone(&source));
    let mut rx = planner.subscribe();
    let pool = WorkerPool::start(Arc::clone(&planner), &config, CancellationToken::new());

    planner.on_viewport_changed(view(10, 10));

    let mut transitions = Vec::new();
    let mut data_events = 0;
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Ok(FetchEvent::BusyChanged(busy)) => {
                    transitions.push(busy);
                    if !busy {
                        break;
                    }
                }
                Ok(FetchEvent::DataChanged { .. }) => data_events += 1,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
    .await
    .expect("viewport never finished");

    // Let stragglers land before counting
    tokio::time::sleep(Duration::from_millis(50)).await;
    while let Ok(event) = rx.try_recv() {
        match event {
            FetchEvent::BusyChanged(busy) => transitions.push(busy),
            FetchEvent::DataChanged { .. } => data_events += 1,
        }
    }

    assert_eq!(transitions, vec![true, false]);
    assert_eq!(data_events, 100);
    assert_eq!(source.calls().len(), 100);
    assert_eq!(pool.active_fetches(), 0);

    for col in 0..10 {
        for row in 0..10 {
            assert_eq!(
                planner.find(&tile(col, row)),
                Some(CachedTile::Data(format!("tile {}", tile(col, row))))
            );
        }
    }

    pool.shutdown().await;
}

/// Panning while workers run moves the queue to the new viewport.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pan_while_fetching() {
    let config = FetchConfig::default().with_worker_count(2);
    let planner = planner_with(config.clone(), TestSource::new());
    let mut rx = planner.subscribe();
    let pool = WorkerPool::start(Arc::clone(&planner), &config, CancellationToken::new());

    for step in 0..5u32 {
        let offset = step as f64 * 100.0;
        planner.on_viewport_changed(ViewportState::new(
            Extent::new(offset, 700.0, offset + 300.0, 1000.0),
            1.0,
        ));
        tokio::task::yield_now().await;
    }

    tokio::time::timeout(Duration::from_secs(10), async {
        while planner.busy() {
            let _ = rx.recv().await;
        }
    })
    .await
    .expect("pan never settled");

    // Every tile of the final viewport is cached
    for col in 4..7 {
        for row in 0..3 {
            assert!(planner.find(&tile(col, row)).is_some());
        }
    }
    pool.shutdown().await;
}
