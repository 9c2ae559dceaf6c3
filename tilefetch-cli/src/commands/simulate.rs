//! `tilefetch simulate`: exercise the engine against a synthetic source.
//!
//! A virtual 1024x768 px viewport pans east across a Web Mercator grid, one
//! step at a time. Every step is reported to the planner as a viewport
//! change while the worker pool fetches from an in-memory source with
//! configurable latency, failures and empty tiles. Once the final viewport
//! settles, the telemetry summary is printed.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::info;

use tilefetch::config::FetchConfig;
use tilefetch::fetch::{
    BoxFuture, ChangeType, FetchEvent, FetchPlanner, TileSource, ViewportState,
};
use tilefetch::logging::{default_log_dir, default_log_file, init_logging};
use tilefetch::tile::{Extent, GridSchema, TileRequest, TileSchema, DEFAULT_TILE_SIZE};
use tilefetch::worker::WorkerPool;
use tilefetch::FetchError;

use super::load_config;
use crate::error::CliError;

/// Virtual screen size in pixels.
const SCREEN_WIDTH_PX: f64 = 1024.0;
const SCREEN_HEIGHT_PX: f64 = 768.0;

/// Deepest level the synthetic Web Mercator grid offers.
const MAX_LEVEL: u8 = 22;

/// How long the last viewport may take to settle.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// INI file to load instead of the built-in defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of fetch workers (overrides the config file)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Number of pan steps
    #[arg(long, default_value = "20")]
    pub steps: u32,

    /// Distance panned per step, in tiles
    #[arg(long, default_value = "0.5")]
    pub pan_tiles: f64,

    /// Simulated latency of every fetch, in milliseconds
    #[arg(long, default_value = "20")]
    pub latency_ms: u64,

    /// Make every Nth fetch fail (0 disables)
    #[arg(long, default_value = "0")]
    pub fail_every: u64,

    /// Make every Nth fetch return no data (0 disables)
    #[arg(long, default_value = "0")]
    pub empty_every: u64,

    /// Zoom level of the viewport
    #[arg(long, default_value = "12")]
    pub level: u8,

    /// Directory for the log file
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

pub fn run(args: SimulateArgs) -> Result<(), CliError> {
    if args.level > MAX_LEVEL {
        return Err(CliError::InvalidArgument(format!(
            "level must be at most {MAX_LEVEL}, got {}",
            args.level
        )));
    }
    if !args.pan_tiles.is_finite() {
        return Err(CliError::InvalidArgument(
            "pan-tiles must be a finite number".to_string(),
        ));
    }

    let mut config = load_config(args.config.as_deref())?;
    if let Some(workers) = args.workers {
        config = config.with_worker_count(workers);
    }
    config.validate()?;

    let log_dir = args
        .log_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(default_log_dir()));
    let guard = init_logging(&log_dir, default_log_file(), false).map_err(CliError::LoggingInit)?;
    println!("Logging to {}", guard.path().display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::RuntimeCreation)?;

    runtime.block_on(simulate(&args, &config))
}

async fn simulate(args: &SimulateArgs, config: &FetchConfig) -> Result<(), CliError> {
    let schema = Arc::new(GridSchema::web_mercator(MAX_LEVEL));
    let resolution = schema
        .level(args.level)
        .map(|level| level.units_per_pixel)
        .ok_or_else(|| CliError::InvalidArgument(format!("unknown level {}", args.level)))?;

    let source = Arc::new(SyntheticSource::new(
        Duration::from_millis(args.latency_ms),
        args.fail_every,
        args.empty_every,
    ));
    let planner: Arc<FetchPlanner<Arc<[u8]>>> = Arc::new(FetchPlanner::new(
        schema,
        Arc::clone(&source) as Arc<dyn TileSource<Arc<[u8]>>>,
        config,
    ));
    let mut events = planner.subscribe();
    let pool = WorkerPool::start(Arc::clone(&planner), config, CancellationToken::new());

    info!(
        steps = args.steps,
        level = args.level,
        workers = pool.worker_count(),
        "Simulation started"
    );

    let step_delay = Duration::from_millis(args.latency_ms.max(1));
    for step in 0..=args.steps {
        planner.on_viewport_changed(viewport_at(step, args.steps, args.pan_tiles, resolution));
        tokio::time::sleep(step_delay).await;
    }

    let settled = tokio::time::timeout(SETTLE_TIMEOUT, wait_until_idle(&planner, &mut events)).await;
    pool.shutdown().await;
    settled.map_err(|_| CliError::Timeout(SETTLE_TIMEOUT))?;

    info!(fetches = source.calls(), "Simulation finished");
    println!("{}", planner.metrics());
    Ok(())
}

async fn wait_until_idle<T: Clone + Send + Sync + 'static>(
    planner: &FetchPlanner<T>,
    events: &mut broadcast::Receiver<FetchEvent>,
) {
    while planner.busy() {
        if let Err(broadcast::error::RecvError::Closed) = events.recv().await {
            break;
        }
    }
}

/// Viewport for one pan step.
///
/// The first and last steps are discrete changes; the ones in between are
/// part of a continuous drag.
fn viewport_at(step: u32, steps: u32, pan_tiles: f64, resolution: f64) -> ViewportState {
    let tile_span = DEFAULT_TILE_SIZE as f64 * resolution;
    let center_x = step as f64 * pan_tiles * tile_span;
    let extent = Extent::from_center(
        center_x,
        0.0,
        SCREEN_WIDTH_PX * resolution,
        SCREEN_HEIGHT_PX * resolution,
    );

    let change = if step == 0 || step == steps {
        ChangeType::Discrete
    } else {
        ChangeType::Continuous
    };
    ViewportState::new(extent, resolution).with_change(change)
}

// =============================================================================
// Synthetic source
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Data,
    Empty,
    Fail,
}

/// Outcome of the `call`th fetch (1-based). Failures win over empty tiles.
fn outcome(call: u64, fail_every: u64, empty_every: u64) -> Outcome {
    if fail_every > 0 && call % fail_every == 0 {
        Outcome::Fail
    } else if empty_every > 0 && call % empty_every == 0 {
        Outcome::Empty
    } else {
        Outcome::Data
    }
}

/// In-memory tile source with fixed latency.
struct SyntheticSource {
    latency: Duration,
    fail_every: u64,
    empty_every: u64,
    calls: AtomicU64,
}

impl SyntheticSource {
    fn new(latency: Duration, fail_every: u64, empty_every: u64) -> Self {
        Self {
            latency,
            fail_every,
            empty_every,
            calls: AtomicU64::new(0),
        }
    }

    fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl TileSource<Arc<[u8]>> for SyntheticSource {
    fn fetch(&self, request: TileRequest) -> BoxFuture<'_, Result<Option<Arc<[u8]>>, FetchError>> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        Box::pin(async move {
            tokio::time::sleep(self.latency).await;
            let index = request.index();
            match outcome(call, self.fail_every, self.empty_every) {
                Outcome::Fail => Err(FetchError::Unavailable(format!(
                    "synthetic failure for tile {index}"
                ))),
                Outcome::Empty => Ok(None),
                Outcome::Data => {
                    let payload: Arc<[u8]> = index.to_string().into_bytes().into();
                    Ok(Some(payload))
                }
            }
        })
    }
}
