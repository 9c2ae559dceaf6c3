//! Fixed-size pool of fetch workers on the tokio runtime.
//!
//! # Worker Loop
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ register for wake-up                         │
//! │ get_fetch_jobs(active, 1)                    │
//! │   ├─ job  ──► run (active += 1) ──► loop     │
//! │   └─ none ──► wait: wake-up | shutdown       │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Interest in the wake-up is registered before asking for work, so a
//! viewport change or completion that lands in between is not missed.
//! Shutdown is only observed between jobs; a fetch in flight always runs to
//! completion.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::FetchConfig;
use crate::fetch::FetchPlanner;

/// Runs fetch jobs for one planner on `worker_count` tokio tasks.
#[derive(Debug)]
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    active: Arc<AtomicUsize>,
    shutdown: CancellationToken,
}

impl WorkerPool {
    /// Spawn the workers. Must be called from within a tokio runtime.
    ///
    /// Cancelling `shutdown` stops the pool just like
    /// [`shutdown`](Self::shutdown), minus the join.
    pub fn start<T: Clone + Send + Sync + 'static>(
        planner: Arc<FetchPlanner<T>>,
        config: &FetchConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let worker_count = config.worker_count.max(1);
        let active = Arc::new(AtomicUsize::new(0));

        let handles = (0..worker_count)
            .map(|id| {
                let planner = Arc::clone(&planner);
                let active = Arc::clone(&active);
                let shutdown = shutdown.clone();
                tokio::spawn(run_worker(id, planner, active, shutdown))
            })
            .collect();

        info!(
            workers = worker_count,
            strategy = planner.strategy().name(),
            "Fetch worker pool started"
        );

        Self {
            handles,
            active,
            shutdown,
        }
    }

    /// Jobs currently running across all workers.
    pub fn active_fetches(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Stop the workers and wait for them to exit.
    ///
    /// Running jobs finish first, so their results still reach the cache.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for result in join_all(self.handles).await {
            if let Err(e) = result {
                warn!(error = %e, "Fetch worker ended abnormally");
            }
        }
        info!("Fetch worker pool stopped");
    }
}

async fn run_worker<T: Clone + Send + Sync + 'static>(
    id: usize,
    planner: Arc<FetchPlanner<T>>,
    active: Arc<AtomicUsize>,
    shutdown: CancellationToken,
) {
    debug!(worker = id, "Fetch worker started");

    while !shutdown.is_cancelled() {
        let notified = planner.notifier().notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        let jobs = planner.get_fetch_jobs(active.load(Ordering::SeqCst), 1);
        if jobs.is_empty() {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,
                _ = &mut notified => {}
            }
            continue;
        }

        for job in jobs {
            active.fetch_add(1, Ordering::SeqCst);
            job.run().await;
            active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    debug!(worker = id, "Fetch worker stopped");
}
