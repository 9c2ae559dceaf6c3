//! Fetch jobs handed out by the planner.

use std::fmt;
use std::sync::Arc;

use super::{Claim, FetchPlanner};
use crate::tile::{TileIndex, TileRequest};

/// One claimed tile, ready to be fetched.
///
/// A job captures only its claim and a handle to the planner that issued
/// it. Running it fetches the tile from the planner's source and records the
/// outcome: cache write and tracker completion on success, tracker failure
/// otherwise, followed by a busy refresh and a
/// [`DataChanged`](super::FetchEvent::DataChanged) event in both cases.
///
/// A job dropped before its fetch finished (never run, cancelled, or
/// panicked) releases its claim as a failure, so the tile is retried on the
/// next recomputation.
pub struct FetchJob<T> {
    planner: Arc<FetchPlanner<T>>,
    claim: Claim,
    finished: bool,
}

impl<T: Clone + Send + Sync + 'static> FetchJob<T> {
    pub(crate) fn new(planner: Arc<FetchPlanner<T>>, claim: Claim) -> Self {
        Self {
            planner,
            claim,
            finished: false,
        }
    }

    pub fn request(&self) -> &TileRequest {
        self.claim.request()
    }

    pub fn index(&self) -> TileIndex {
        self.claim.index()
    }

    /// Fetch the tile and record the result. Errors are absorbed.
    pub async fn run(mut self) {
        let result = self.planner.source().fetch(*self.claim.request()).await;
        self.planner.finish(&self.claim, result);
        self.finished = true;
    }
}

impl<T> Drop for FetchJob<T> {
    fn drop(&mut self) {
        if !self.finished {
            self.planner.abandon(&self.claim);
        }
    }
}

impl<T> fmt::Debug for FetchJob<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchJob")
            .field("request", self.claim.request())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachedTile;
    use crate::config::FetchConfig;
    use crate::error::FetchError;
    use crate::fetch::{FetchEvent, FnTileSource, ViewportState};
    use crate::tile::{Extent, GridSchema, Level};

    fn planner(fail: bool) -> Arc<FetchPlanner<String>> {
        let schema = GridSchema::new(
            Extent::new(0.0, 0.0, 200.0, 200.0),
            100,
            vec![Level::new(0, 1.0)],
        );
        let source = FnTileSource::new(move |request: TileRequest| async move {
            if fail {
                Err(FetchError::Unavailable(format!("no tile {}", request.index())))
            } else {
                Ok(Some(request.index().to_string()))
            }
        });
        Arc::new(FetchPlanner::new(
            Arc::new(schema),
            Arc::new(source),
            &FetchConfig::default(),
        ))
    }

    fn one_job(planner: &Arc<FetchPlanner<String>>) -> FetchJob<String> {
        planner.on_viewport_changed(ViewportState::new(
            Extent::new(0.0, 100.0, 100.0, 200.0),
            1.0,
        ));
        let mut jobs = planner.get_fetch_jobs(0, 1);
        assert_eq!(jobs.len(), 1);
        jobs.remove(0)
    }

    #[tokio::test]
    async fn test_success_writes_cache_then_completes() {
        let planner = planner(false);
        let job = one_job(&planner);
        let index = job.index();
        assert_eq!(job.request().index(), index);
        assert_eq!(planner.tracker().in_progress_count(), 1);

        job.run().await;

        assert_eq!(
            planner.find(&index),
            Some(CachedTile::Data(index.to_string()))
        );
        assert_eq!(planner.tracker().in_progress_count(), 0);
        assert_eq!(planner.metrics().fetch_successes, 1);
    }

    #[tokio::test]
    async fn test_failure_is_recorded_and_broadcast() {
        let planner = planner(true);
        let mut rx = planner.subscribe();
        let job = one_job(&planner);
        let index = job.index();

        job.run().await;

        assert!(planner.tracker().snapshot().failed.contains(&index));
        assert!(planner.find(&index).is_none());
        assert!(!planner.busy());

        let mut saw_error = false;
        while let Ok(event) = rx.try_recv() {
            if let FetchEvent::DataChanged { index: i, error } = &event {
                assert_eq!(*i, index);
                let error = error.as_ref().expect("error payload");
                assert!(error.to_string().contains("no tile"));
                saw_error = event.is_error();
            }
        }
        assert!(saw_error);
    }

    #[test]
    fn test_dropped_job_releases_claim() {
        let planner = planner(false);
        let mut rx = planner.subscribe();
        let job = one_job(&planner);
        let index = job.index();

        drop(job);

        assert_eq!(planner.tracker().in_progress_count(), 0);
        assert!(planner.tracker().snapshot().failed.contains(&index));
        assert!(!planner.busy());
        assert!(std::iter::from_fn(|| rx.try_recv().ok())
            .any(|event| matches!(event, FetchEvent::BusyChanged(false))));
    }

    #[tokio::test]
    async fn test_cancelled_job_releases_claim() {
        let source = FnTileSource::new(|_: TileRequest| {
            futures::future::pending::<Result<Option<String>, FetchError>>()
        });
        let planner: Arc<FetchPlanner<String>> = Arc::new(FetchPlanner::new(
            Arc::new(GridSchema::new(
                Extent::new(0.0, 0.0, 200.0, 200.0),
                100,
                vec![Level::new(0, 1.0)],
            )),
            Arc::new(source),
            &FetchConfig::default(),
        ));
        let job = one_job(&planner);

        let outcome = tokio::time::timeout(std::time::Duration::from_millis(20), job.run()).await;

        assert!(outcome.is_err());
        assert_eq!(planner.tracker().in_progress_count(), 0);
        assert!(planner.tracker().is_done());
    }

    #[tokio::test]
    async fn test_finished_job_is_not_released_twice() {
        let planner = planner(false);
        let job = one_job(&planner);
        let index = job.index();

        job.run().await;

        assert!(planner.tracker().snapshot().failed.is_empty());
        assert!(planner.find(&index).is_some());
    }
}
