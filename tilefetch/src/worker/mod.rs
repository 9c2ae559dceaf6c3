//! Worker pool executing fetch jobs.
//!
//! Workers pull jobs from a [`FetchPlanner`](crate::fetch::FetchPlanner)
//! one at a time and sleep on the planner's notifier when there is nothing
//! to do.

mod pool;

pub use pool::WorkerPool;
