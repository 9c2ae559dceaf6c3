//! Engine configuration.
//!
//! [`FetchConfig`] carries every tunable of the planner, tracker, cache and
//! worker pool. It can be built in code with `with_*` methods or loaded from
//! an INI file:
//!
//! ```ini
//! [fetch]
//! workers = 4
//! desired_concurrency = 4
//! max_in_progress = 4
//! max_tiles_per_update = 1024
//! event_capacity = 256
//!
//! [cache]
//! min_extra = 50
//! max_extra = 100
//!
//! [strategy]
//! max_levels_up = 0
//! margin_percent = 0
//! ```
//!
//! Missing sections and keys keep their defaults; unknown keys are ignored.

mod error;
mod parser;
mod settings;
mod writer;

pub use error::ConfigError;
pub use settings::{
    FetchConfig, DEFAULT_DESIRED_CONCURRENCY, DEFAULT_EVENT_CAPACITY, DEFAULT_MARGIN_PERCENT,
    DEFAULT_MAX_IN_PROGRESS, DEFAULT_MAX_LEVELS_UP, DEFAULT_WORKER_COUNT,
};
