//! INI serialization for `FetchConfig`.

use super::FetchConfig;

/// Render `config` as commented INI text.
pub(super) fn to_ini_string(config: &FetchConfig) -> String {
    format!(
        r#"[fetch]
; Worker tasks executing fetch jobs
workers = {}
; Fetches the planner tries to keep running at once
desired_concurrency = {}
; Hard cap on tiles in flight
max_in_progress = {}
; Tiles requested by one viewport change before truncation
max_tiles_per_update = {}
; Buffered events per subscriber
event_capacity = {}

[cache]
; Tiles kept beyond the viewport's needs after eviction
min_extra = {}
; Tiles allowed beyond the viewport's needs before eviction
max_extra = {}

[strategy]
; Coarser fallback levels fetched behind the target level (0 = target only)
max_levels_up = {}
; Margin around the viewport, percent of width/height per side
margin_percent = {}
"#,
        config.worker_count,
        config.desired_concurrency,
        config.max_in_progress,
        config.max_tiles_per_update,
        config.event_capacity,
        config.occupancy.min_extra,
        config.occupancy.max_extra,
        config.max_levels_up,
        config.margin_percent,
    )
}
