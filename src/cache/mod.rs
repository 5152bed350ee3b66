//! Per-period aggregate caches: hr_zone_stats_cache and vdot_trend_cache

pub mod accumulate;
pub mod builder;
pub mod period;
pub mod queries;
pub mod store;

pub use builder::{CacheBuilder, PassSummary, RebuildMode, RebuildOptions, RebuildSummary};
pub use period::{
  date_period_key, parse_date, period_bounds, period_key, DateRange, PeriodRange, PeriodSelection, PeriodType,
  WeekNumbering,
};
pub use queries::{
  load_activities, load_activity_laps, load_activity_records, load_vdot_trend, load_zone_stats, pace_zone_stats,
  PaceZoneStat,
};
pub use store::{clear_cache, purge_unsourced_activities, ClearedCache, PurgeResult};
