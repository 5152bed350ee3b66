//! Training metrics engine: HR zones, VDOT and training load, pace zones,
//! and the per-period aggregate caches that trend views read from.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod fitness;
pub mod models;
pub mod pace_zones;
pub mod series;
pub mod zones;

#[cfg(test)]
mod test_utils;

pub use cache::{CacheBuilder, DateRange, PeriodSelection, PeriodType, RebuildMode, RebuildOptions, WeekNumbering};
pub use config::EngineConfig;
pub use error::{MetricsError, Result};
pub use fitness::{compute_activity_fitness, FitnessCalculator};
pub use pace_zones::{format_pace, pace_zone_bounds, PaceZoneBounds};
pub use series::{clean_records, clean_series};
pub use zones::HrZone;
