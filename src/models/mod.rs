pub mod activity;
pub mod cache;

pub use activity::{Activity, ActivityRecord, Lap};
pub use cache::{VdotTrendCacheEntry, ZoneStatsCacheEntry};
