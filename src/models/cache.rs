use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::PeriodType;

/// Aggregated lap statistics for one (period, period type, HR zone)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ZoneStatsCacheEntry {
  pub period: String,
  pub period_type: PeriodType,
  pub hr_zone: i64,
  /// Distinct activities with at least one lap in this zone
  pub activity_count: i64,
  pub total_duration: f64,
  pub total_distance: f64,
  pub avg_pace: Option<f64>,
  pub avg_cadence: Option<f64>,
  pub avg_stride_length: Option<f64>,
  pub avg_heart_rate: Option<f64>,
  pub updated_at: Option<DateTime<Utc>>,
}

/// VDOT trend for one (period, period type)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VdotTrendCacheEntry {
  pub period: String,
  pub period_type: PeriodType,
  pub avg_vdot: f64,
  pub max_vdot: f64,
  pub min_vdot: f64,
  pub activity_count: i64,
  pub total_distance: f64,
  pub total_duration: f64,
  pub updated_at: Option<DateTime<Utc>>,
}
