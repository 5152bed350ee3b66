use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed training session, as written by the ingestion side.
/// `vdot_value` and `training_load` are filled in once by the fitness pass.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
  pub activity_id: String,
  pub start_time: DateTime<Utc>,
  pub distance: f64,
  pub duration: f64,
  pub average_heart_rate: Option<f64>,
  pub vdot_value: Option<f64>,
  pub training_load: Option<f64>,
  pub source: Option<String>,
}

/// A lap of an activity. Units: meters, seconds, s/km, steps/min, cm.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lap {
  pub activity_id: String,
  pub lap_index: i64,
  pub distance: Option<f64>,
  pub duration: Option<f64>,
  pub average_heart_rate: Option<f64>,
  pub average_pace: Option<f64>,
  pub average_cadence: Option<f64>,
  pub average_stride_length: Option<f64>,
}

/// Per-second sample used for charts
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityRecord {
  pub activity_id: String,
  pub elapsed_seconds: i64,
  pub heart_rate: Option<f64>,
  pub cadence: Option<f64>,
  pub stride_length: Option<f64>,
  pub pace: Option<f64>,
}
