//! Display-time cleaning of per-second record series
//!
//! Values outside a plausible range (sensor dropouts, GPS spikes) are replaced
//! by the last plausible value seen so far. This only shapes what is charted;
//! stored records are never modified.

use serde::Serialize;

use crate::models::ActivityRecord;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlausibleRange {
  pub min: f64,
  pub max: f64,
}

impl PlausibleRange {
  pub const fn new(min: f64, max: f64) -> Self {
    Self { min, max }
  }

  pub fn contains(&self, value: f64) -> bool {
    value >= self.min && value <= self.max
  }
}

/// Heart rate, bpm
pub const HEART_RATE_RANGE: PlausibleRange = PlausibleRange::new(40.0, 220.0);
/// Cadence, steps/min
pub const CADENCE_RANGE: PlausibleRange = PlausibleRange::new(100.0, 220.0);
/// Stride length, cm
pub const STRIDE_RANGE: PlausibleRange = PlausibleRange::new(30.0, 180.0);
/// Pace, s/km (3:00 to 15:00)
pub const PACE_RANGE: PlausibleRange = PlausibleRange::new(180.0, 900.0);

/// Forward-fill out-of-range and missing values with the last in-range value.
/// Leading values with nothing valid before them stay `None`.
pub fn clean_series(values: &[Option<f64>], range: PlausibleRange) -> Vec<Option<f64>> {
  let mut last_valid = None;
  values
    .iter()
    .map(|value| {
      match value {
        Some(v) if range.contains(*v) => last_valid = Some(*v),
        _ => {}
      }
      last_valid
    })
    .collect()
}

/// Chart-ready channels for one activity
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanedSeries {
  pub elapsed_seconds: Vec<i64>,
  pub heart_rate: Vec<Option<f64>>,
  pub cadence: Vec<Option<f64>>,
  pub stride_length: Vec<Option<f64>>,
  pub pace: Vec<Option<f64>>,
}

/// Clean every channel of a record series with its plausible range
pub fn clean_records(records: &[ActivityRecord]) -> CleanedSeries {
  let channel = |f: fn(&ActivityRecord) -> Option<f64>| records.iter().map(f).collect::<Vec<_>>();

  CleanedSeries {
    elapsed_seconds: records.iter().map(|r| r.elapsed_seconds).collect(),
    heart_rate: clean_series(&channel(|r| r.heart_rate), HEART_RATE_RANGE),
    cadence: clean_series(&channel(|r| r.cadence), CADENCE_RANGE),
    stride_length: clean_series(&channel(|r| r.stride_length), STRIDE_RANGE),
    pace: clean_series(&channel(|r| r.pace), PACE_RANGE),
  }
}
