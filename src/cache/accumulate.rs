//! Running aggregates for the zone-stats and VDOT-trend passes
//!
//! Buckets are created on first sight of a key and mutated in place; the
//! finished map is what gets written to the cache, one upsert per key.

use std::collections::{BTreeMap, HashSet};

use super::period::PeriodType;
use crate::zones::HrZone;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningMean {
  pub sum: f64,
  pub count: u32,
}

impl RunningMean {
  /// Missing and non-positive values are treated as "not recorded"
  pub fn push(&mut self, value: Option<f64>) {
    if let Some(v) = value.filter(|v| *v > 0.0 && v.is_finite()) {
      self.sum += v;
      self.count += 1;
    }
  }

  pub fn mean(&self) -> Option<f64> {
    if self.count > 0 {
      Some(self.sum / self.count as f64)
    } else {
      None
    }
  }
}

/// ---------------------------------------------------------------------------
/// Zone Stats
/// ---------------------------------------------------------------------------

/// One qualifying lap, already joined to its activity's start period
#[derive(Debug, Clone)]
pub struct LapSample<'a> {
  pub activity_id: &'a str,
  pub duration: Option<f64>,
  pub distance: Option<f64>,
  pub pace: Option<f64>,
  pub cadence: Option<f64>,
  pub stride_length: Option<f64>,
  pub heart_rate: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ZoneBucket {
  activities: HashSet<String>,
  pub total_duration: f64,
  pub total_distance: f64,
  pub pace: RunningMean,
  pub cadence: RunningMean,
  pub stride_length: RunningMean,
  pub heart_rate: RunningMean,
}

impl ZoneBucket {
  pub fn add(&mut self, lap: &LapSample<'_>) {
    if !self.activities.contains(lap.activity_id) {
      self.activities.insert(lap.activity_id.to_string());
    }
    self.total_duration += lap.duration.unwrap_or(0.0);
    self.total_distance += lap.distance.unwrap_or(0.0);
    self.pace.push(lap.pace);
    self.cadence.push(lap.cadence);
    self.stride_length.push(lap.stride_length);
    self.heart_rate.push(lap.heart_rate);
  }

  /// Distinct activities contributing at least one lap
  pub fn activity_count(&self) -> usize {
    self.activities.len()
  }
}

/// Finished zone aggregate, ready to upsert
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneStat {
  pub period: String,
  pub period_type: PeriodType,
  pub zone: HrZone,
  pub activity_count: i64,
  pub total_duration: f64,
  pub total_distance: f64,
  pub avg_pace: Option<f64>,
  pub avg_cadence: Option<f64>,
  pub avg_stride_length: Option<f64>,
  pub avg_heart_rate: Option<f64>,
}

#[derive(Debug)]
pub struct ZoneStatsAccumulator {
  period_type: PeriodType,
  buckets: BTreeMap<(String, HrZone), ZoneBucket>,
}

impl ZoneStatsAccumulator {
  pub fn new(period_type: PeriodType) -> Self {
    Self {
      period_type,
      buckets: BTreeMap::new(),
    }
  }

  pub fn add(&mut self, period: String, zone: HrZone, lap: &LapSample<'_>) {
    self.buckets.entry((period, zone)).or_default().add(lap);
  }

  pub fn len(&self) -> usize {
    self.buckets.len()
  }

  /// Averages are sum / count, `None` when nothing was recorded
  pub fn finish(self) -> Vec<ZoneStat> {
    let period_type = self.period_type;
    self
      .buckets
      .into_iter()
      .map(|((period, zone), bucket)| ZoneStat {
        period,
        period_type,
        zone,
        activity_count: bucket.activity_count() as i64,
        total_duration: bucket.total_duration,
        total_distance: bucket.total_distance,
        avg_pace: bucket.pace.mean(),
        avg_cadence: bucket.cadence.mean(),
        avg_stride_length: bucket.stride_length.mean(),
        avg_heart_rate: bucket.heart_rate.mean(),
      })
      .collect()
  }
}

/// ---------------------------------------------------------------------------
/// VDOT Trend
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct TrendBucket {
  vdot_sum: f64,
  max_vdot: f64,
  min_vdot: f64,
  activity_count: i64,
  total_distance: f64,
  total_duration: f64,
}

impl TrendBucket {
  pub fn add(&mut self, vdot: f64, distance: f64, duration: f64) {
    if self.activity_count == 0 {
      self.max_vdot = vdot;
      self.min_vdot = vdot;
    } else {
      self.max_vdot = self.max_vdot.max(vdot);
      self.min_vdot = self.min_vdot.min(vdot);
    }
    self.vdot_sum += vdot;
    self.activity_count += 1;
    self.total_distance += distance;
    self.total_duration += duration;
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VdotTrend {
  pub period: String,
  pub period_type: PeriodType,
  pub avg_vdot: f64,
  pub max_vdot: f64,
  pub min_vdot: f64,
  pub activity_count: i64,
  pub total_distance: f64,
  pub total_duration: f64,
}

#[derive(Debug)]
pub struct VdotTrendAccumulator {
  period_type: PeriodType,
  buckets: BTreeMap<String, TrendBucket>,
}

impl VdotTrendAccumulator {
  pub fn new(period_type: PeriodType) -> Self {
    Self {
      period_type,
      buckets: BTreeMap::new(),
    }
  }

  pub fn add(&mut self, period: String, vdot: f64, distance: f64, duration: f64) {
    self.buckets.entry(period).or_default().add(vdot, distance, duration);
  }

  pub fn len(&self) -> usize {
    self.buckets.len()
  }

  pub fn finish(self) -> Vec<VdotTrend> {
    let period_type = self.period_type;
    self
      .buckets
      .into_iter()
      .map(|(period, bucket)| VdotTrend {
        period,
        period_type,
        avg_vdot: bucket.vdot_sum / bucket.activity_count as f64,
        max_vdot: bucket.max_vdot,
        min_vdot: bucket.min_vdot,
        activity_count: bucket.activity_count,
        total_distance: bucket.total_distance,
        total_duration: bucket.total_duration,
      })
      .collect()
  }
}
