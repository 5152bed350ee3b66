//! Fitness estimation: VDOT and training load for a completed activity
//!
//! VDOT follows the Daniels/Gilbert oxygen-cost model. The heart-rate
//! adjustment on top of it is a heuristic: the same pace run at a higher
//! relative intensity is taken as evidence of lower fitness, and vice versa.
//! It is not a physiological law.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::Result;
use crate::zones::{HrZone, ZoneDistribution};

/// ---------------------------------------------------------------------------
/// Model Constants
/// ---------------------------------------------------------------------------

/// Oxygen cost of running: VO2 = C + B*v + A*v^2, v in meters/minute
pub(crate) const VO2_A: f64 = 0.000104;
pub(crate) const VO2_B: f64 = 0.182258;
pub(crate) const VO2_C: f64 = -4.60;

/// VDOT multiplier per HR zone (Z1..Z5)
const VDOT_ZONE_FACTORS: [f64; 5] = [0.90, 0.95, 1.00, 1.05, 1.10];

/// Training load multiplier per HR zone (Z1..Z5)
const LOAD_ZONE_FACTORS: [f64; 5] = [0.6, 0.8, 1.0, 1.3, 1.5];

/// Oxygen consumption (ml/kg/min) at a running velocity in meters/minute
pub fn oxygen_cost(velocity_m_per_min: f64) -> f64 {
  VO2_C + VO2_B * velocity_m_per_min + VO2_A * velocity_m_per_min.powi(2)
}

/// Fraction of VO2max sustainable for an effort of the given duration
pub fn sustainable_fraction(duration_min: f64) -> f64 {
  0.8 + 0.1894393 * (-0.012778 * duration_min).exp() + 0.2989558 * (-0.1932605 * duration_min).exp()
}

/// ---------------------------------------------------------------------------
/// Fitness Calculator
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct FitnessCalculator {
  pub max_hr: i64,
  pub resting_hr: i64,
}

impl FitnessCalculator {
  pub fn new(max_hr: i64, resting_hr: i64) -> Self {
    Self { max_hr, resting_hr }
  }

  /// Heart-rate reserve (max - resting)
  pub fn hr_reserve(&self) -> i64 {
    self.max_hr - self.resting_hr
  }

  pub fn hr_zone(&self, avg_hr: f64) -> Option<HrZone> {
    HrZone::from_hr(avg_hr, self.max_hr as f64)
  }

  /// Estimate VDOT from a completed effort.
  ///
  /// Returns `None` when the effort cannot be estimated: non-positive distance
  /// or duration, or a velocity so low the oxygen-cost curve goes non-positive.
  /// Callers must treat `None` as "could not estimate", never as zero.
  pub fn estimate_vdot(
    &self,
    distance_meters: f64,
    duration_seconds: f64,
    avg_hr: Option<f64>,
  ) -> Option<f64> {
    if !(distance_meters > 0.0) || !(duration_seconds > 0.0) {
      return None;
    }

    let duration_min = duration_seconds / 60.0;
    let velocity = distance_meters / duration_min;
    if velocity <= 0.0 {
      return None;
    }

    let vo2 = oxygen_cost(velocity);
    let pct_vo2max = sustainable_fraction(duration_min);
    if vo2 <= 0.0 || pct_vo2max <= 0.0 {
      return None;
    }

    let mut vdot = vo2 / pct_vo2max;

    if let Some(zone) = avg_hr.and_then(|hr| self.hr_zone(hr)) {
      vdot *= VDOT_ZONE_FACTORS[zone.index()];
    }

    if !vdot.is_finite() {
      return None;
    }

    Some((vdot * 10.0).round() / 10.0)
  }

  /// Session training load: hours * 100, scaled by HR zone when available.
  /// Zero or negative duration yields zero load.
  pub fn training_load(&self, duration_seconds: f64, avg_hr: Option<f64>) -> f64 {
    if !(duration_seconds > 0.0) {
      return 0.0;
    }

    let mut load = duration_seconds / 3600.0 * 100.0;

    if let Some(zone) = avg_hr.and_then(|hr| self.hr_zone(hr)) {
      load *= LOAD_ZONE_FACTORS[zone.index()];
    }

    load.round()
  }

  /// Share of positive HR samples in each zone, in percent.
  /// Returns `None` when no sample classifies.
  pub fn hr_distribution(&self, hr_samples: &[f64]) -> Option<ZoneDistribution> {
    let mut counts = [0usize; 5];
    for zone in hr_samples.iter().filter_map(|&hr| self.hr_zone(hr)) {
      counts[zone.index()] += 1;
    }

    let total: usize = counts.iter().sum();
    if total == 0 {
      return None;
    }

    let mut dist = ZoneDistribution::default();
    for (pct, count) in dist.pct.iter_mut().zip(counts) {
      *pct = count as f64 / total as f64 * 100.0;
    }
    Some(dist)
  }
}

/// ---------------------------------------------------------------------------
/// Database Operations
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct FitnessBackfill {
  pub total: usize,
  pub computed: usize,
  pub without_vdot: usize,
}

/// Compute and store VDOT and training load for activities that have an
/// average HR but neither value yet. Each activity is written at most once.
pub async fn compute_activity_fitness(
  pool: &SqlitePool,
  calculator: &FitnessCalculator,
) -> Result<FitnessBackfill> {
  let activities: Vec<(String, f64, f64, f64)> = sqlx::query_as(
    r#"
    SELECT activity_id, CAST(distance AS REAL), CAST(duration AS REAL),
           CAST(average_heart_rate AS REAL)
    FROM activities
    WHERE vdot_value IS NULL
      AND training_load IS NULL
      AND average_heart_rate IS NOT NULL
    "#,
  )
  .fetch_all(pool)
  .await?;

  let mut result = FitnessBackfill {
    total: activities.len(),
    ..Default::default()
  };

  for (activity_id, distance, duration, avg_hr) in activities {
    let vdot = calculator.estimate_vdot(distance, duration, Some(avg_hr));
    let load = calculator.training_load(duration, Some(avg_hr));

    if vdot.is_none() {
      tracing::debug!(activity_id = %activity_id, distance, duration, "VDOT could not be estimated");
      result.without_vdot += 1;
    }

    sqlx::query(
      r#"
      UPDATE activities SET
        vdot_value = ?1,
        training_load = ?2
      WHERE activity_id = ?3
      "#,
    )
    .bind(vdot)
    .bind(load)
    .bind(&activity_id)
    .execute(pool)
    .await?;

    result.computed += 1;
  }

  tracing::info!(
    total = result.total,
    computed = result.computed,
    without_vdot = result.without_vdot,
    "Activity fitness computed"
  );

  Ok(result)
}
