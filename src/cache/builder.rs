//! Rebuilds the zone-stats and VDOT-trend caches from raw laps and activities
//!
//! Raw rows are streamed from the store and folded into per-key accumulators.
//! Memory grows with the number of period keys and the distinct activity ids
//! held per zone bucket, not with the number of laps. Accumulated keys are
//! then written one upsert at a time.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::time::Instant;

use super::accumulate::{LapSample, VdotTrendAccumulator, ZoneStatsAccumulator};
use super::period::{period_key, DateRange, PeriodRange, PeriodSelection, PeriodType, WeekNumbering};
use super::store;
use crate::error::{MetricsError, Result};
use crate::fitness::FitnessCalculator;

/// Laps shorter than this are treated as noise (auto-pause artifacts)
pub const MIN_LAP_DISTANCE_METERS: f64 = 50.0;
/// Laps slower than this (10:00/km) are treated as noise
pub const MAX_LAP_PACE_SEC_PER_KM: f64 = 600.0;

/// ---------------------------------------------------------------------------
/// Options and Results
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RebuildMode {
  /// Upsert keys in the window and delete cached keys in the window that
  /// no longer have any data behind them
  Full,
  /// Upsert keys in the window, never delete
  #[default]
  Incremental,
}

#[derive(Debug, Clone, Default)]
pub struct RebuildOptions {
  pub mode: RebuildMode,
  pub period_types: PeriodSelection,
  pub date_range: DateRange,
  /// Empty both cache tables before rebuilding
  pub clear: bool,
  /// Stop (keeping everything already written) once this instant passes
  pub deadline: Option<Instant>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassSummary {
  pub period_type: PeriodType,
  pub laps_scanned: usize,
  pub activities_scanned: usize,
  pub zone_rows: usize,
  pub trend_rows: usize,
  pub pruned_rows: usize,
}

impl PassSummary {
  fn new(period_type: PeriodType) -> Self {
    Self {
      period_type,
      laps_scanned: 0,
      activities_scanned: 0,
      zone_rows: 0,
      trend_rows: 0,
      pruned_rows: 0,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RebuildSummary {
  pub cleared: bool,
  pub passes: Vec<PassSummary>,
}

impl RebuildSummary {
  pub fn zone_rows(&self) -> usize {
    self.passes.iter().map(|p| p.zone_rows).sum()
  }

  pub fn trend_rows(&self) -> usize {
    self.passes.iter().map(|p| p.trend_rows).sum()
  }

  pub fn pruned_rows(&self) -> usize {
    self.passes.iter().map(|p| p.pruned_rows).sum()
  }

  fn rows_written(&self) -> usize {
    self.zone_rows() + self.trend_rows() + self.pruned_rows()
  }
}

/// ---------------------------------------------------------------------------
/// Source Rows
/// ---------------------------------------------------------------------------

#[derive(Debug, sqlx::FromRow)]
struct LapRow {
  activity_id: String,
  start_time: DateTime<Utc>,
  duration: Option<f64>,
  distance: Option<f64>,
  average_pace: Option<f64>,
  average_cadence: Option<f64>,
  average_stride_length: Option<f64>,
  average_heart_rate: f64,
}

#[derive(Debug, sqlx::FromRow)]
struct TrendRow {
  start_time: DateTime<Utc>,
  vdot_value: f64,
  distance: f64,
  duration: f64,
}

const QUALIFYING_LAPS: &str = r#"
  SELECT
    al.activity_id,
    a.start_time,
    CAST(al.duration AS REAL) AS duration,
    CAST(al.distance AS REAL) AS distance,
    CAST(al.average_pace AS REAL) AS average_pace,
    CAST(al.average_cadence AS REAL) AS average_cadence,
    CAST(al.average_stride_length AS REAL) AS average_stride_length,
    CAST(al.average_heart_rate AS REAL) AS average_heart_rate
  FROM activity_laps al
  JOIN activities a ON al.activity_id = a.activity_id
  WHERE al.average_heart_rate IS NOT NULL
    AND al.distance >= ?1
    AND (al.average_pace IS NULL OR al.average_pace <= ?2)
    AND (?3 IS NULL OR datetime(a.start_time) >= ?3)
    AND (?4 IS NULL OR datetime(a.start_time) < ?4)
  ORDER BY a.start_time, al.activity_id, al.lap_index
"#;

const ACTIVITIES_WITH_VDOT: &str = r#"
  SELECT
    start_time,
    CAST(vdot_value AS REAL) AS vdot_value,
    CAST(COALESCE(distance, 0) AS REAL) AS distance,
    CAST(COALESCE(duration, 0) AS REAL) AS duration
  FROM activities
  WHERE vdot_value IS NOT NULL
    AND (?1 IS NULL OR datetime(start_time) >= ?1)
    AND (?2 IS NULL OR datetime(start_time) < ?2)
  ORDER BY start_time, activity_id
"#;

/// ---------------------------------------------------------------------------
/// Cache Builder
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CacheBuilder {
  pool: SqlitePool,
  calculator: FitnessCalculator,
  week_numbering: WeekNumbering,
}

impl CacheBuilder {
  pub fn new(pool: SqlitePool, calculator: FitnessCalculator, week_numbering: WeekNumbering) -> Self {
    Self {
      pool,
      calculator,
      week_numbering,
    }
  }

  /// Rebuild both caches for the selected period types.
  ///
  /// Safe to re-run: each key is fully recomputed from its window and
  /// overwritten, so a crash or deadline only leaves later keys stale.
  pub async fn rebuild(&self, options: &RebuildOptions) -> Result<RebuildSummary> {
    tracing::info!(
      mode = ?options.mode,
      period_types = ?options.period_types,
      start = ?options.date_range.start,
      end = ?options.date_range.end,
      clear = options.clear,
      "Starting cache rebuild"
    );

    let mut summary = RebuildSummary::default();

    if options.clear {
      store::clear_cache(&self.pool).await?;
      summary.cleared = true;
    }

    for period_type in options.period_types.period_types() {
      let window = options.date_range.widen_to_periods(period_type, self.week_numbering);
      let mut pass = PassSummary::new(period_type);

      let outcome = self.build_zone_stats(period_type, &window, options, &mut pass, &summary).await;
      let outcome = match outcome {
        Ok(()) => self.build_vdot_trend(period_type, &window, options, &mut pass, &summary).await,
        Err(e) => Err(e),
      };

      summary.passes.push(pass);
      outcome?;
    }

    tracing::info!(
      zone_rows = summary.zone_rows(),
      trend_rows = summary.trend_rows(),
      pruned_rows = summary.pruned_rows(),
      "Cache rebuild completed"
    );

    Ok(summary)
  }

  async fn build_zone_stats(
    &self,
    period_type: PeriodType,
    window: &DateRange,
    options: &RebuildOptions,
    pass: &mut PassSummary,
    summary: &RebuildSummary,
  ) -> Result<()> {
    let mut acc = ZoneStatsAccumulator::new(period_type);
    let max_hr = self.calculator.max_hr;

    {
      let mut rows = sqlx::query_as::<_, LapRow>(QUALIFYING_LAPS)
        .bind(MIN_LAP_DISTANCE_METERS)
        .bind(MAX_LAP_PACE_SEC_PER_KM)
        .bind(window.start_bound())
        .bind(window.end_bound())
        .fetch(&self.pool);

      while let Some(lap) = rows.try_next().await? {
        check_deadline(options.deadline, summary.rows_written() + pass_rows(pass))?;
        pass.laps_scanned += 1;

        let Some(zone) = self.calculator.hr_zone(lap.average_heart_rate) else {
          continue;
        };

        let period = period_key(lap.start_time, period_type, self.week_numbering);
        acc.add(
          period,
          zone,
          &LapSample {
            activity_id: &lap.activity_id,
            duration: lap.duration,
            distance: lap.distance,
            pace: lap.average_pace,
            cadence: lap.average_cadence,
            stride_length: lap.average_stride_length,
            heart_rate: Some(lap.average_heart_rate),
          },
        );
      }
    }

    tracing::debug!(period_type = %period_type, laps = pass.laps_scanned, max_hr, keys = acc.len(), "Laps aggregated");

    let stats = acc.finish();
    let written: HashSet<(String, i64)> = stats.iter().map(|s| (s.period.clone(), s.zone.number() as i64)).collect();

    for stat in &stats {
      check_deadline(options.deadline, summary.rows_written() + pass_rows(pass))?;
      store::upsert_zone_stat(&self.pool, stat).await?;
      pass.zone_rows += 1;
    }

    if options.mode == RebuildMode::Full && !options.clear {
      let periods = PeriodRange::from_dates(window, period_type, self.week_numbering);
      for (period, zone) in store::zone_stat_keys(&self.pool, period_type, &periods).await? {
        if written.contains(&(period.clone(), zone)) {
          continue;
        }
        check_deadline(options.deadline, summary.rows_written() + pass_rows(pass))?;
        store::delete_zone_stat(&self.pool, period_type, &period, zone).await?;
        pass.pruned_rows += 1;
      }
    }

    tracing::info!(period_type = %period_type, rows = pass.zone_rows, "HR zone stats cached");
    Ok(())
  }

  async fn build_vdot_trend(
    &self,
    period_type: PeriodType,
    window: &DateRange,
    options: &RebuildOptions,
    pass: &mut PassSummary,
    summary: &RebuildSummary,
  ) -> Result<()> {
    let mut acc = VdotTrendAccumulator::new(period_type);

    {
      let mut rows = sqlx::query_as::<_, TrendRow>(ACTIVITIES_WITH_VDOT)
        .bind(window.start_bound())
        .bind(window.end_bound())
        .fetch(&self.pool);

      while let Some(activity) = rows.try_next().await? {
        check_deadline(options.deadline, summary.rows_written() + pass_rows(pass))?;
        pass.activities_scanned += 1;

        let period = period_key(activity.start_time, period_type, self.week_numbering);
        acc.add(period, activity.vdot_value, activity.distance, activity.duration);
      }
    }

    tracing::debug!(period_type = %period_type, keys = acc.len(), "Activities aggregated");

    let trends = acc.finish();
    let written: HashSet<String> = trends.iter().map(|t| t.period.clone()).collect();

    for trend in &trends {
      check_deadline(options.deadline, summary.rows_written() + pass_rows(pass))?;
      store::upsert_vdot_trend(&self.pool, trend).await?;
      pass.trend_rows += 1;
    }

    if options.mode == RebuildMode::Full && !options.clear {
      let periods = PeriodRange::from_dates(window, period_type, self.week_numbering);
      for period in store::vdot_trend_keys(&self.pool, period_type, &periods).await? {
        if written.contains(&period) {
          continue;
        }
        check_deadline(options.deadline, summary.rows_written() + pass_rows(pass))?;
        store::delete_vdot_trend(&self.pool, period_type, &period).await?;
        pass.pruned_rows += 1;
      }
    }

    tracing::info!(
      period_type = %period_type,
      activities = pass.activities_scanned,
      rows = pass.trend_rows,
      "VDOT trend cached"
    );
    Ok(())
  }
}

fn pass_rows(pass: &PassSummary) -> usize {
  pass.zone_rows + pass.trend_rows + pass.pruned_rows
}

fn check_deadline(deadline: Option<Instant>, written: usize) -> Result<()> {
  match deadline {
    Some(d) if Instant::now() >= d => {
      tracing::warn!(written, "Rebuild deadline exceeded, stopping");
      Err(MetricsError::DeadlineExceeded { written })
    }
    _ => Ok(()),
  }
}
