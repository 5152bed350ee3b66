//! Read side: cached aggregates, raw rows and query-time pace-zone stats

use std::collections::BTreeMap;

use futures_util::TryStreamExt;
use serde::Serialize;
use sqlx::SqlitePool;

use super::accumulate::{LapSample, ZoneBucket};
use super::builder::{MAX_LAP_PACE_SEC_PER_KM, MIN_LAP_DISTANCE_METERS};
use super::period::{DateRange, PeriodRange, PeriodType};
use crate::error::Result;
use crate::models::{Activity, ActivityRecord, Lap, VdotTrendCacheEntry, ZoneStatsCacheEntry};
use crate::pace_zones::{pace_zone_bounds, PaceBand};
use crate::zones::HrZone;

/// ---------------------------------------------------------------------------
/// Cache Reads
/// ---------------------------------------------------------------------------

/// Cached zone stats in a period window, ordered by period then zone
pub async fn load_zone_stats(
  pool: &SqlitePool,
  period_type: PeriodType,
  periods: &PeriodRange,
  zone: Option<HrZone>,
) -> Result<Vec<ZoneStatsCacheEntry>> {
  let entries = sqlx::query_as::<_, ZoneStatsCacheEntry>(
    r#"
    SELECT
      period, period_type, hr_zone, activity_count,
      total_duration, total_distance,
      avg_pace, avg_cadence, avg_stride_length, avg_heart_rate, updated_at
    FROM hr_zone_stats_cache
    WHERE period_type = ?1
      AND (?2 IS NULL OR period >= ?2)
      AND (?3 IS NULL OR period <= ?3)
      AND (?4 IS NULL OR hr_zone = ?4)
    ORDER BY period, hr_zone
    "#,
  )
  .bind(period_type)
  .bind(&periods.start)
  .bind(&periods.end)
  .bind(zone.map(|z| z.number() as i64))
  .fetch_all(pool)
  .await?;

  Ok(entries)
}

/// Cached VDOT trend in a period window, ordered by period
pub async fn load_vdot_trend(
  pool: &SqlitePool,
  period_type: PeriodType,
  periods: &PeriodRange,
) -> Result<Vec<VdotTrendCacheEntry>> {
  let entries = sqlx::query_as::<_, VdotTrendCacheEntry>(
    r#"
    SELECT
      period, period_type, avg_vdot, max_vdot, min_vdot,
      activity_count, total_distance, total_duration, updated_at
    FROM vdot_trend_cache
    WHERE period_type = ?1
      AND (?2 IS NULL OR period >= ?2)
      AND (?3 IS NULL OR period <= ?3)
    ORDER BY period
    "#,
  )
  .bind(period_type)
  .bind(&periods.start)
  .bind(&periods.end)
  .fetch_all(pool)
  .await?;

  Ok(entries)
}

/// ---------------------------------------------------------------------------
/// Raw Rows
/// ---------------------------------------------------------------------------

pub async fn load_activities(pool: &SqlitePool, range: &DateRange) -> Result<Vec<Activity>> {
  let activities = sqlx::query_as::<_, Activity>(
    r#"
    SELECT
      activity_id, start_time,
      CAST(distance AS REAL) AS distance,
      CAST(duration AS REAL) AS duration,
      CAST(average_heart_rate AS REAL) AS average_heart_rate,
      CAST(vdot_value AS REAL) AS vdot_value,
      CAST(training_load AS REAL) AS training_load,
      source
    FROM activities
    WHERE (?1 IS NULL OR datetime(start_time) >= ?1)
      AND (?2 IS NULL OR datetime(start_time) < ?2)
    ORDER BY start_time, activity_id
    "#,
  )
  .bind(range.start_bound())
  .bind(range.end_bound())
  .fetch_all(pool)
  .await?;

  Ok(activities)
}

pub async fn load_activity_laps(pool: &SqlitePool, activity_id: &str) -> Result<Vec<Lap>> {
  let laps = sqlx::query_as::<_, Lap>(
    r#"
    SELECT
      activity_id, lap_index,
      CAST(distance AS REAL) AS distance,
      CAST(duration AS REAL) AS duration,
      CAST(average_heart_rate AS REAL) AS average_heart_rate,
      CAST(average_pace AS REAL) AS average_pace,
      CAST(average_cadence AS REAL) AS average_cadence,
      CAST(average_stride_length AS REAL) AS average_stride_length
    FROM activity_laps
    WHERE activity_id = ?1
    ORDER BY lap_index
    "#,
  )
  .bind(activity_id)
  .fetch_all(pool)
  .await?;

  Ok(laps)
}

/// Per-second samples of one activity, in elapsed order. Uncleaned; pass
/// through `series::clean_records` before charting.
pub async fn load_activity_records(pool: &SqlitePool, activity_id: &str) -> Result<Vec<ActivityRecord>> {
  let records = sqlx::query_as::<_, ActivityRecord>(
    r#"
    SELECT
      activity_id, elapsed_seconds,
      CAST(heart_rate AS REAL) AS heart_rate,
      CAST(cadence AS REAL) AS cadence,
      CAST(stride_length AS REAL) AS stride_length,
      CAST(pace AS REAL) AS pace
    FROM activity_records
    WHERE activity_id = ?1
    ORDER BY elapsed_seconds
    "#,
  )
  .bind(activity_id)
  .fetch_all(pool)
  .await?;

  Ok(records)
}

/// ---------------------------------------------------------------------------
/// Pace-Zone Stats
/// ---------------------------------------------------------------------------

/// Lap aggregate for one pace zone. Computed on request, never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaceZoneStat {
  pub zone: HrZone,
  pub band: PaceBand,
  pub lap_count: usize,
  pub activity_count: usize,
  pub avg_heart_rate: Option<f64>,
  pub avg_cadence: Option<f64>,
  pub avg_stride_length: Option<f64>,
  pub total_duration: f64,
  pub total_distance: f64,
}

#[derive(Debug, sqlx::FromRow)]
struct PacedLapRow {
  activity_id: String,
  duration: Option<f64>,
  distance: Option<f64>,
  average_pace: f64,
  average_cadence: Option<f64>,
  average_stride_length: Option<f64>,
  average_heart_rate: Option<f64>,
}

/// Classify qualifying laps in the date range by the pace bands of `vdot`.
/// Only zones with at least one lap are returned, Z1 first. A non-positive
/// VDOT has no bands and yields nothing.
pub async fn pace_zone_stats(pool: &SqlitePool, vdot: f64, range: &DateRange) -> Result<Vec<PaceZoneStat>> {
  let bounds = pace_zone_bounds(vdot);
  if bounds.is_empty() {
    return Ok(Vec::new());
  }

  let mut buckets: BTreeMap<HrZone, (usize, ZoneBucket)> = BTreeMap::new();

  let mut rows = sqlx::query_as::<_, PacedLapRow>(
    r#"
    SELECT
      al.activity_id,
      CAST(al.duration AS REAL) AS duration,
      CAST(al.distance AS REAL) AS distance,
      CAST(al.average_pace AS REAL) AS average_pace,
      CAST(al.average_cadence AS REAL) AS average_cadence,
      CAST(al.average_stride_length AS REAL) AS average_stride_length,
      CAST(al.average_heart_rate AS REAL) AS average_heart_rate
    FROM activity_laps al
    JOIN activities a ON al.activity_id = a.activity_id
    WHERE al.average_pace > 0
      AND al.average_pace <= ?1
      AND al.distance >= ?2
      AND (?3 IS NULL OR datetime(a.start_time) >= ?3)
      AND (?4 IS NULL OR datetime(a.start_time) < ?4)
    "#,
  )
  .bind(MAX_LAP_PACE_SEC_PER_KM)
  .bind(MIN_LAP_DISTANCE_METERS)
  .bind(range.start_bound())
  .bind(range.end_bound())
  .fetch(pool);

  while let Some(lap) = rows.try_next().await? {
    let Some(zone) = bounds.zone_for_pace(lap.average_pace) else {
      continue;
    };
    let (laps, bucket) = buckets.entry(zone).or_default();
    *laps += 1;
    bucket.add(&LapSample {
      activity_id: &lap.activity_id,
      duration: lap.duration,
      distance: lap.distance,
      pace: Some(lap.average_pace),
      cadence: lap.average_cadence,
      stride_length: lap.average_stride_length,
      heart_rate: lap.average_heart_rate,
    });
  }

  let stats = buckets
    .into_iter()
    .filter_map(|(zone, (lap_count, bucket))| {
      let band = *bounds.get(zone)?;
      Some(PaceZoneStat {
        zone,
        band,
        lap_count,
        activity_count: bucket.activity_count(),
        avg_heart_rate: bucket.heart_rate.mean(),
        avg_cadence: bucket.cadence.mean(),
        avg_stride_length: bucket.stride_length.mean(),
        total_duration: bucket.total_duration,
        total_distance: bucket.total_distance,
      })
    })
    .collect();

  Ok(stats)
}
