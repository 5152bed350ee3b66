//! Cache table writes and maintenance
//!
//! Every write here is a single statement, so each key is replaced
//! atomically even though a rebuild as a whole is not one transaction.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

use super::accumulate::{VdotTrend, ZoneStat};
use super::period::{PeriodRange, PeriodType};
use crate::error::Result;

/// Insert or overwrite the zone stats row for (period, period_type, zone)
pub async fn upsert_zone_stat(pool: &SqlitePool, stat: &ZoneStat) -> Result<()> {
  sqlx::query(
    r#"
    INSERT INTO hr_zone_stats_cache (
      period, period_type, hr_zone, activity_count,
      total_duration, total_distance,
      avg_pace, avg_cadence, avg_stride_length, avg_heart_rate, updated_at
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
    ON CONFLICT(period, period_type, hr_zone) DO UPDATE SET
      activity_count = excluded.activity_count,
      total_duration = excluded.total_duration,
      total_distance = excluded.total_distance,
      avg_pace = excluded.avg_pace,
      avg_cadence = excluded.avg_cadence,
      avg_stride_length = excluded.avg_stride_length,
      avg_heart_rate = excluded.avg_heart_rate,
      updated_at = excluded.updated_at
    "#,
  )
  .bind(&stat.period)
  .bind(stat.period_type)
  .bind(stat.zone.number() as i64)
  .bind(stat.activity_count)
  .bind(stat.total_duration)
  .bind(stat.total_distance)
  .bind(stat.avg_pace)
  .bind(stat.avg_cadence)
  .bind(stat.avg_stride_length)
  .bind(stat.avg_heart_rate)
  .bind(Utc::now())
  .execute(pool)
  .await?;

  Ok(())
}

/// Insert or overwrite the VDOT trend row for (period, period_type)
pub async fn upsert_vdot_trend(pool: &SqlitePool, trend: &VdotTrend) -> Result<()> {
  sqlx::query(
    r#"
    INSERT INTO vdot_trend_cache (
      period, period_type, avg_vdot, max_vdot, min_vdot,
      activity_count, total_distance, total_duration, updated_at
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT(period, period_type) DO UPDATE SET
      avg_vdot = excluded.avg_vdot,
      max_vdot = excluded.max_vdot,
      min_vdot = excluded.min_vdot,
      activity_count = excluded.activity_count,
      total_distance = excluded.total_distance,
      total_duration = excluded.total_duration,
      updated_at = excluded.updated_at
    "#,
  )
  .bind(&trend.period)
  .bind(trend.period_type)
  .bind(trend.avg_vdot)
  .bind(trend.max_vdot)
  .bind(trend.min_vdot)
  .bind(trend.activity_count)
  .bind(trend.total_distance)
  .bind(trend.total_duration)
  .bind(Utc::now())
  .execute(pool)
  .await?;

  Ok(())
}

/// Existing zone-stats keys of one period type within a period window
pub async fn zone_stat_keys(
  pool: &SqlitePool,
  period_type: PeriodType,
  window: &PeriodRange,
) -> Result<Vec<(String, i64)>> {
  let keys = sqlx::query_as(
    r#"
    SELECT period, hr_zone
    FROM hr_zone_stats_cache
    WHERE period_type = ?1
      AND (?2 IS NULL OR period >= ?2)
      AND (?3 IS NULL OR period <= ?3)
    ORDER BY period, hr_zone
    "#,
  )
  .bind(period_type)
  .bind(&window.start)
  .bind(&window.end)
  .fetch_all(pool)
  .await?;

  Ok(keys)
}

/// Existing VDOT trend periods of one period type within a period window
pub async fn vdot_trend_keys(
  pool: &SqlitePool,
  period_type: PeriodType,
  window: &PeriodRange,
) -> Result<Vec<String>> {
  let keys: Vec<(String,)> = sqlx::query_as(
    r#"
    SELECT period
    FROM vdot_trend_cache
    WHERE period_type = ?1
      AND (?2 IS NULL OR period >= ?2)
      AND (?3 IS NULL OR period <= ?3)
    ORDER BY period
    "#,
  )
  .bind(period_type)
  .bind(&window.start)
  .bind(&window.end)
  .fetch_all(pool)
  .await?;

  Ok(keys.into_iter().map(|(period,)| period).collect())
}

pub async fn delete_zone_stat(pool: &SqlitePool, period_type: PeriodType, period: &str, zone: i64) -> Result<()> {
  sqlx::query("DELETE FROM hr_zone_stats_cache WHERE period = ?1 AND period_type = ?2 AND hr_zone = ?3")
    .bind(period)
    .bind(period_type)
    .bind(zone)
    .execute(pool)
    .await?;
  Ok(())
}

pub async fn delete_vdot_trend(pool: &SqlitePool, period_type: PeriodType, period: &str) -> Result<()> {
  sqlx::query("DELETE FROM vdot_trend_cache WHERE period = ?1 AND period_type = ?2")
    .bind(period)
    .bind(period_type)
    .execute(pool)
    .await?;
  Ok(())
}

/// ---------------------------------------------------------------------------
/// Maintenance
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClearedCache {
  pub zone_rows: u64,
  pub trend_rows: u64,
}

/// Remove every row from both cache tables
pub async fn clear_cache(pool: &SqlitePool) -> Result<ClearedCache> {
  let zone = sqlx::query("DELETE FROM hr_zone_stats_cache").execute(pool).await?;
  let trend = sqlx::query("DELETE FROM vdot_trend_cache").execute(pool).await?;

  tracing::info!(
    zone_rows = zone.rows_affected(),
    trend_rows = trend.rows_affected(),
    "Cache cleared"
  );

  Ok(ClearedCache {
    zone_rows: zone.rows_affected(),
    trend_rows: trend.rows_affected(),
  })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PurgeResult {
  pub activities: u64,
  pub laps: u64,
  pub records: u64,
}

/// Delete activities with no provider source (left over from imports that
/// predate source tagging) together with their laps and records, then clear
/// the caches since they may aggregate the deleted rows.
pub async fn purge_unsourced_activities(pool: &SqlitePool) -> Result<PurgeResult> {
  const UNSOURCED: &str = "SELECT activity_id FROM activities WHERE source IS NULL OR source = '' OR source = 'unknown'";

  let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM ({UNSOURCED})"))
    .fetch_one(pool)
    .await?;
  if count == 0 {
    tracing::info!("No unsourced activities to purge");
    return Ok(PurgeResult::default());
  }

  let mut tx = pool.begin().await?;

  let records = sqlx::query(&format!("DELETE FROM activity_records WHERE activity_id IN ({UNSOURCED})"))
    .execute(&mut *tx)
    .await?;
  let laps = sqlx::query(&format!("DELETE FROM activity_laps WHERE activity_id IN ({UNSOURCED})"))
    .execute(&mut *tx)
    .await?;
  let activities = sqlx::query("DELETE FROM activities WHERE source IS NULL OR source = '' OR source = 'unknown'")
    .execute(&mut *tx)
    .await?;
  sqlx::query("DELETE FROM hr_zone_stats_cache").execute(&mut *tx).await?;
  sqlx::query("DELETE FROM vdot_trend_cache").execute(&mut *tx).await?;

  tx.commit().await?;

  let result = PurgeResult {
    activities: activities.rows_affected(),
    laps: laps.rows_affected(),
    records: records.rows_affected(),
  };
  tracing::info!(
    activities = result.activities,
    laps = result.laps,
    records = result.records,
    "Purged unsourced activities and invalidated cache"
  );

  Ok(result)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::builder::{CacheBuilder, RebuildOptions};
  use crate::cache::period::WeekNumbering;
  use crate::fitness::FitnessCalculator;
  use crate::test_utils::{
    insert_activity, insert_lap, insert_record, setup_test_db, teardown_test_db, TestActivity, TestLap,
  };
  use crate::zones::HrZone;

  fn stat(period: &str, zone: HrZone, activity_count: i64) -> ZoneStat {
    ZoneStat {
      period: period.to_string(),
      period_type: PeriodType::Month,
      zone,
      activity_count,
      total_duration: 600.0,
      total_distance: 2000.0,
      avg_pace: Some(300.0),
      avg_cadence: None,
      avg_stride_length: None,
      avg_heart_rate: Some(150.0),
    }
  }

  async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
      .fetch_one(pool)
      .await
      .unwrap()
  }

  #[tokio::test]
  async fn test_upsert_overwrites_key() {
    let pool = setup_test_db().await;

    upsert_zone_stat(&pool, &stat("2024-03", HrZone::Z2, 1)).await.unwrap();
    upsert_zone_stat(&pool, &stat("2024-03", HrZone::Z2, 4)).await.unwrap();
    upsert_zone_stat(&pool, &stat("2024-04", HrZone::Z2, 2)).await.unwrap();

    assert_eq!(count(&pool, "hr_zone_stats_cache").await, 2);
    let (activity_count,): (i64,) = sqlx::query_as(
      "SELECT activity_count FROM hr_zone_stats_cache WHERE period = '2024-03' AND period_type = 'month' AND hr_zone = 2",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(activity_count, 4);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_key_listing_respects_window() {
    let pool = setup_test_db().await;
    for period in ["2024-01", "2024-02", "2024-03"] {
      upsert_zone_stat(&pool, &stat(period, HrZone::Z1, 1)).await.unwrap();
    }

    let window = PeriodRange {
      start: Some("2024-02".to_string()),
      end: None,
    };
    let keys = zone_stat_keys(&pool, PeriodType::Month, &window).await.unwrap();
    assert_eq!(keys, vec![("2024-02".to_string(), 1), ("2024-03".to_string(), 1)]);
    assert!(zone_stat_keys(&pool, PeriodType::Week, &window).await.unwrap().is_empty());

    delete_zone_stat(&pool, PeriodType::Month, "2024-02", 1).await.unwrap();
    assert_eq!(count(&pool, "hr_zone_stats_cache").await, 2);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_clear_cache() {
    let pool = setup_test_db().await;
    upsert_zone_stat(&pool, &stat("2024-03", HrZone::Z2, 1)).await.unwrap();
    upsert_vdot_trend(
      &pool,
      &VdotTrend {
        period: "2024-03".to_string(),
        period_type: PeriodType::Month,
        avg_vdot: 50.0,
        max_vdot: 50.0,
        min_vdot: 50.0,
        activity_count: 1,
        total_distance: 10000.0,
        total_duration: 3000.0,
      },
    )
    .await
    .unwrap();

    let cleared = clear_cache(&pool).await.unwrap();
    assert_eq!(cleared, ClearedCache { zone_rows: 1, trend_rows: 1 });
    assert_eq!(count(&pool, "hr_zone_stats_cache").await, 0);
    assert_eq!(count(&pool, "vdot_trend_cache").await, 0);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_purge_unsourced_activities() {
    let pool = setup_test_db().await;
    insert_activity(&pool, &TestActivity::new("garmin_1", "2024-03-04T07:00:00Z").vdot(50.0)).await;
    insert_activity(&pool, &TestActivity::new("legacy_1", "2024-03-05T07:00:00Z").source(None)).await;
    insert_activity(&pool, &TestActivity::new("legacy_2", "2024-03-06T07:00:00Z").source(Some("unknown"))).await;
    insert_lap(&pool, &TestLap::new("garmin_1", 0)).await;
    insert_lap(&pool, &TestLap::new("legacy_1", 0)).await;
    insert_lap(&pool, &TestLap::new("legacy_1", 1)).await;
    insert_record(&pool, "legacy_2", 0, Some(140.0), None, None, None).await;

    CacheBuilder::new(pool.clone(), FitnessCalculator::new(190, 55), WeekNumbering::Iso)
      .rebuild(&RebuildOptions::default())
      .await
      .unwrap();
    assert!(count(&pool, "hr_zone_stats_cache").await > 0);

    let purged = purge_unsourced_activities(&pool).await.unwrap();
    assert_eq!(
      purged,
      PurgeResult {
        activities: 2,
        laps: 2,
        records: 1
      }
    );
    assert_eq!(count(&pool, "activities").await, 1);
    assert_eq!(count(&pool, "activity_laps").await, 1);
    assert_eq!(count(&pool, "hr_zone_stats_cache").await, 0);
    assert_eq!(count(&pool, "vdot_trend_cache").await, 0);

    // nothing left to purge, caches untouched
    let again = purge_unsourced_activities(&pool).await.unwrap();
    assert_eq!(again, PurgeResult::default());

    teardown_test_db(pool).await;
  }
}
