//! Test utilities and helpers for database-backed tests
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Activity, lap and record builders with seed helpers

use sqlx::SqlitePool;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// ---------------------------------------------------------------------------
/// Activities
/// ---------------------------------------------------------------------------

/// Activity row builder. Defaults: 10 km in 1 h, no HR, source `garmin`.
#[derive(Debug, Clone)]
pub struct TestActivity {
  pub activity_id: String,
  pub start_time: String,
  pub distance: f64,
  pub duration: f64,
  pub average_heart_rate: Option<f64>,
  pub vdot_value: Option<f64>,
  pub training_load: Option<f64>,
  pub source: Option<String>,
}

impl TestActivity {
  pub fn new(activity_id: &str, start_time: &str) -> Self {
    Self {
      activity_id: activity_id.to_string(),
      start_time: start_time.to_string(),
      distance: 10000.0,
      duration: 3600.0,
      average_heart_rate: None,
      vdot_value: None,
      training_load: None,
      source: Some("garmin".to_string()),
    }
  }

  pub fn hr(mut self, bpm: f64) -> Self {
    self.average_heart_rate = Some(bpm);
    self
  }

  pub fn distance(mut self, meters: f64) -> Self {
    self.distance = meters;
    self
  }

  pub fn duration(mut self, seconds: f64) -> Self {
    self.duration = seconds;
    self
  }

  pub fn vdot(mut self, vdot: f64) -> Self {
    self.vdot_value = Some(vdot);
    self
  }

  pub fn source(mut self, source: Option<&str>) -> Self {
    self.source = source.map(str::to_string);
    self
  }
}

pub async fn insert_activity(pool: &SqlitePool, activity: &TestActivity) {
  sqlx::query(
    r#"
    INSERT INTO activities (
      activity_id, start_time, distance, duration,
      average_heart_rate, vdot_value, training_load, source
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    "#,
  )
  .bind(&activity.activity_id)
  .bind(&activity.start_time)
  .bind(activity.distance)
  .bind(activity.duration)
  .bind(activity.average_heart_rate)
  .bind(activity.vdot_value)
  .bind(activity.training_load)
  .bind(&activity.source)
  .execute(pool)
  .await
  .expect("Failed to insert test activity");
}

/// ---------------------------------------------------------------------------
/// Laps and Records
/// ---------------------------------------------------------------------------

/// Lap row builder. Defaults: 1 km in 5 min at 5:00/km, HR 150, cadence 170,
/// stride 110 cm.
#[derive(Debug, Clone)]
pub struct TestLap {
  pub activity_id: String,
  pub lap_index: i64,
  pub distance: f64,
  pub duration: f64,
  pub average_heart_rate: Option<f64>,
  pub average_pace: Option<f64>,
  pub average_cadence: Option<f64>,
  pub average_stride_length: Option<f64>,
}

impl TestLap {
  pub fn new(activity_id: &str, lap_index: i64) -> Self {
    Self {
      activity_id: activity_id.to_string(),
      lap_index,
      distance: 1000.0,
      duration: 300.0,
      average_heart_rate: Some(150.0),
      average_pace: Some(300.0),
      average_cadence: Some(170.0),
      average_stride_length: Some(110.0),
    }
  }

  pub fn hr(mut self, bpm: f64) -> Self {
    self.average_heart_rate = Some(bpm);
    self
  }

  pub fn no_hr(mut self) -> Self {
    self.average_heart_rate = None;
    self
  }

  pub fn pace(mut self, seconds_per_km: f64) -> Self {
    self.average_pace = Some(seconds_per_km);
    self
  }

  pub fn no_pace(mut self) -> Self {
    self.average_pace = None;
    self
  }

  pub fn distance(mut self, meters: f64) -> Self {
    self.distance = meters;
    self
  }
}

pub async fn insert_lap(pool: &SqlitePool, lap: &TestLap) {
  sqlx::query(
    r#"
    INSERT INTO activity_laps (
      activity_id, lap_index, distance, duration, average_heart_rate,
      average_pace, average_cadence, average_stride_length
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    "#,
  )
  .bind(&lap.activity_id)
  .bind(lap.lap_index)
  .bind(lap.distance)
  .bind(lap.duration)
  .bind(lap.average_heart_rate)
  .bind(lap.average_pace)
  .bind(lap.average_cadence)
  .bind(lap.average_stride_length)
  .execute(pool)
  .await
  .expect("Failed to insert test lap");
}

pub async fn insert_record(
  pool: &SqlitePool,
  activity_id: &str,
  elapsed_seconds: i64,
  heart_rate: Option<f64>,
  cadence: Option<f64>,
  stride_length: Option<f64>,
  pace: Option<f64>,
) {
  sqlx::query(
    r#"
    INSERT INTO activity_records (
      activity_id, elapsed_seconds, heart_rate, cadence, stride_length, pace
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    "#,
  )
  .bind(activity_id)
  .bind(elapsed_seconds)
  .bind(heart_rate)
  .bind(cadence)
  .bind(stride_length)
  .bind(pace)
  .execute(pool)
  .await
  .expect("Failed to insert test record");
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      r#"
      SELECT name FROM sqlite_master
      WHERE type = 'table'
        AND name IN ('activities', 'activity_laps', 'activity_records', 'hr_zone_stats_cache', 'vdot_trend_cache')
      "#,
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 5);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_helpers_insert_rows() {
    let pool = setup_test_db().await;

    insert_activity(&pool, &TestActivity::new("garmin_1", "2024-03-04T07:00:00Z")).await;
    insert_lap(&pool, &TestLap::new("garmin_1", 0)).await;
    insert_lap(&pool, &TestLap::new("garmin_1", 1)).await;
    insert_record(&pool, "garmin_1", 0, Some(140.0), None, None, None).await;

    let laps: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity_laps")
      .fetch_one(&pool)
      .await
      .expect("Failed to count laps");
    assert_eq!(laps, 2);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_cache_checks_reject_bad_keys() {
    let pool = setup_test_db().await;

    let result = sqlx::query(
      r#"
      INSERT INTO hr_zone_stats_cache (period, period_type, hr_zone, activity_count, total_duration, total_distance)
      VALUES ('2024-03', 'month', 6, 1, 0, 0)
      "#,
    )
    .execute(&pool)
    .await;
    assert!(result.is_err());

    teardown_test_db(pool).await;
  }
}
