//! Error types shared by every component of the engine

use serde::Serialize;

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
  #[error("Invalid date '{0}': expected YYYY-MM-DD")]
  InvalidDate(String),

  #[error("Invalid date range: start {start} is after end {end}")]
  InvalidRange { start: String, end: String },

  #[error("Invalid configuration: {0}")]
  Config(String),

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration error: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Rebuild deadline exceeded after {written} rows were written")]
  DeadlineExceeded { written: usize },
}

impl Serialize for MetricsError {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

pub type Result<T> = std::result::Result<T, MetricsError>;
