use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::fs;
use std::path::Path;

use crate::error::Result;

pub type DbPool = SqlitePool;

/// Filesystem path behind a `sqlite:` URL, if it names a file
fn db_file_path(database_url: &str) -> Option<&Path> {
  let rest = database_url
    .strip_prefix("sqlite://")
    .or_else(|| database_url.strip_prefix("sqlite:"))?;
  let path = rest.split('?').next().unwrap_or(rest);

  if path.is_empty() || path.starts_with(":memory:") {
    None
  } else {
    Some(Path::new(path))
  }
}

/// Open the connection pool and run migrations
pub async fn initialize_db(database_url: &str) -> Result<DbPool> {
  if let Some(parent) = db_file_path(database_url).and_then(Path::parent) {
    if !parent.as_os_str().is_empty() {
      fs::create_dir_all(parent)?;
    }
  }

  tracing::info!(url = %database_url, "Initializing database");

  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(database_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  tracing::info!("Database initialized successfully");

  Ok(pool)
}
