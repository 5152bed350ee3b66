//! Engine configuration from environment variables (and `.env`)

use std::env;
use std::str::FromStr;

use serde::Serialize;

use crate::cache::{DateRange, PeriodSelection, WeekNumbering};
use crate::error::{MetricsError, Result};
use crate::fitness::FitnessCalculator;

pub const DEFAULT_DB_PATH: &str = "data/activities.db";
pub const DEFAULT_MAX_HR: i64 = 190;
pub const DEFAULT_RESTING_HR: i64 = 55;

#[derive(Debug, Clone, Serialize)]
pub struct EngineConfig {
  pub database_url: String,
  pub max_hr: i64,
  pub resting_hr: i64,
  pub period_types: PeriodSelection,
  pub date_range: DateRange,
  pub week_numbering: WeekNumbering,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      database_url: sqlite_url(DEFAULT_DB_PATH),
      max_hr: DEFAULT_MAX_HR,
      resting_hr: DEFAULT_RESTING_HR,
      period_types: PeriodSelection::default(),
      date_range: DateRange::default(),
      week_numbering: WeekNumbering::default(),
    }
  }
}

impl EngineConfig {
  /// Load `.env` if present, then read the environment
  pub fn from_env() -> Result<Self> {
    dotenvy::dotenv().ok();
    Self::read_env()
  }

  /// Read configuration from the process environment only.
  ///
  /// `DATABASE_URL` wins over `DB_PATH`. `PERIOD_TYPE`, `START_DATE` and
  /// `END_DATE` preset the rebuild window; CLI flags override them.
  pub fn read_env() -> Result<Self> {
    let database_url = match env::var("DATABASE_URL") {
      Ok(url) if !url.trim().is_empty() => url.trim().to_string(),
      _ => sqlite_url(&env::var("DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string())),
    };

    let config = Self {
      database_url,
      max_hr: parse_var("MAX_HR")?.unwrap_or(DEFAULT_MAX_HR),
      resting_hr: parse_var("RESTING_HR")?.unwrap_or(DEFAULT_RESTING_HR),
      period_types: parse_var("PERIOD_TYPE")?.unwrap_or_default(),
      date_range: DateRange::parse(
        env::var("START_DATE").ok().as_deref(),
        env::var("END_DATE").ok().as_deref(),
      )?,
      week_numbering: parse_var("WEEK_NUMBERING")?.unwrap_or_default(),
    };

    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<()> {
    if self.resting_hr <= 0 {
      return Err(MetricsError::Config(format!(
        "RESTING_HR must be positive, got {}",
        self.resting_hr
      )));
    }
    if self.max_hr <= self.resting_hr {
      return Err(MetricsError::Config(format!(
        "MAX_HR ({}) must be greater than RESTING_HR ({})",
        self.max_hr, self.resting_hr
      )));
    }
    Ok(())
  }

  pub fn calculator(&self) -> FitnessCalculator {
    FitnessCalculator::new(self.max_hr, self.resting_hr)
  }
}

fn sqlite_url(path: &str) -> String {
  format!("sqlite://{}?mode=rwc", path)
}

/// Parse an optional variable; set-but-malformed is an error
fn parse_var<T>(name: &str) -> Result<Option<T>>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match env::var(name) {
    Ok(raw) if !raw.trim().is_empty() => raw
      .trim()
      .parse()
      .map(Some)
      .map_err(|e| MetricsError::Config(format!("{}: {}", name, e))),
    _ => Ok(None),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  const VARS: [&str; 9] = [
    "DATABASE_URL",
    "DB_PATH",
    "MAX_HR",
    "RESTING_HR",
    "PERIOD_TYPE",
    "START_DATE",
    "END_DATE",
    "WEEK_NUMBERING",
    "RUST_LOG",
  ];

  fn with_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
    let all: Vec<(&str, Option<&str>)> = VARS
      .iter()
      .map(|name| (*name, vars.iter().find(|(k, _)| k == name).map(|(_, v)| *v)))
      .collect();
    temp_env::with_vars(all, f);
  }

  #[test]
  #[serial]
  fn test_defaults() {
    with_env(&[], || {
      let config = EngineConfig::read_env().unwrap();
      assert_eq!(config.database_url, "sqlite://data/activities.db?mode=rwc");
      assert_eq!(config.max_hr, 190);
      assert_eq!(config.resting_hr, 55);
      assert_eq!(config.period_types, PeriodSelection::Both);
      assert_eq!(config.week_numbering, WeekNumbering::Iso);
      assert!(config.date_range.is_unbounded());
    });
  }

  #[test]
  #[serial]
  fn test_database_url_wins_over_db_path() {
    with_env(
      &[("DATABASE_URL", "sqlite::memory:"), ("DB_PATH", "/tmp/other.db")],
      || {
        assert_eq!(EngineConfig::read_env().unwrap().database_url, "sqlite::memory:");
      },
    );
    with_env(&[("DB_PATH", "/tmp/other.db")], || {
      assert_eq!(
        EngineConfig::read_env().unwrap().database_url,
        "sqlite:///tmp/other.db?mode=rwc"
      );
    });
  }

  #[test]
  #[serial]
  fn test_overrides() {
    with_env(
      &[
        ("MAX_HR", "185"),
        ("RESTING_HR", "48"),
        ("PERIOD_TYPE", "week"),
        ("START_DATE", "2024-01-01"),
        ("WEEK_NUMBERING", "legacy"),
      ],
      || {
        let config = EngineConfig::read_env().unwrap();
        assert_eq!(config.calculator().hr_reserve(), 137);
        assert_eq!(config.period_types, PeriodSelection::Week);
        assert_eq!(config.week_numbering, WeekNumbering::Legacy);
        assert!(config.date_range.start.is_some());
        assert!(config.date_range.end.is_none());
      },
    );
  }

  #[test]
  #[serial]
  fn test_invalid_values_are_rejected() {
    with_env(&[("MAX_HR", "abc")], || {
      assert!(matches!(EngineConfig::read_env(), Err(MetricsError::Config(_))));
    });
    with_env(&[("MAX_HR", "50"), ("RESTING_HR", "60")], || {
      assert!(matches!(EngineConfig::read_env(), Err(MetricsError::Config(_))));
    });
    with_env(&[("RESTING_HR", "0")], || {
      assert!(EngineConfig::read_env().is_err());
    });
    with_env(&[("START_DATE", "2024-02-01"), ("END_DATE", "2024-01-01")], || {
      assert!(matches!(EngineConfig::read_env(), Err(MetricsError::InvalidRange { .. })));
    });
    with_env(&[("WEEK_NUMBERING", "us")], || {
      assert!(EngineConfig::read_env().is_err());
    });
  }
}
