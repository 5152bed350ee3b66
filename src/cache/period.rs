//! Period keys and date windows
//!
//! Months are keyed `YYYY-MM`, weeks `YYYY-Www`. Both sort lexicographically
//! in calendar order, which is all the trend queries rely on.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};

/// ---------------------------------------------------------------------------
/// Period Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PeriodType {
  Week,
  Month,
}

impl PeriodType {
  pub fn as_str(&self) -> &'static str {
    match self {
      PeriodType::Week => "week",
      PeriodType::Month => "month",
    }
  }
}

impl fmt::Display for PeriodType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Which period types a rebuild covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PeriodSelection {
  Week,
  Month,
  #[default]
  Both,
}

impl PeriodSelection {
  pub fn period_types(&self) -> Vec<PeriodType> {
    match self {
      PeriodSelection::Week => vec![PeriodType::Week],
      PeriodSelection::Month => vec![PeriodType::Month],
      PeriodSelection::Both => vec![PeriodType::Week, PeriodType::Month],
    }
  }
}

impl FromStr for PeriodSelection {
  type Err = MetricsError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_lowercase().as_str() {
      "week" => Ok(PeriodSelection::Week),
      "month" => Ok(PeriodSelection::Month),
      "both" => Ok(PeriodSelection::Both),
      other => Err(MetricsError::Config(format!(
        "period type must be week, month or both, got '{}'",
        other
      ))),
    }
  }
}

/// How week numbers are derived.
///
/// `Iso` is ISO-8601 (Monday weeks, ISO week-year). `Legacy` reproduces the
/// day-of-year approximation older caches were built with: weeks run Sunday
/// to Saturday, week 1 starts on Jan 1 and no week crosses a year boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WeekNumbering {
  #[default]
  Iso,
  Legacy,
}

impl FromStr for WeekNumbering {
  type Err = MetricsError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_lowercase().as_str() {
      "iso" => Ok(WeekNumbering::Iso),
      "legacy" => Ok(WeekNumbering::Legacy),
      other => Err(MetricsError::Config(format!(
        "week numbering must be iso or legacy, got '{}'",
        other
      ))),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Period Keys
/// ---------------------------------------------------------------------------

pub fn period_key(at: DateTime<Utc>, period_type: PeriodType, numbering: WeekNumbering) -> String {
  date_period_key(at.date_naive(), period_type, numbering)
}

pub fn date_period_key(date: NaiveDate, period_type: PeriodType, numbering: WeekNumbering) -> String {
  match (period_type, numbering) {
    (PeriodType::Month, _) => format!("{:04}-{:02}", date.year(), date.month()),
    (PeriodType::Week, WeekNumbering::Iso) => {
      let week = date.iso_week();
      format!("{:04}-W{:02}", week.year(), week.week())
    }
    (PeriodType::Week, WeekNumbering::Legacy) => {
      format!("{:04}-W{:02}", date.year(), legacy_week_number(date))
    }
  }
}

/// ceil((day_of_year0 + jan1_weekday + 1) / 7), weekday counted from Sunday
fn legacy_week_number(date: NaiveDate) -> u32 {
  let jan1_weekday = year_start(date).weekday().num_days_from_sunday();
  (date.ordinal0() + jan1_weekday + 1).div_ceil(7)
}

fn year_start(date: NaiveDate) -> NaiveDate {
  date.with_ordinal(1).unwrap_or(date)
}

fn year_end(date: NaiveDate) -> NaiveDate {
  NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date)
}

/// First and last day of the period containing `date`
pub fn period_bounds(
  date: NaiveDate,
  period_type: PeriodType,
  numbering: WeekNumbering,
) -> (NaiveDate, NaiveDate) {
  match (period_type, numbering) {
    (PeriodType::Month, _) => {
      let first = date.with_day(1).unwrap_or(date);
      let next_month = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
      } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
      };
      let last = next_month.map_or(date, |d| d - Duration::days(1));
      (first, last)
    }
    (PeriodType::Week, WeekNumbering::Iso) => {
      let first = date - Duration::days(date.weekday().num_days_from_monday() as i64);
      (first, first + Duration::days(6))
    }
    (PeriodType::Week, WeekNumbering::Legacy) => {
      let from_sunday = date.weekday().num_days_from_sunday() as i64;
      let first = (date - Duration::days(from_sunday)).max(year_start(date));
      let last = (date + Duration::days(6 - from_sunday)).min(year_end(date));
      (first, last)
    }
  }
}

/// ---------------------------------------------------------------------------
/// Date Ranges
/// ---------------------------------------------------------------------------

/// Strict `YYYY-MM-DD`
pub fn parse_date(value: &str) -> Result<NaiveDate> {
  let bytes = value.as_bytes();
  let shaped = bytes.len() == 10
    && bytes[4] == b'-'
    && bytes[7] == b'-'
    && bytes
      .iter()
      .enumerate()
      .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
  if !shaped {
    return Err(MetricsError::InvalidDate(value.to_string()));
  }

  NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| MetricsError::InvalidDate(value.to_string()))
}

/// Inclusive day range; either end may be open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
  pub start: Option<NaiveDate>,
  pub end: Option<NaiveDate>,
}

impl DateRange {
  pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self> {
    if let (Some(s), Some(e)) = (start, end) {
      if s > e {
        return Err(MetricsError::InvalidRange {
          start: s.to_string(),
          end: e.to_string(),
        });
      }
    }
    Ok(Self { start, end })
  }

  /// Parse optional `YYYY-MM-DD` bounds. A malformed bound is an error, never ignored.
  pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self> {
    let start = start.map(parse_date).transpose()?;
    let end = end.map(parse_date).transpose()?;
    Self::new(start, end)
  }

  pub fn is_unbounded(&self) -> bool {
    self.start.is_none() && self.end.is_none()
  }

  /// Grow both ends to whole periods so boundary periods aggregate complete data
  pub fn widen_to_periods(&self, period_type: PeriodType, numbering: WeekNumbering) -> Self {
    Self {
      start: self.start.map(|d| period_bounds(d, period_type, numbering).0),
      end: self.end.map(|d| period_bounds(d, period_type, numbering).1),
    }
  }

  /// Lower bound as a SQLite datetime string (inclusive)
  pub fn start_bound(&self) -> Option<String> {
    self.start.map(|d| format!("{} 00:00:00", d.format("%Y-%m-%d")))
  }

  /// Upper bound as a SQLite datetime string (exclusive: midnight after `end`)
  pub fn end_bound(&self) -> Option<String> {
    self
      .end
      .map(|d| format!("{} 00:00:00", (d + Duration::days(1)).format("%Y-%m-%d")))
  }
}

/// Inclusive range of period keys, used by read queries
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PeriodRange {
  pub start: Option<String>,
  pub end: Option<String>,
}

impl PeriodRange {
  pub fn from_dates(range: &DateRange, period_type: PeriodType, numbering: WeekNumbering) -> Self {
    Self {
      start: range.start.map(|d| date_period_key(d, period_type, numbering)),
      end: range.end.map(|d| date_period_key(d, period_type, numbering)),
    }
  }

  pub fn contains(&self, period: &str) -> bool {
    self.start.as_deref().map_or(true, |s| period >= s) && self.end.as_deref().map_or(true, |e| period <= e)
  }
}
