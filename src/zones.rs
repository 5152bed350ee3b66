//! Heart-rate zone classification
//!
//! Zones are assigned by percentage of max HR. An average HR that cannot be
//! classified (zero, negative, or no usable max HR) yields `None`, which the
//! aggregation passes treat as "zone 0" and skip.

use serde::{Deserialize, Serialize};

/// ---------------------------------------------------------------------------
/// HR Zones
/// ---------------------------------------------------------------------------

/// Upper bounds (exclusive, percent of max HR) for Z1..Z4. Anything at or
/// above the last bound is Z5.
const ZONE_UPPER_PCT: [f64; 4] = [70.0, 80.0, 87.0, 93.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HrZone {
  Z1, // Easy: < 70% max
  Z2, // Aerobic: 70-80% max
  Z3, // Tempo: 80-87% max
  Z4, // Threshold: 87-93% max
  Z5, // VO2max: >= 93% max
}

impl HrZone {
  pub const ALL: [HrZone; 5] = [HrZone::Z1, HrZone::Z2, HrZone::Z3, HrZone::Z4, HrZone::Z5];

  /// Classify an average heart rate against max HR.
  pub fn from_hr(avg_hr: f64, max_hr: f64) -> Option<Self> {
    if !(avg_hr > 0.0) || !(max_hr > 0.0) {
      return None;
    }

    let pct = (avg_hr / max_hr) * 100.0;
    let zone = match pct {
      p if p < ZONE_UPPER_PCT[0] => HrZone::Z1,
      p if p < ZONE_UPPER_PCT[1] => HrZone::Z2,
      p if p < ZONE_UPPER_PCT[2] => HrZone::Z3,
      p if p < ZONE_UPPER_PCT[3] => HrZone::Z4,
      _ => HrZone::Z5,
    };
    Some(zone)
  }

  /// Zone number 1-5 as stored in the cache tables
  pub fn number(self) -> u8 {
    self.index() as u8 + 1
  }

  /// Inverse of `number`. 0 ("unclassified") and anything above 5 map to None.
  pub fn from_number(n: i64) -> Option<Self> {
    match n {
      1 => Some(HrZone::Z1),
      2 => Some(HrZone::Z2),
      3 => Some(HrZone::Z3),
      4 => Some(HrZone::Z4),
      5 => Some(HrZone::Z5),
      _ => None,
    }
  }

  /// Position in fixed-size per-zone tables
  pub fn index(self) -> usize {
    match self {
      HrZone::Z1 => 0,
      HrZone::Z2 => 1,
      HrZone::Z3 => 2,
      HrZone::Z4 => 3,
      HrZone::Z5 => 4,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      HrZone::Z1 => "Z1",
      HrZone::Z2 => "Z2",
      HrZone::Z3 => "Z3",
      HrZone::Z4 => "Z4",
      HrZone::Z5 => "Z5",
    }
  }
}

impl std::fmt::Display for HrZone {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Zone number for an average HR, with 0 meaning "unclassifiable".
pub fn zone_number(avg_hr: f64, max_hr: f64) -> u8 {
  HrZone::from_hr(avg_hr, max_hr).map_or(0, HrZone::number)
}

/// Percentage of samples falling in each zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ZoneDistribution {
  pub pct: [f64; 5],
}

impl ZoneDistribution {
  pub fn get(&self, zone: HrZone) -> f64 {
    self.pct[zone.index()]
  }
}
