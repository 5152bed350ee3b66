//! Pace zones derived from a VDOT by inverting the oxygen-cost curve
//!
//! Each zone has a fixed %VO2max anchor. The anchor pace is the velocity at
//! which `VO2(v) = vdot * anchor`; zone boundaries sit halfway between
//! adjacent anchor paces, so the five bands tile the whole pace line.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::fitness::{VO2_A, VO2_B, VO2_C};
use crate::zones::HrZone;

/// Pace reported when the model cannot produce a velocity (s/km)
pub const UNBOUNDED_PACE: f64 = 9999.0;

/// %VO2max anchor per zone (Z1..Z5)
const ZONE_ANCHORS: [f64; 5] = [0.65, 0.72, 0.80, 0.88, 0.98];

/// Pace in seconds/km sustained at `pct_vo2max` of the given VDOT.
///
/// Solves `A*v^2 + B*v + C = vdot * pct` for the positive root (v in m/min).
pub fn vdot_to_pace(vdot: f64, pct_vo2max: f64) -> f64 {
  if !(vdot > 0.0) || !(pct_vo2max > 0.0) || pct_vo2max > 1.0 {
    return UNBOUNDED_PACE;
  }

  let target = vdot * pct_vo2max;
  let discriminant = VO2_B.powi(2) + 4.0 * VO2_A * (target - VO2_C);
  if discriminant < 0.0 {
    return UNBOUNDED_PACE;
  }

  let velocity = (-VO2_B + discriminant.sqrt()) / (2.0 * VO2_A);
  if !(velocity > 0.0) {
    return UNBOUNDED_PACE;
  }

  60000.0 / velocity
}

/// Target pace at the center (anchor) of each zone, slowest first
pub fn pace_zone_centers(vdot: f64) -> [f64; 5] {
  ZONE_ANCHORS.map(|anchor| vdot_to_pace(vdot, anchor))
}

/// Pace band in seconds/km. `pace_min` is the fast end, `pace_max` the slow end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PaceBand {
  pub pace_min: f64,
  pub pace_max: f64,
}

impl PaceBand {
  pub fn contains(&self, pace: f64) -> bool {
    pace >= self.pace_min && pace < self.pace_max
  }
}

/// Pace bands for Z1..Z5. Empty when the VDOT is not usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PaceZoneBounds {
  bands: BTreeMap<HrZone, PaceBand>,
}

impl PaceZoneBounds {
  pub fn is_empty(&self) -> bool {
    self.bands.is_empty()
  }

  pub fn len(&self) -> usize {
    self.bands.len()
  }

  pub fn get(&self, zone: HrZone) -> Option<&PaceBand> {
    self.bands.get(&zone)
  }

  pub fn iter(&self) -> impl Iterator<Item = (HrZone, &PaceBand)> {
    self.bands.iter().map(|(zone, band)| (*zone, band))
  }

  /// Zone whose band contains the pace. Paces at or beyond the unbounded
  /// slow end still count as Z1; non-positive paces are unclassifiable.
  pub fn zone_for_pace(&self, pace: f64) -> Option<HrZone> {
    if !(pace > 0.0) {
      return None;
    }
    if let Some(z1) = self.bands.get(&HrZone::Z1) {
      if pace >= z1.pace_max {
        return Some(HrZone::Z1);
      }
    }
    self.iter().find(|(_, band)| band.contains(pace)).map(|(zone, _)| zone)
  }
}

/// Five contiguous pace bands for a VDOT
pub fn pace_zone_bounds(vdot: f64) -> PaceZoneBounds {
  if !(vdot > 0.0) || !vdot.is_finite() {
    return PaceZoneBounds::default();
  }

  let paces = pace_zone_centers(vdot);
  let mid = |a: usize, b: usize| (paces[a] + paces[b]) / 2.0;

  let mut bands = BTreeMap::new();
  bands.insert(HrZone::Z1, PaceBand { pace_min: mid(0, 1), pace_max: UNBOUNDED_PACE });
  bands.insert(HrZone::Z2, PaceBand { pace_min: mid(1, 2), pace_max: mid(0, 1) });
  bands.insert(HrZone::Z3, PaceBand { pace_min: mid(2, 3), pace_max: mid(1, 2) });
  bands.insert(HrZone::Z4, PaceBand { pace_min: mid(3, 4), pace_max: mid(2, 3) });
  bands.insert(HrZone::Z5, PaceBand { pace_min: 0.0, pace_max: mid(3, 4) });

  PaceZoneBounds { bands }
}

/// Pace as `m:ss`, or `--` when missing
pub fn format_pace(seconds_per_km: Option<f64>) -> String {
  match seconds_per_km {
    Some(s) if s.is_finite() && s >= 0.0 => {
      let total = s.round() as i64;
      format!("{}:{:02}", total / 60, total % 60)
    }
    _ => "--".to_string(),
  }
}
