//! Swing structure detection
//!
//! Finds pivot highs/lows over a symmetric lookback window and labels each
//! pivot after the first of its kind as HH/LH (highs) or HL/LL (lows)
//! relative to the previous pivot of the same kind.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
  params::{get_period, ParamMeta, ParameterizedDetector},
  DetectorId, Direction, Period, Result, SeriesDetector, OHLC,
};

use super::helpers;

/// Swing classification relative to the previous pivot of the same side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
  #[serde(rename = "HH")]
  HigherHigh,
  #[serde(rename = "HL")]
  HigherLow,
  #[serde(rename = "LH")]
  LowerHigh,
  #[serde(rename = "LL")]
  LowerLow,
}

impl StructureKind {
  pub fn as_str(self) -> &'static str {
    match self {
      StructureKind::HigherHigh => "HH",
      StructureKind::HigherLow => "HL",
      StructureKind::LowerHigh => "LH",
      StructureKind::LowerLow => "LL",
    }
  }

  /// High-side pivots read bearish, low-side pivots bullish
  pub fn direction(self) -> Direction {
    match self {
      StructureKind::HigherHigh | StructureKind::LowerHigh => Direction::Bearish,
      StructureKind::HigherLow | StructureKind::LowerLow => Direction::Bullish,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructurePoint {
  pub timestamp: i64,
  pub price: f64,
  pub kind: StructureKind,
  pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PivotSide {
  High,
  Low,
}

#[derive(Debug, Clone, Copy)]
struct Pivot {
  side: PivotSide,
  timestamp: i64,
  price: f64,
}

/// Pivot-based swing structure detector
#[derive(Debug, Clone)]
pub struct SwingDetector {
  /// Bars on each side a pivot must strictly exceed
  pub lookback: Period,
}

impl Default for SwingDetector {
  fn default() -> Self {
    Self { lookback: Period::new_const(helpers::DEFAULT_SWING_LOOKBACK) }
  }
}

impl SwingDetector {
  pub fn new(lookback: Period) -> Self {
    Self { lookback }
  }

  fn pivots<T: OHLC>(&self, bars: &[T]) -> Vec<Pivot> {
    let w = self.lookback.get();
    let n = bars.len();
    let mut pivots = Vec::new();
    if n < 2 * w + 1 {
      return pivots;
    }

    for i in w..n - w {
      let mut window = bars[i - w..=i + w].iter().enumerate().filter(|(j, _)| *j != w);
      let (high, low) = (bars[i].high(), bars[i].low());

      if window.clone().all(|(_, b)| high > b.high()) {
        pivots.push(Pivot { side: PivotSide::High, timestamp: bars[i].timestamp(), price: high });
      }
      if window.all(|(_, b)| low < b.low()) {
        pivots.push(Pivot { side: PivotSide::Low, timestamp: bars[i].timestamp(), price: low });
      }
    }

    // Single pass: index-ordered, high before low on a shared index
    pivots
  }
}

impl SeriesDetector for SwingDetector {
  type Output = StructurePoint;

  fn id(&self) -> DetectorId {
    DetectorId("SWING_STRUCTURE")
  }

  fn min_bars(&self) -> usize {
    2 * self.lookback.get() + 1
  }

  fn detect<T: OHLC>(&self, bars: &[T]) -> Vec<StructurePoint> {
    let mut last_high: Option<f64> = None;
    let mut last_low: Option<f64> = None;
    let mut points = Vec::new();

    for pivot in self.pivots(bars) {
      let (tracker, kind) = match pivot.side {
        PivotSide::High => {
          let kind = last_high.map(|prev| {
            if pivot.price > prev {
              StructureKind::HigherHigh
            } else {
              StructureKind::LowerHigh
            }
          });
          (&mut last_high, kind)
        },
        PivotSide::Low => {
          let kind = last_low.map(|prev| {
            if pivot.price < prev {
              StructureKind::LowerLow
            } else {
              StructureKind::HigherLow
            }
          });
          (&mut last_low, kind)
        },
      };
      *tracker = Some(pivot.price);

      if let Some(kind) = kind {
        points.push(StructurePoint {
          timestamp: pivot.timestamp,
          price: pivot.price,
          kind,
          direction: kind.direction(),
        });
      }
    }

    points
  }
}

impl ParameterizedDetector for SwingDetector {
  fn param_meta() -> &'static [ParamMeta] {
    static PARAMS: [ParamMeta; 1] = [ParamMeta::period(
      "swing_lookback",
      helpers::DEFAULT_SWING_LOOKBACK as f64,
      (1.0, 50.0),
      "Bars on each side a pivot high/low must strictly exceed",
    )];
    &PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    Ok(Self { lookback: get_period(params, "swing_lookback", helpers::DEFAULT_SWING_LOOKBACK)? })
  }

  fn detector_id_str() -> &'static str {
    "SWING_STRUCTURE"
  }
}
