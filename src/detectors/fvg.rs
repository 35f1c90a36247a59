//! Fair value gap detection
//!
//! A three-bar imbalance: the outer bars leave a price band untraded. Gaps
//! are collected over the whole series first, then each is checked against
//! every later bar; only gaps never traded through are returned.

use serde::{Deserialize, Serialize};

use crate::{DetectorId, Direction, SeriesDetector, OHLC};

use super::helpers;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairValueGap {
  pub id: String,
  /// Timestamp of the middle bar
  pub timestamp: i64,
  pub price_high: f64,
  pub price_low: f64,
  pub direction: Direction,
  pub mitigated: bool,
  pub is_silver_bullet: bool,
}

impl FairValueGap {
  /// Whether a later bar trades through the far boundary.
  #[inline]
  pub fn is_mitigated_by<T: OHLC>(&self, bar: &T) -> bool {
    match self.direction {
      Direction::Bullish => bar.low() < self.price_low,
      Direction::Bearish => bar.high() > self.price_high,
    }
  }

  #[inline]
  pub fn contains(&self, price: f64) -> bool {
    helpers::in_band(price, self.price_low, self.price_high)
  }
}

/// Three-bar imbalance detector
#[derive(Debug, Clone, Default)]
pub struct FvgDetector;

impl FvgDetector {
  pub fn with_defaults() -> Self {
    Self
  }

  /// Every gap in the series, mitigated or not, in detection order.
  pub fn candidates<T: OHLC>(&self, bars: &[T]) -> Vec<(usize, FairValueGap)> {
    let mut gaps = Vec::new();
    if bars.len() < 3 {
      return gaps;
    }

    for i in 2..bars.len() {
      let first = &bars[i - 2];
      let middle = &bars[i - 1];
      let third = &bars[i];

      let band = if first.high() < third.low() {
        Some((Direction::Bullish, third.low(), first.high()))
      } else if first.low() > third.high() {
        Some((Direction::Bearish, first.low(), third.high()))
      } else {
        None
      };

      if let Some((direction, price_high, price_low)) = band {
        let timestamp = middle.timestamp();
        gaps.push((
          i,
          FairValueGap {
            id: format!("fvg-{timestamp}"),
            timestamp,
            price_high,
            price_low,
            direction,
            mitigated: false,
            is_silver_bullet: helpers::is_silver_bullet(timestamp),
          },
        ));
      }
    }

    gaps
  }
}

impl SeriesDetector for FvgDetector {
  type Output = FairValueGap;

  fn id(&self) -> DetectorId {
    DetectorId("FAIR_VALUE_GAP")
  }

  fn min_bars(&self) -> usize {
    3
  }

  fn detect<T: OHLC>(&self, bars: &[T]) -> Vec<FairValueGap> {
    self
      .candidates(bars)
      .into_iter()
      .filter_map(|(third, mut gap)| {
        // Bars from the third leg onward are all later than the middle bar
        gap.mitigated = bars[third..].iter().any(|b| gap.is_mitigated_by(b));
        (!gap.mitigated).then_some(gap)
      })
      .collect()
  }
}
