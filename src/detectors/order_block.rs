//! Impulse zone (order block) detection
//!
//! A zone is the last opposing candle before an impulsive bar that closes
//! beyond it. After detection every zone runs through a two-stage lifecycle
//! over the bars that follow it:
//!
//! ```text
//! Standard --(close through far side)--> Breaker (direction flips)
//! Breaker  --(close through far side)--> Mitigated (terminal)
//! ```
//!
//! Only unmitigated zones survive, and of those only the most recent
//! [`ZONE_RETENTION`](super::helpers::ZONE_RETENTION).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
  params::{get_multiplier, ParamMeta, ParameterizedDetector},
  AnalysisError, DetectorId, Direction, Multiplier, OHLCExt, Result, SeriesDetector, OHLC,
};

use super::helpers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneSubtype {
  Standard,
  Breaker,
  /// Reserved for swing-anchored zones; detection never emits it
  Swing,
}

/// Lifecycle stage of a zone, derived from its subtype and mitigation flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneState {
  Standard,
  Breaker,
  Mitigated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpulseZone {
  pub id: String,
  pub timestamp: i64,
  pub price_high: f64,
  pub price_low: f64,
  pub direction: Direction,
  pub subtype: ZoneSubtype,
  pub mitigated: bool,
}

impl ImpulseZone {
  pub fn state(&self) -> ZoneState {
    match (self.mitigated, self.subtype) {
      (true, _) => ZoneState::Mitigated,
      (false, ZoneSubtype::Breaker) => ZoneState::Breaker,
      (false, _) => ZoneState::Standard,
    }
  }

  /// A close beyond the side the zone is supposed to hold
  #[inline]
  pub fn is_violated_by(&self, close: f64) -> bool {
    match self.direction {
      Direction::Bullish => close < self.price_low,
      Direction::Bearish => close > self.price_high,
    }
  }

  /// Advance the lifecycle by one closing price.
  pub fn on_close(self, close: f64) -> ImpulseZone {
    match self.state() {
      ZoneState::Mitigated => self,
      _ if !self.is_violated_by(close) => self,
      ZoneState::Standard => {
        trace!(zone = %self.id, close, "zone flipped to breaker");
        ImpulseZone {
          subtype: ZoneSubtype::Breaker,
          direction: self.direction.opposite(),
          ..self
        }
      },
      ZoneState::Breaker => {
        trace!(zone = %self.id, close, "breaker mitigated");
        ImpulseZone { mitigated: true, ..self }
      },
    }
  }

  #[inline]
  pub fn contains(&self, price: f64) -> bool {
    helpers::in_band(price, self.price_low, self.price_high)
  }
}

/// Order block detector
#[derive(Debug, Clone)]
pub struct OrderBlockDetector {
  /// Impulse body must exceed the mean body times this
  pub impulse_multiplier: Multiplier,
  /// Bars averaged for the mean body
  pub body_window: usize,
  /// Unmitigated zones kept, most recent
  pub retention: usize,
}

impl Default for OrderBlockDetector {
  fn default() -> Self {
    Self {
      impulse_multiplier: Multiplier::new_const(helpers::DEFAULT_IMPULSE_MULTIPLIER),
      body_window: helpers::IMPULSE_BODY_WINDOW,
      retention: helpers::ZONE_RETENTION,
    }
  }
}

impl OrderBlockDetector {
  pub fn with_defaults() -> Self {
    Self::default()
  }

  pub fn new(impulse_multiplier: Multiplier) -> Self {
    Self { impulse_multiplier, ..Self::default() }
  }

  pub fn impulse_threshold<T: OHLC>(&self, bars: &[T]) -> f64 {
    helpers::mean_body(bars, self.body_window) * self.impulse_multiplier.get()
  }

  /// Freshly detected zones (all Standard) with their bar index.
  pub fn candidates<T: OHLC>(&self, bars: &[T]) -> Vec<(usize, ImpulseZone)> {
    let threshold = self.impulse_threshold(bars);
    let mut zones = Vec::new();

    for i in 2..bars.len().saturating_sub(3) {
      let c = &bars[i];
      let next = &bars[i + 1];

      let direction = if c.is_bearish() && next.close() - next.open() > threshold && next.close() > c.high() {
        Direction::Bullish
      } else if c.is_bullish() && next.open() - next.close() > threshold && next.close() < c.low() {
        Direction::Bearish
      } else {
        continue;
      };

      let timestamp = c.timestamp();
      zones.push((
        i,
        ImpulseZone {
          id: format!("ob-{timestamp}"),
          timestamp,
          price_high: c.high(),
          price_low: c.low(),
          direction,
          subtype: ZoneSubtype::Standard,
          mitigated: false,
        },
      ));
    }

    zones
  }

  /// Fold every bar after `index` into the zone's lifecycle.
  pub fn run_lifecycle<T: OHLC>(bars: &[T], index: usize, zone: ImpulseZone) -> ImpulseZone {
    let mut zone = zone;
    for bar in bars.iter().skip(index + 1) {
      zone = zone.on_close(bar.close());
      if zone.mitigated {
        break;
      }
    }
    zone
  }
}

impl SeriesDetector for OrderBlockDetector {
  type Output = ImpulseZone;

  fn id(&self) -> DetectorId {
    DetectorId("ORDER_BLOCK")
  }

  fn min_bars(&self) -> usize {
    6
  }

  fn validate_config(&self) -> Result<()> {
    if self.body_window == 0 {
      return Err(AnalysisError::InvalidConfig("body_window must be > 0".into()));
    }
    Ok(())
  }

  fn detect<T: OHLC>(&self, bars: &[T]) -> Vec<ImpulseZone> {
    let live: Vec<ImpulseZone> = self
      .candidates(bars)
      .into_iter()
      .map(|(i, zone)| Self::run_lifecycle(bars, i, zone))
      .filter(|z| !z.mitigated)
      .collect();

    let skip = live.len().saturating_sub(self.retention);
    live.into_iter().skip(skip).collect()
  }
}

impl ParameterizedDetector for OrderBlockDetector {
  fn param_meta() -> &'static [ParamMeta] {
    static PARAMS: [ParamMeta; 1] = [ParamMeta::multiplier(
      "impulse_multiplier",
      helpers::DEFAULT_IMPULSE_MULTIPLIER,
      (0.1, 10.0),
      "Impulse bar body must exceed mean body (last 100 bars) times this",
    )];
    &PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    Ok(Self::new(get_multiplier(params, "impulse_multiplier", helpers::DEFAULT_IMPULSE_MULTIPLIER)?))
  }

  fn detector_id_str() -> &'static str {
    "ORDER_BLOCK"
  }
}
