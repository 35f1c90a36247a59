//! Confluence scoring and entry signal generation
//!
//! Every bar after a warm-up window is scored against the live zones and
//! gaps, the session it falls in, and a simple mean-close bias. Bars that
//! clear the minimum score on the side of the bias become [`EntrySignal`]s,
//! rate-limited by a candle-time cooldown.

use serde::{Deserialize, Serialize};

use crate::{
  detectors::{helpers, FairValueGap, ImpulseZone, Session, ZoneSubtype},
  timeframe::TradingStyle,
  AnalysisError, Direction, OHLCExt, Ratio, Result, OHLC,
};

// ============================================================
// SCORING CONSTANTS
// ============================================================

pub const ZONE_RETEST_SCORE: u32 = 3;
pub const GAP_TOUCH_SCORE: u32 = 2;
pub const SILVER_BULLET_BONUS: u32 = 4;
pub const SESSION_SCORE: u32 = 1;

pub const MIN_SIGNAL_SCORE: u32 = 4;
/// Candle-time seconds between emitted signals
pub const SIGNAL_COOLDOWN_SECS: i64 = 600;
/// Bars skipped before scoring starts
pub const SIGNAL_WARMUP_BARS: usize = 100;
/// Preceding bars averaged for the directional bias
pub const BIAS_WINDOW: usize = 50;
/// Preceding bars scanned for the protective swing
pub const STOP_WINDOW: usize = 5;
/// Stop is pushed this fraction of entry beyond the swing (0.05%)
pub const STOP_BUFFER_RATIO: f64 = 0.0005;
pub const REWARD_MULTIPLE: f64 = 2.0;
/// Body/range above which an in-session bar reads as distribution
pub const DISTRIBUTION_BODY_RATIO: f64 = 0.6;

pub const WIN_PROBABILITY_BASE: u32 = 30;
pub const WIN_PROBABILITY_PER_POINT: u32 = 10;
pub const WIN_PROBABILITY_CAP: u32 = 95;

// ============================================================
// SIGNAL TYPES
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
  Long,
  Short,
}

impl Side {
  pub fn direction(self) -> Direction {
    match self {
      Side::Long => Direction::Bullish,
      Side::Short => Direction::Bearish,
    }
  }
}

/// Power-of-three session phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Po3Phase {
  Accumulation,
  Manipulation,
  Distribution,
  #[default]
  None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
  Win,
  Loss,
  Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySignal {
  pub timestamp: i64,
  pub side: Side,
  pub entry_price: f64,
  pub stop_loss: f64,
  pub take_profit: f64,
  pub score: u32,
  pub confluences: Vec<String>,
  /// Percent, capped at 95
  pub win_probability: u32,
  pub trading_style: TradingStyle,
  pub po3_phase: Po3Phase,
  /// Set once by the backtester
  pub backtest_outcome: Option<Outcome>,
  pub backtest_pnl: Option<f64>,
}

impl EntrySignal {
  pub fn is_resolved(&self) -> bool {
    matches!(self.backtest_outcome, Some(Outcome::Win | Outcome::Loss))
  }
}

/// Confluences found at one bar
#[derive(Debug, Clone, Default)]
pub struct Confluence<'a> {
  pub score: u32,
  pub tags: Vec<String>,
  pub bullish_zone: Option<&'a ImpulseZone>,
  pub bearish_zone: Option<&'a ImpulseZone>,
  pub bullish_gap: Option<&'a FairValueGap>,
  pub bearish_gap: Option<&'a FairValueGap>,
  pub session: Option<Session>,
}

impl Confluence<'_> {
  pub fn supports(&self, side: Side) -> bool {
    match side {
      Side::Long => self.bullish_zone.is_some() || self.bullish_gap.is_some(),
      Side::Short => self.bearish_zone.is_some() || self.bearish_gap.is_some(),
    }
  }
}

// ============================================================
// GENERATOR
// ============================================================

/// Confluence scorer and signal emitter
#[derive(Debug, Clone)]
pub struct SignalGenerator {
  pub min_score: u32,
  pub cooldown_secs: i64,
  pub warmup_bars: usize,
  pub bias_window: usize,
  pub stop_window: usize,
  pub stop_buffer: Ratio,
  pub reward_multiple: f64,
  pub distribution_body_ratio: Ratio,
}

impl Default for SignalGenerator {
  fn default() -> Self {
    Self {
      min_score: MIN_SIGNAL_SCORE,
      cooldown_secs: SIGNAL_COOLDOWN_SECS,
      warmup_bars: SIGNAL_WARMUP_BARS,
      bias_window: BIAS_WINDOW,
      stop_window: STOP_WINDOW,
      stop_buffer: Ratio::new_const(STOP_BUFFER_RATIO),
      reward_multiple: REWARD_MULTIPLE,
      distribution_body_ratio: Ratio::new_const(DISTRIBUTION_BODY_RATIO),
    }
  }
}

/// First entry in storage order with matching direction, anchored strictly
/// before `before`, whose band contains `price`.
fn first_touch<'a, Z, I>(items: I, direction: Direction, price: f64, before: i64) -> Option<&'a Z>
where
  Z: Touchable + 'a,
  I: IntoIterator<Item = &'a Z>,
{
  items
    .into_iter()
    .find(|z| z.direction() == direction && z.anchor() < before && z.band_contains(price))
}

/// Anything with a direction, an anchor time and a price band
pub trait Touchable {
  fn direction(&self) -> Direction;
  fn anchor(&self) -> i64;
  fn band_contains(&self, price: f64) -> bool;
}

impl Touchable for ImpulseZone {
  fn direction(&self) -> Direction {
    self.direction
  }

  fn anchor(&self) -> i64 {
    self.timestamp
  }

  fn band_contains(&self, price: f64) -> bool {
    !self.mitigated && self.contains(price)
  }
}

impl Touchable for FairValueGap {
  fn direction(&self) -> Direction {
    self.direction
  }

  fn anchor(&self) -> i64 {
    self.timestamp
  }

  fn band_contains(&self, price: f64) -> bool {
    !self.mitigated && self.contains(price)
  }
}

fn zone_tag(zone: &ImpulseZone) -> String {
  let side = match zone.direction {
    Direction::Bullish => "Bullish",
    Direction::Bearish => "Bearish",
  };
  let kind = match zone.subtype {
    ZoneSubtype::Breaker => "Breaker",
    ZoneSubtype::Standard | ZoneSubtype::Swing => "OB",
  };
  format!("Retest {side} {kind}")
}

impl SignalGenerator {
  pub fn with_defaults() -> Self {
    Self::default()
  }

  pub fn validate_config(&self) -> Result<()> {
    if self.cooldown_secs < 0 {
      return Err(AnalysisError::InvalidConfig("cooldown_secs must be >= 0".into()));
    }
    if self.stop_window == 0 || self.bias_window == 0 {
      return Err(AnalysisError::InvalidConfig("stop_window and bias_window must be > 0".into()));
    }
    if !(self.reward_multiple.is_finite() && self.reward_multiple > 0.0) {
      return Err(AnalysisError::OutOfRange {
        field: "reward_multiple",
        value: self.reward_multiple,
        min: f64::MIN_POSITIVE,
        max: f64::MAX,
      });
    }
    Ok(())
  }

  /// Score the bar at `index` against the supplied zones and gaps.
  pub fn confluence_at<'a, T: OHLC>(
    &self,
    bars: &[T],
    index: usize,
    zones: &'a [ImpulseZone],
    gaps: &'a [FairValueGap],
  ) -> Confluence<'a> {
    let bar = &bars[index];
    let ts = bar.timestamp();
    let mut c = Confluence {
      bullish_zone: first_touch(zones, Direction::Bullish, bar.low(), ts),
      bearish_zone: first_touch(zones, Direction::Bearish, bar.high(), ts),
      bullish_gap: first_touch(gaps, Direction::Bullish, bar.low(), ts),
      bearish_gap: first_touch(gaps, Direction::Bearish, bar.high(), ts),
      session: helpers::utc_hour(ts).and_then(Session::at),
      ..Confluence::default()
    };

    for zone in [c.bullish_zone, c.bearish_zone].into_iter().flatten() {
      c.score += ZONE_RETEST_SCORE;
      c.tags.push(zone_tag(zone));
    }
    for (gap, tag) in [(c.bullish_gap, "Discount FVG"), (c.bearish_gap, "Premium FVG")] {
      if let Some(gap) = gap {
        c.score += GAP_TOUCH_SCORE;
        c.tags.push(tag.to_string());
        if gap.is_silver_bullet {
          c.score += SILVER_BULLET_BONUS;
          c.tags.push("Silver Bullet Zone".to_string());
        }
      }
    }

    if let Some(session) = c.session {
      c.score += SESSION_SCORE;
      c.tags.push(format!("{} Session", session.name()));
    }

    c
  }

  pub fn po3_phase<T: OHLC>(&self, bar: &T, session: Option<Session>) -> Po3Phase {
    match session {
      Some(Session::Asia) => Po3Phase::Accumulation,
      Some(Session::London | Session::NewYork) => {
        if bar.body() > self.distribution_body_ratio.get() * bar.range() {
          Po3Phase::Distribution
        } else {
          Po3Phase::Manipulation
        }
      },
      None => Po3Phase::None,
    }
  }

  /// Stop and target for an entry on `side` at `index`.
  ///
  /// The stop can land on the winning side of the entry (a swing above a
  /// long entry); the levels are still reported and the backtest resolves
  /// them as they are. `None` only when the levels are not numbers.
  fn levels<T: OHLC>(&self, bars: &[T], index: usize, side: Side, c: &Confluence<'_>) -> Option<(f64, f64, f64)> {
    let entry = bars[index].close();
    let buffer = entry * self.stop_buffer.get();

    let stop = match side {
      Side::Long => {
        let swing = helpers::trailing_low(bars, index, self.stop_window);
        c.bullish_zone.map_or(swing, |z| swing.min(z.price_low)) - buffer
      },
      Side::Short => {
        let swing = helpers::trailing_high(bars, index, self.stop_window);
        c.bearish_zone.map_or(swing, |z| swing.max(z.price_high)) + buffer
      },
    };

    let risk = match side {
      Side::Long => entry - stop,
      Side::Short => stop - entry,
    };
    if risk.is_nan() {
      return None;
    }

    let target = match side {
      Side::Long => entry + self.reward_multiple * risk,
      Side::Short => entry - self.reward_multiple * risk,
    };
    Some((entry, stop, target))
  }

  pub fn win_probability(score: u32) -> u32 {
    (score * WIN_PROBABILITY_PER_POINT + WIN_PROBABILITY_BASE).min(WIN_PROBABILITY_CAP)
  }

  /// Scan the series and emit signals in time order.
  pub fn generate<T: OHLC>(
    &self,
    bars: &[T],
    zones: &[ImpulseZone],
    gaps: &[FairValueGap],
    interval: &str,
  ) -> Vec<EntrySignal> {
    let style = TradingStyle::for_interval(interval);
    let start = self.warmup_bars.max(self.bias_window);
    let mut signals = Vec::new();
    let mut last_ts: Option<i64> = None;

    for i in start..bars.len() {
      let bar = &bars[i];
      let ts = bar.timestamp();

      let c = self.confluence_at(bars, i, zones, gaps);
      if c.score < self.min_score {
        continue;
      }
      if last_ts.is_some_and(|last| ts - last < self.cooldown_secs) {
        continue;
      }

      let avg = helpers::trailing_mean_close(bars, i, self.bias_window);
      let side = if bar.close() > avg {
        Side::Long
      } else if bar.close() < avg {
        Side::Short
      } else {
        continue;
      };
      if !c.supports(side) {
        continue;
      }

      let Some((entry_price, stop_loss, take_profit)) = self.levels(bars, i, side, &c) else {
        continue;
      };

      signals.push(EntrySignal {
        timestamp: ts,
        side,
        entry_price,
        stop_loss,
        take_profit,
        score: c.score,
        win_probability: Self::win_probability(c.score),
        trading_style: style,
        po3_phase: self.po3_phase(bar, c.session),
        confluences: c.tags,
        backtest_outcome: None,
        backtest_pnl: None,
      });
      last_ts = Some(ts);
    }

    signals
  }
}
