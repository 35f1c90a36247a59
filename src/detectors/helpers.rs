//! Common helpers for structure, gap and zone detection
//!
//! Named thresholds shared across the detector modules plus the small
//! time-of-day and trailing-window computations they all lean on.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{OHLCExt, OHLC};

// ============================================================
// DETECTOR THRESHOLDS
// ============================================================

/// Bars on each side a pivot must strictly exceed
pub const DEFAULT_SWING_LOOKBACK: usize = 5;
/// Impulse bar body must exceed mean body * multiplier
pub const DEFAULT_IMPULSE_MULTIPLIER: f64 = 1.2;
/// Number of most recent bars used for the mean body size
pub const IMPULSE_BODY_WINDOW: usize = 100;
/// Unmitigated zones retained, most recent first
pub const ZONE_RETENTION: usize = 10;
/// UTC hours whose middle bar marks a gap as a silver bullet
pub const SILVER_BULLET_HOURS: [u32; 3] = [3, 9, 14];

// ============================================================
// SESSIONS
// ============================================================

/// Named trading session, by UTC hour.
///
/// Windows overlap (07:00 is both Asia and London, 12:00-15:59 both London
/// and New York). [`Session::at`] resolves overlaps in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Session {
  Asia,
  London,
  NewYork,
}

impl Session {
  pub const ALL: [Session; 3] = [Session::Asia, Session::London, Session::NewYork];

  /// Half-open `[start, end)` window in UTC hours
  pub const fn window(self) -> (u32, u32) {
    match self {
      Session::Asia => (0, 8),
      Session::London => (7, 16),
      Session::NewYork => (12, 21),
    }
  }

  pub fn contains(self, hour: u32) -> bool {
    let (start, end) = self.window();
    (start..end).contains(&hour)
  }

  /// First session whose window contains `hour`
  pub fn at(hour: u32) -> Option<Session> {
    Self::ALL.into_iter().find(|s| s.contains(hour))
  }

  pub fn name(self) -> &'static str {
    match self {
      Session::Asia => "Asia",
      Session::London => "London",
      Session::NewYork => "New York",
    }
  }
}

// ============================================================
// HELPER FUNCTIONS
// ============================================================

/// UTC hour of a unix timestamp in seconds. `None` outside chrono's range.
#[inline]
pub fn utc_hour(timestamp: i64) -> Option<u32> {
  DateTime::<Utc>::from_timestamp(timestamp, 0).map(|dt| dt.hour())
}

#[inline]
pub fn is_silver_bullet(timestamp: i64) -> bool {
  utc_hour(timestamp).is_some_and(|h| SILVER_BULLET_HOURS.contains(&h))
}

/// Mean absolute body over the last `window` bars (all bars if fewer).
/// The denominator never drops below 1, so an empty series yields 0.0.
#[inline]
pub fn mean_body<T: OHLC>(bars: &[T], window: usize) -> f64 {
  let start = bars.len().saturating_sub(window);
  let slice = &bars[start..];
  let sum: f64 = slice.iter().map(|b| b.body()).sum();
  sum / slice.len().max(1) as f64
}

/// Mean close of the `period` bars strictly before `at`.
#[inline]
pub fn trailing_mean_close<T: OHLC>(bars: &[T], at: usize, period: usize) -> f64 {
  let start = at.saturating_sub(period);
  let slice = &bars[start..at.min(bars.len())];
  let sum: f64 = slice.iter().map(|b| b.close()).sum();
  sum / slice.len().max(1) as f64
}

/// Lowest low of the `period` bars strictly before `at`.
/// Falls back to the bar at `at` when there is no history.
#[inline]
pub fn trailing_low<T: OHLC>(bars: &[T], at: usize, period: usize) -> f64 {
  let start = at.saturating_sub(period);
  bars[start..at]
    .iter()
    .map(|b| b.low())
    .fold(None, |acc: Option<f64>, l| Some(acc.map_or(l, |a| a.min(l))))
    .unwrap_or_else(|| bars[at].low())
}

/// Highest high of the `period` bars strictly before `at`.
/// Falls back to the bar at `at` when there is no history.
#[inline]
pub fn trailing_high<T: OHLC>(bars: &[T], at: usize, period: usize) -> f64 {
  let start = at.saturating_sub(period);
  bars[start..at]
    .iter()
    .map(|b| b.high())
    .fold(None, |acc: Option<f64>, h| Some(acc.map_or(h, |a| a.max(h))))
    .unwrap_or_else(|| bars[at].high())
}

/// Closed band check: `low <= price <= high`
#[inline]
pub fn in_band(price: f64, low: f64, high: f64) -> bool {
  price >= low && price <= high
}
