//! Daily performance rollup of backtested signals

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  backtest::{REWARD_PER_TRADE, RISK_PER_TRADE},
  signals::{EntrySignal, Outcome},
};

/// Most recent calendar dates reported
pub const DAILY_DATE_LIMIT: usize = 3;
/// Trades kept per date, most recent first
pub const DAILY_TRADE_CAP: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStat {
  pub date: NaiveDate,
  pub total_gain: f64,
  pub total_loss: f64,
  pub net_pnl: f64,
  pub trade_count: usize,
  /// Newest first
  pub trades: Vec<EntrySignal>,
}

#[derive(Debug, Clone)]
pub struct DailyAggregator {
  /// Offset defining the local calendar day
  pub utc_offset: FixedOffset,
  pub date_limit: usize,
  pub trade_cap: usize,
  pub gain_per_win: f64,
  pub loss_per_loss: f64,
}

impl Default for DailyAggregator {
  fn default() -> Self {
    Self {
      utc_offset: Utc.fix(),
      date_limit: DAILY_DATE_LIMIT,
      trade_cap: DAILY_TRADE_CAP,
      gain_per_win: REWARD_PER_TRADE,
      loss_per_loss: RISK_PER_TRADE,
    }
  }
}

impl DailyAggregator {
  pub fn with_utc_offset(utc_offset: FixedOffset) -> Self {
    Self { utc_offset, ..Self::default() }
  }

  pub fn local_date(&self, timestamp: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.with_timezone(&self.utc_offset).date_naive())
  }

  /// Group resolved signals by local date, newest dates first.
  pub fn aggregate(&self, signals: &[EntrySignal]) -> Vec<DailyStat> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&EntrySignal>> = BTreeMap::new();
    for signal in signals.iter().filter(|s| s.is_resolved()) {
      if let Some(date) = self.local_date(signal.timestamp) {
        by_date.entry(date).or_default().push(signal);
      }
    }

    by_date
      .into_iter()
      .rev()
      .take(self.date_limit)
      .map(|(date, mut day)| {
        day.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        day.truncate(self.trade_cap);

        let wins = day.iter().filter(|s| s.backtest_outcome == Some(Outcome::Win)).count();
        let losses = day.iter().filter(|s| s.backtest_outcome == Some(Outcome::Loss)).count();
        let total_gain = wins as f64 * self.gain_per_win;
        let total_loss = losses as f64 * self.loss_per_loss;

        DailyStat {
          date,
          total_gain,
          total_loss,
          net_pnl: total_gain - total_loss,
          trade_count: day.len(),
          trades: day.into_iter().cloned().collect(),
        }
      })
      .collect()
  }
}
