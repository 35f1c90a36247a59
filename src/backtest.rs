//! Forward-replay backtest under a fixed 1:2 risk contract
//!
//! Each signal is replayed against the bars after its anchor. The first bar
//! touching the stop or the target resolves it; a bar touching both counts
//! as a loss. Signals never resolved before the data ends stay `Pending`.

use serde::{Deserialize, Serialize};

use crate::{
  signals::{EntrySignal, Outcome, Side},
  OHLC,
};

pub const INITIAL_BALANCE: f64 = 100_000.0;
pub const RISK_PER_TRADE: f64 = 1_000.0;
pub const REWARD_PER_TRADE: f64 = 2_000.0;
/// Profit factor reported when there are wins but no losses
pub const PROFIT_FACTOR_SENTINEL: f64 = 999.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestStats {
  pub total_trades: usize,
  pub wins: usize,
  pub losses: usize,
  /// Percent of resolved trades won
  pub win_rate: f64,
  pub net_pnl: f64,
  pub profit_factor: f64,
  pub max_drawdown: f64,
  pub equity_curve: Vec<f64>,
}

impl BacktestStats {
  pub fn empty(initial_balance: f64) -> Self {
    Self {
      total_trades: 0,
      wins: 0,
      losses: 0,
      win_rate: 0.0,
      net_pnl: 0.0,
      profit_factor: 0.0,
      max_drawdown: 0.0,
      equity_curve: vec![initial_balance],
    }
  }
}

/// Fixed-risk signal replay
#[derive(Debug, Clone)]
pub struct Backtester {
  pub initial_balance: f64,
  pub risk_per_trade: f64,
  pub reward_per_trade: f64,
}

impl Default for Backtester {
  fn default() -> Self {
    Self {
      initial_balance: INITIAL_BALANCE,
      risk_per_trade: RISK_PER_TRADE,
      reward_per_trade: REWARD_PER_TRADE,
    }
  }
}

impl Backtester {
  pub fn with_defaults() -> Self {
    Self::default()
  }

  /// Resolve one signal against the bars after its anchor.
  pub fn resolve<T: OHLC>(&self, bars: &[T], signal: &EntrySignal) -> Outcome {
    let Ok(anchor) = bars.binary_search_by_key(&signal.timestamp, |b| b.timestamp()) else {
      return Outcome::Pending;
    };

    for bar in &bars[anchor + 1..] {
      let (stop_hit, target_hit) = match signal.side {
        Side::Long => (bar.low() <= signal.stop_loss, bar.high() >= signal.take_profit),
        Side::Short => (bar.high() >= signal.stop_loss, bar.low() <= signal.take_profit),
      };
      if stop_hit {
        return Outcome::Loss;
      }
      if target_hit {
        return Outcome::Win;
      }
    }

    Outcome::Pending
  }

  pub fn pnl(&self, outcome: Outcome) -> f64 {
    match outcome {
      Outcome::Win => self.reward_per_trade,
      Outcome::Loss => -self.risk_per_trade,
      Outcome::Pending => 0.0,
    }
  }

  /// Fill in outcome/pnl on every signal and compute aggregate stats.
  pub fn run<T: OHLC>(&self, bars: &[T], signals: Vec<EntrySignal>) -> (Vec<EntrySignal>, BacktestStats) {
    let mut stats = BacktestStats::empty(self.initial_balance);
    stats.total_trades = signals.len();

    let mut balance = self.initial_balance;
    let mut peak = balance;

    let signals: Vec<EntrySignal> = signals
      .into_iter()
      .map(|signal| {
        let outcome = self.resolve(bars, &signal);
        let pnl = self.pnl(outcome);

        match outcome {
          Outcome::Win => stats.wins += 1,
          Outcome::Loss => stats.losses += 1,
          Outcome::Pending => {},
        }
        if outcome != Outcome::Pending {
          balance += pnl;
          peak = peak.max(balance);
          stats.max_drawdown = stats.max_drawdown.max(peak - balance);
          stats.equity_curve.push(balance);
        }

        EntrySignal { backtest_outcome: Some(outcome), backtest_pnl: Some(pnl), ..signal }
      })
      .collect();

    let resolved = stats.wins + stats.losses;
    stats.net_pnl = balance - self.initial_balance;
    stats.win_rate = if resolved > 0 { stats.wins as f64 / resolved as f64 * 100.0 } else { 0.0 };
    stats.profit_factor = if stats.losses > 0 {
      (stats.wins as f64 * self.reward_per_trade) / (stats.losses as f64 * self.risk_per_trade)
    } else if stats.wins > 0 {
      PROFIT_FACTOR_SENTINEL
    } else {
      0.0
    };

    (signals, stats)
  }
}
