//! Interval labels: higher-timeframe mapping and trading style

use serde::{Deserialize, Serialize};

/// Intervals treated as scalping timeframes
pub const SCALP_INTERVALS: [&str; 3] = ["1m", "3m", "5m"];

/// Higher timeframe used for auxiliary zone context.
///
/// `1m/3m/5m -> 1h`, `15m/30m -> 4h`, `1h/4h -> 1d`, anything else `1d`.
pub fn higher_timeframe(interval: &str) -> &'static str {
    match interval {
        "1m" | "3m" | "5m" => "1h",
        "15m" | "30m" => "4h",
        "1h" | "4h" => "1d",
        _ => "1d",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradingStyle {
    Scalp,
    DayTrade,
}

impl TradingStyle {
    pub fn for_interval(interval: &str) -> Self {
        if SCALP_INTERVALS.contains(&interval) {
            TradingStyle::Scalp
        } else {
            TradingStyle::DayTrade
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_higher_timeframe_mapping() {
        for (lo, hi) in [
            ("1m", "1h"),
            ("3m", "1h"),
            ("5m", "1h"),
            ("15m", "4h"),
            ("30m", "4h"),
            ("1h", "1d"),
            ("4h", "1d"),
            ("1d", "1d"),
            ("1w", "1d"),
            ("", "1d"),
        ] {
            assert_eq!(higher_timeframe(lo), hi, "interval {lo}");
        }
    }

    #[test]
    fn test_trading_style() {
        assert_eq!(TradingStyle::for_interval("1m"), TradingStyle::Scalp);
        assert_eq!(TradingStyle::for_interval("5m"), TradingStyle::Scalp);
        assert_eq!(TradingStyle::for_interval("15m"), TradingStyle::DayTrade);
        assert_eq!(TradingStyle::for_interval("1d"), TradingStyle::DayTrade);
    }
}
