//! Property tests for pipeline invariants.
//!
//! Uses proptest over random-walk bar series to verify:
//! 1. Determinism: the same snapshot always yields the same analysis
//! 2. Live entities: reported zones and gaps are never mitigated
//! 3. Signal pacing and stop/target geometry
//! 4. Backtest and daily rollup bookkeeping

use proptest::prelude::*;
use smcd::prelude::*;

/// 2024-01-01 00:00:00 UTC
const BASE_TS: i64 = 1_704_067_200;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Random walk of 5-minute bars. Each step is (drift, body, upper wick, lower wick).
fn arb_bars(min: usize, max: usize) -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec(
        (-1.0..1.0_f64, -1.5..1.5_f64, 0.0..1.0_f64, 0.0..1.0_f64),
        min..max,
    )
    .prop_map(|steps| {
        let mut price = 100.0;
        steps
            .into_iter()
            .enumerate()
            .map(|(i, (drift, body, up, down))| {
                let open = price;
                let close = (open + body).max(1.0);
                let bar = Bar::new(
                    BASE_TS + i as i64 * 300,
                    open,
                    open.max(close) + up,
                    (open.min(close) - down).max(0.5),
                    close,
                );
                price = (close + drift).max(1.0);
                bar
            })
            .collect()
    })
}

fn analyzer(interval: &str) -> Analyzer {
    AnalyzerBuilder::new()
        .interval(interval)
        .validate_data(true)
        .build()
        .unwrap()
}

// ── 1. Determinism ───────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Two runs over the same snapshot agree, down to the serialized form.
    #[test]
    fn runs_are_deterministic(bars in arb_bars(0, 400)) {
        let analyzer = analyzer("5m");
        let first = analyzer.run(&bars).unwrap();
        let second = analyzer.run(&bars).unwrap();

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    /// The parallel higher-timeframe path leaves the primary analysis untouched.
    #[test]
    fn higher_timeframe_does_not_change_primary(
        bars in arb_bars(0, 300),
        higher in arb_bars(0, 120),
    ) {
        let analyzer = analyzer("15m");
        let plain = analyzer.run(&bars).unwrap();
        let mut joined = analyzer.run_with_higher_timeframe(&bars, &higher).unwrap();

        let context = joined.higher_timeframe.take().unwrap();
        prop_assert_eq!(context.interval.as_str(), "4h");
        prop_assert_eq!(context.zones, analyzer.impulse_zones(&higher));
        prop_assert_eq!(plain, joined);
    }
}

// ── 2. Live entities ─────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn zones_are_live_and_bounded(bars in arb_bars(0, 400)) {
        let analysis = analyzer("1h").run(&bars).unwrap();

        prop_assert!(analysis.zones.len() <= 10);
        prop_assert!(analysis.zones.iter().all(|z| !z.mitigated));
        prop_assert!(analysis.zones.iter().all(|z| z.state() != ZoneState::Mitigated));
        prop_assert!(analysis.zones.iter().all(|z| z.price_low <= z.price_high));
    }

    #[test]
    fn gaps_are_live(bars in arb_bars(0, 400)) {
        let gaps = FvgDetector::default().detect(&bars);

        for gap in &gaps {
            prop_assert!(!gap.mitigated);
            prop_assert!(gap.price_low < gap.price_high);

            let anchor = bars.iter().position(|b| b.timestamp == gap.timestamp).unwrap();
            prop_assert!(bars[anchor + 1..].iter().all(|b| !gap.is_mitigated_by(b)));
        }
    }

    #[test]
    fn structure_is_time_ordered(bars in arb_bars(0, 300), lookback in 1..8_usize) {
        let points = SwingDetector::new(Period::new(lookback).unwrap()).detect(&bars);
        prop_assert!(points.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }
}

// ── 3. Signals ───────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn signals_respect_cooldown(bars in arb_bars(100, 500)) {
        let analysis = analyzer("5m").run(&bars).unwrap();

        for pair in analysis.signals.windows(2) {
            prop_assert!(pair[1].timestamp - pair[0].timestamp >= 600);
        }
        if let Some(first) = analysis.signals.first() {
            prop_assert!(first.timestamp >= bars[100].timestamp);
        }
    }

    #[test]
    fn signal_levels_follow_risk(bars in arb_bars(100, 500)) {
        let analysis = analyzer("5m").run(&bars).unwrap();

        for s in &analysis.signals {
            prop_assert!(s.score >= 4);
            prop_assert!(s.win_probability <= 95);
            prop_assert_eq!(s.trading_style, TradingStyle::Scalp);
            // Target sits twice the stop distance on the other side of entry
            let (risk, reward) = match s.side {
                Side::Long => (s.entry_price - s.stop_loss, s.take_profit - s.entry_price),
                Side::Short => (s.stop_loss - s.entry_price, s.entry_price - s.take_profit),
            };
            prop_assert!((reward - 2.0 * risk).abs() < 1e-6);
            prop_assert!(s.entry_price == bars.iter().find(|b| b.timestamp == s.timestamp).unwrap().close);
        }
    }
}

// ── 4. Backtest and daily rollup ─────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn backtest_bookkeeping(bars in arb_bars(100, 500)) {
        let analysis = analyzer("5m").run(&bars).unwrap();
        let stats = &analysis.stats;

        prop_assert!(analysis.signals.iter().all(|s| s.backtest_outcome.is_some()));
        prop_assert_eq!(stats.total_trades, analysis.signals.len());
        prop_assert_eq!(stats.equity_curve.len(), stats.wins + stats.losses + 1);
        prop_assert_eq!(stats.equity_curve[0], 100_000.0);

        let last = *stats.equity_curve.last().unwrap();
        prop_assert!((stats.net_pnl - (last - 100_000.0)).abs() < 1e-6);
        prop_assert!(stats.max_drawdown >= 0.0);
    }

    #[test]
    fn daily_rollup_is_bounded(bars in arb_bars(100, 1500)) {
        let analysis = analyzer("5m").run(&bars).unwrap();

        prop_assert!(analysis.daily.len() <= 3);
        prop_assert!(analysis.daily.windows(2).all(|w| w[0].date > w[1].date));
        for day in &analysis.daily {
            prop_assert!(day.trade_count <= 10);
            prop_assert_eq!(day.trade_count, day.trades.len());
            prop_assert!(day.trades.iter().all(|t| t.is_resolved()));
            prop_assert!((day.net_pnl - (day.total_gain - day.total_loss)).abs() < 1e-9);
        }
    }
}
