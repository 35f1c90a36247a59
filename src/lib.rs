//! # SMCD - Smart-Money Concept Detector
//!
//! Market-structure analysis over OHLC bar series: swing structure, fair
//! value gaps, order blocks with breaker reclassification, confluence-scored
//! entry signals, and a fixed-risk forward backtest with a daily rollup.
//!
//! ## Quick Start
//!
//! ```rust
//! use smcd::prelude::*;
//!
//! let bars: Vec<Bar> = (0..300_i64)
//!     .map(|i| {
//!         let p = 100.0 + (i as f64 * 0.2).sin() * 3.0;
//!         Bar::new(1_700_000_000 + i * 900, p, p + 0.6, p - 0.6, p + 0.2)
//!     })
//!     .collect();
//!
//! let analyzer = AnalyzerBuilder::new()
//!     .interval("15m")
//!     .swing_lookback(5)
//!     .build()
//!     .unwrap();
//!
//! let analysis = analyzer.run(&bars).unwrap();
//! assert_eq!(analysis.stats.equity_curve[0], 100_000.0);
//! ```

pub mod backtest;
pub mod daily;
pub mod detectors;
pub mod feed;
pub mod params;
pub mod signals;
pub mod timeframe;

pub mod prelude {
    pub use crate::{
        // Pipeline
        analyze_parallel,
        backtest::{Backtester, BacktestStats},
        daily::{DailyAggregator, DailyStat},
        // Detectors
        detectors::*,
        feed::parse_bars,
        params::{ParamMeta, ParamType, ParameterizedDetector},
        signals::{EntrySignal, Outcome, Po3Phase, Side, SignalGenerator},
        timeframe::{higher_timeframe, TradingStyle},
        Analysis,
        AnalysisError,
        AnalysisFailure,
        AnalysisResult,
        Analyzer,
        AnalyzerBuilder,
        Bar,
        DetectorId,
        Direction,
        HigherTimeframeContext,
        Multiplier,
        OHLCExt,
        Period,
        Ratio,
        Result,
        SeriesDetector,
        OHLC,
    };
}

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use tracing::debug;

use backtest::{BacktestStats, Backtester};
use daily::{DailyAggregator, DailyStat};
use detectors::{FairValueGap, FvgDetector, ImpulseZone, OrderBlockDetector, StructurePoint, SwingDetector};
use signals::{EntrySignal, SignalGenerator};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised by configuration, bar validation and feed parsing.
///
/// Detectors themselves never fail: any well-typed series, including an
/// empty one, produces a (possibly empty) result.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid OHLC at index {index}: {reason}")]
    InvalidOHLC { index: usize, reason: &'static str },

    #[error("Market data unavailable: {0}")]
    DataUnavailable(String),
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(AnalysisError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(AnalysisError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(AnalysisError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

/// Scaling factor (finite, > 0)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Multiplier(f64);

impl Multiplier {
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(AnalysisError::InvalidValue(
                "Multiplier cannot be NaN or infinite",
            ));
        }
        if value <= 0.0 {
            return Err(AnalysisError::OutOfRange {
                field: "Multiplier",
                value,
                min: f64::MIN_POSITIVE,
                max: f64::MAX,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Multiplier {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Multiplier {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Multiplier::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLC TRAITS
// ============================================================

/// Core bar trait. Timestamps are unix seconds, strictly increasing
/// across a series.
pub trait OHLC {
    fn timestamp(&self) -> i64;
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
}

/// Extension trait with computed properties for OHLC data
pub trait OHLCExt: OHLC {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Body as ratio of range. Returns None if range is ~0
    #[inline]
    fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > f64::EPSILON).then(|| self.body() / range)
    }

    /// Validate OHLC data consistency
    fn validate(&self) -> Result<()> {
        if self.open().is_nan()
            || self.high().is_nan()
            || self.low().is_nan()
            || self.close().is_nan()
        {
            return Err(AnalysisError::InvalidOHLC {
                index: 0,
                reason: "NaN in OHLC",
            });
        }
        if self.open().is_infinite()
            || self.high().is_infinite()
            || self.low().is_infinite()
            || self.close().is_infinite()
        {
            return Err(AnalysisError::InvalidOHLC {
                index: 0,
                reason: "Infinite value in OHLC",
            });
        }
        if self.high() < self.low() {
            return Err(AnalysisError::InvalidOHLC {
                index: 0,
                reason: "high < low",
            });
        }
        Ok(())
    }
}

impl<T: OHLC> OHLCExt for T {}

/// Plain bar record, as delivered by a market-data feed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    #[serde(alias = "time")]
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
        }
    }
}

impl OHLC for Bar {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }
}

/// Direction/bias of a structure point, gap or zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }

    #[inline]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Bullish => Direction::Bearish,
            Direction::Bearish => Direction::Bullish,
        }
    }
}

// ============================================================
// DETECTOR TRAIT
// ============================================================

/// Unique identifier for a detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DetectorId(pub &'static str);

impl DetectorId {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

/// Whole-series detector.
///
/// `detect` is total: fewer than `min_bars` bars yields an empty result.
pub trait SeriesDetector: Send + Sync {
    type Output;

    fn id(&self) -> DetectorId;
    fn min_bars(&self) -> usize;
    fn detect<T: OHLC>(&self, bars: &[T]) -> Vec<Self::Output>;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================
// ANALYSIS RESULT
// ============================================================

/// Zones and gaps computed over the higher-timeframe series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HigherTimeframeContext {
    pub interval: String,
    pub zones: Vec<ImpulseZone>,
    pub gaps: Vec<FairValueGap>,
}

/// Everything derived from one bar series snapshot.
///
/// Replaced wholesale on every run; nothing carries over between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub interval: String,
    pub structure: Vec<StructurePoint>,
    pub gaps: Vec<FairValueGap>,
    pub zones: Vec<ImpulseZone>,
    pub signals: Vec<EntrySignal>,
    pub stats: BacktestStats,
    pub daily: Vec<DailyStat>,
    pub higher_timeframe: Option<HigherTimeframeContext>,
}

// ============================================================
// ANALYZER
// ============================================================

/// Analyzer configuration
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub interval: String,
    pub validate_data: bool,
}

/// The full pipeline: structure, gaps and zones, then signals, backtest
/// and daily rollup.
#[derive(Debug, Clone)]
pub struct Analyzer {
    swing: SwingDetector,
    gaps: FvgDetector,
    order_blocks: OrderBlockDetector,
    signals: SignalGenerator,
    backtester: Backtester,
    daily: DailyAggregator,
    config: AnalyzerConfig,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self {
            swing: SwingDetector::default(),
            gaps: FvgDetector::default(),
            order_blocks: OrderBlockDetector::default(),
            signals: SignalGenerator::default(),
            backtester: Backtester::default(),
            daily: DailyAggregator::default(),
            config: AnalyzerConfig {
                interval: "1d".to_string(),
                validate_data: false,
            },
        }
    }
}

impl Analyzer {
    pub fn interval(&self) -> &str {
        &self.config.interval
    }

    /// Interval of the auxiliary series, per [`timeframe::higher_timeframe`]
    pub fn higher_interval(&self) -> &'static str {
        timeframe::higher_timeframe(&self.config.interval)
    }

    // ===========================================
    // LOW-LEVEL: Individual stages
    // ===========================================

    #[inline]
    pub fn structure<T: OHLC>(&self, bars: &[T]) -> Vec<StructurePoint> {
        self.swing.detect(bars)
    }

    #[inline]
    pub fn fair_value_gaps<T: OHLC>(&self, bars: &[T]) -> Vec<FairValueGap> {
        self.gaps.detect(bars)
    }

    #[inline]
    pub fn impulse_zones<T: OHLC>(&self, bars: &[T]) -> Vec<ImpulseZone> {
        self.order_blocks.detect(bars)
    }

    // ===========================================
    // HIGH-LEVEL: Whole pipeline
    // ===========================================

    /// Run every stage over one snapshot.
    pub fn run<T: OHLC>(&self, bars: &[T]) -> Result<Analysis> {
        if self.config.validate_data {
            self.validate_bars(bars)?;
        }

        let structure = self.structure(bars);
        let gaps = self.fair_value_gaps(bars);
        let zones = self.impulse_zones(bars);
        let signals = self
            .signals
            .generate(bars, &zones, &gaps, &self.config.interval);
        let (signals, stats) = self.backtester.run(bars, signals);
        let daily = self.daily.aggregate(&signals);

        debug!(
            interval = %self.config.interval,
            bars = bars.len(),
            structure = structure.len(),
            gaps = gaps.len(),
            zones = zones.len(),
            signals = signals.len(),
            wins = stats.wins,
            losses = stats.losses,
            "analysis complete"
        );

        Ok(Analysis {
            interval: self.config.interval.clone(),
            structure,
            gaps,
            zones,
            signals,
            stats,
            daily,
            higher_timeframe: None,
        })
    }

    /// Zones and gaps over the higher-timeframe series.
    pub fn higher_timeframe_context<T: OHLC>(&self, bars: &[T]) -> Result<HigherTimeframeContext> {
        if self.config.validate_data {
            self.validate_bars(bars)?;
        }

        let context = HigherTimeframeContext {
            interval: self.higher_interval().to_string(),
            zones: self.impulse_zones(bars),
            gaps: self.fair_value_gaps(bars),
        };
        debug!(
            interval = %context.interval,
            zones = context.zones.len(),
            gaps = context.gaps.len(),
            "higher timeframe context"
        );
        Ok(context)
    }

    /// Primary pipeline and higher-timeframe context, computed side by side.
    pub fn run_with_higher_timeframe<T: OHLC + Sync>(
        &self,
        bars: &[T],
        higher: &[T],
    ) -> Result<Analysis> {
        let (primary, context) = rayon::join(
            || self.run(bars),
            || self.higher_timeframe_context(higher),
        );
        let mut analysis = primary?;
        analysis.higher_timeframe = Some(context?);
        Ok(analysis)
    }

    /// Parse raw feed responses and run. Any rejected response skips the
    /// run entirely with [`AnalysisError::DataUnavailable`].
    pub fn run_json(&self, bars_json: &str, higher_json: Option<&str>) -> Result<Analysis> {
        let bars = feed::parse_bars(bars_json)?;
        match higher_json {
            Some(json) => {
                let higher = feed::parse_bars(json)?;
                self.run_with_higher_timeframe(&bars, &higher)
            }
            None => self.run(&bars),
        }
    }

    // ===========================================
    // Internal helpers
    // ===========================================

    fn validate_bars<T: OHLC>(&self, bars: &[T]) -> Result<()> {
        for (i, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                AnalysisError::InvalidOHLC { reason, .. } => {
                    AnalysisError::InvalidOHLC { index: i, reason }
                }
                other => other,
            })?;
            if i > 0 && bar.timestamp() <= bars[i - 1].timestamp() {
                return Err(AnalysisError::InvalidOHLC {
                    index: i,
                    reason: "timestamp not strictly increasing",
                });
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.swing.validate_config()?;
        self.gaps.validate_config()?;
        self.order_blocks.validate_config()?;
        self.signals.validate_config()?;
        Ok(())
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating Analyzer instances
#[derive(Debug, Clone)]
pub struct AnalyzerBuilder {
    swing_lookback: usize,
    impulse_multiplier: f64,
    impulse_body_window: usize,
    interval: String,
    utc_offset_secs: i32,
    validate_data: bool,
    signals: SignalGenerator,
    backtester: Backtester,
}

impl Default for AnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self {
            swing_lookback: detectors::helpers::DEFAULT_SWING_LOOKBACK,
            impulse_multiplier: detectors::helpers::DEFAULT_IMPULSE_MULTIPLIER,
            impulse_body_window: detectors::helpers::IMPULSE_BODY_WINDOW,
            interval: "1d".to_string(),
            utc_offset_secs: 0,
            validate_data: false,
            signals: SignalGenerator::default(),
            backtester: Backtester::default(),
        }
    }

    /// Bars on each side of a pivot
    pub fn swing_lookback(mut self, lookback: usize) -> Self {
        self.swing_lookback = lookback;
        self
    }

    pub fn impulse_multiplier(mut self, multiplier: f64) -> Self {
        self.impulse_multiplier = multiplier;
        self
    }

    /// Most recent bars averaged for the impulse body threshold
    pub fn impulse_body_window(mut self, bars: usize) -> Self {
        self.impulse_body_window = bars;
        self
    }

    /// Interval label of the primary series (e.g. "5m", "1h")
    pub fn interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = interval.into();
        self
    }

    /// Offset east of UTC defining the calendar day for the daily rollup
    pub fn utc_offset_secs(mut self, secs: i32) -> Self {
        self.utc_offset_secs = secs;
        self
    }

    /// Enable/disable bar validation before each run
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.validate_data = enable;
        self
    }

    pub fn signal_generator(mut self, signals: SignalGenerator) -> Self {
        self.signals = signals;
        self
    }

    pub fn backtester(mut self, backtester: Backtester) -> Self {
        self.backtester = backtester;
        self
    }

    /// Build the analyzer
    pub fn build(self) -> Result<Analyzer> {
        let offset = FixedOffset::east_opt(self.utc_offset_secs).ok_or_else(|| {
            AnalysisError::InvalidConfig(format!(
                "utc offset {}s out of range",
                self.utc_offset_secs
            ))
        })?;

        let analyzer = Analyzer {
            swing: SwingDetector::new(Period::new(self.swing_lookback)?),
            gaps: FvgDetector::default(),
            order_blocks: OrderBlockDetector {
                impulse_multiplier: Multiplier::new(self.impulse_multiplier)?,
                body_window: self.impulse_body_window,
                ..OrderBlockDetector::default()
            },
            signals: self.signals,
            backtester: self.backtester,
            daily: DailyAggregator::with_utc_offset(offset),
            config: AnalyzerConfig {
                interval: self.interval,
                validate_data: self.validate_data,
            },
        };
        analyzer.validate()?;
        Ok(analyzer)
    }
}

// ============================================================
// PARALLEL ANALYSIS
// ============================================================

use rayon::prelude::*;

/// Result of analysing a single instrument
#[derive(Debug)]
pub struct AnalysisResult {
    pub symbol: String,
    pub analysis: Analysis,
}

/// Error from analysing a single instrument
#[derive(Debug)]
pub struct AnalysisFailure {
    pub symbol: String,
    pub error: AnalysisError,
}

/// Parallel analysis of multiple instruments
pub fn analyze_parallel<'a, T, I>(
    analyzer: &Analyzer,
    instruments: I,
) -> (Vec<AnalysisResult>, Vec<AnalysisFailure>)
where
    T: OHLC + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            analyzer
                .run(bars)
                .map(|analysis| AnalysisResult {
                    symbol: symbol.to_string(),
                    analysis,
                })
                .map_err(|error| AnalysisFailure {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================
