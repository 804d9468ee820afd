//! Technical indicators module
//!
//! Incremental indicators plus the [`IndicatorSet`] snapshot consumed by the
//! market classifier and signal generator. All indicators are pure functions
//! of the candle history they were fed; recomputing over the same series
//! always yields the same values.

pub mod bb;
pub mod ema;
pub mod rsi;
pub mod sma;

pub use bb::*;
pub use ema::*;
pub use rsi::*;
pub use sma::*;

use serde::{Deserialize, Serialize};

use crate::data::Candle;

/// Volume moving-average window for the volume-ratio confirmation
pub const VOLUME_MA_PERIOD: usize = 5;

/// Indicator trait for all indicators
pub trait Indicator {
    /// Get the name of the indicator
    fn name(&self) -> &str;

    /// Update indicator with new value
    fn update(&mut self, value: f64);

    /// Get current indicator value
    fn value(&self) -> Option<f64>;

    /// Check if indicator is ready (has enough data)
    fn is_ready(&self) -> bool;
}

/// One evaluation cycle's indicator snapshot for a single timeframe.
///
/// Each field is `None` ("unavailable") when the series is shorter than that
/// indicator's minimum window — never a value extrapolated from fewer points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    /// RSI(14), Wilder smoothing
    pub rsi14: Option<f64>,
    /// EMA(9)
    pub ema9: Option<f64>,
    /// EMA(21)
    pub ema21: Option<f64>,
    /// EMA(50)
    pub ema50: Option<f64>,
    /// EMA(200) — the longest lookback in the set
    pub ema200: Option<f64>,
    /// Bollinger upper band (20, 2σ)
    pub bb_upper: Option<f64>,
    /// Bollinger middle band (SMA 20)
    pub bb_middle: Option<f64>,
    /// Bollinger lower band (20, 2σ)
    pub bb_lower: Option<f64>,
    /// Current volume / volume MA(5)
    pub volume_ratio: Option<f64>,
    /// Index of the candle this snapshot was computed for
    pub computed_at: usize,
}

impl IndicatorSet {
    /// Compute the full snapshot for the last candle of `candles`.
    ///
    /// Returns `None` only for an empty series; a short series yields a
    /// snapshot with unavailable fields instead.
    pub fn compute(candles: &[Candle]) -> Option<Self> {
        if candles.is_empty() {
            return None;
        }

        let mut rsi = Rsi::new(14);
        let mut ema9 = Ema::new(9);
        let mut ema21 = Ema::new(21);
        let mut ema50 = Ema::new(50);
        let mut ema200 = Ema::new(200);
        let mut bb = BollingerBands::new(20, 2.0);
        let mut volume_ma = Sma::new(VOLUME_MA_PERIOD);

        for candle in candles {
            rsi.update(candle.close);
            ema9.update(candle.close);
            ema21.update(candle.close);
            ema50.update(candle.close);
            ema200.update(candle.close);
            bb.update(candle.close);
            volume_ma.update(candle.volume);
        }

        let last = candles.last()?;
        let volume_ratio = volume_ma
            .value()
            .filter(|ma| *ma > 0.0)
            .map(|ma| last.volume / ma);

        Some(Self {
            rsi14: rsi.value(),
            ema9: ema9.value(),
            ema21: ema21.value(),
            ema50: ema50.value(),
            ema200: ema200.value(),
            bb_upper: bb.upper(),
            bb_middle: bb.middle(),
            bb_lower: bb.lower(),
            volume_ratio,
            computed_at: candles.len() - 1,
        })
    }

    /// Whether every indicator in the set is available
    pub fn is_complete(&self) -> bool {
        self.rsi14.is_some()
            && self.ema9.is_some()
            && self.ema21.is_some()
            && self.ema50.is_some()
            && self.ema200.is_some()
            && self.bb_upper.is_some()
    }

    /// Bollinger band width ratio ((upper - lower) / middle)
    pub fn band_width_ratio(&self) -> Option<f64> {
        let upper = self.bb_upper?;
        let lower = self.bb_lower?;
        let middle = self.bb_middle?;
        if middle.abs() < f64::EPSILON {
            return None;
        }
        Some((upper - lower) / middle)
    }
}
