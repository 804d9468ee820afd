//! OHLCV candle data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV candle data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Candle open timestamp
    pub timestamp: DateTime<Utc>,
    /// Opening price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Volume
    pub volume: f64,
}

impl Candle {
    /// Create a new candle
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Check if candle closed above its open
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Check if candle closed below its open
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Total range (high - low)
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Body size (absolute open-to-close move)
    pub fn body_size(&self) -> f64 {
        (self.close - self.open).abs()
    }
}

/// Extract close prices from a candle slice
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Extract volumes from a candle slice
pub fn volumes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.volume).collect()
}
