//! Signal generation and market classification configuration

use serde::{Deserialize, Serialize};

/// Signal generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Timeframes evaluated for confluence, fastest first (e.g. "5m", "30m")
    pub timeframes: Vec<String>,
    /// RSI oversold threshold (long side)
    pub rsi_oversold: f64,
    /// RSI overbought threshold (short side)
    pub rsi_overbought: f64,
    /// Minimum timeframes whose RSI must confirm the direction
    pub min_rsi_timeframes: usize,
    /// Price must be within this percent of the outer Bollinger band
    pub band_proximity_percent: f64,
    /// Volume ratio (current / MA5) that counts as confirmation
    pub volume_confirmation_ratio: f64,
    /// Minimum confidence for a signal to be actionable
    pub min_confidence: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            timeframes: vec!["5m".to_string(), "30m".to_string()],
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            min_rsi_timeframes: 1,
            band_proximity_percent: 0.5,
            volume_confirmation_ratio: 1.1,
            min_confidence: 0.6,
        }
    }
}

impl SignalConfig {
    /// Fastest (entry) timeframe
    pub fn fastest_timeframe(&self) -> &str {
        self.timeframes.first().map(String::as_str).unwrap_or("5m")
    }
}

/// Market condition classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Band width ratio ((upper - lower) / middle) above which the market
    /// is classified as high volatility regardless of trend
    pub volatility_band_width: f64,
    /// Confidence at or above which a fully aligned trend counts as strong
    pub strong_trend_confidence: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            volatility_band_width: 0.10,
            strong_trend_confidence: 0.75,
        }
    }
}
