//! Confluence-based signal generator
//!
//! Applies the entry rules across the configured timeframes (fastest first):
//! a long requires oversold RSI on enough timeframes, price near the lower
//! Bollinger band on at least one, and a bullish EMA9/EMA21 cross on the
//! fastest timeframe; a short is the exact mirror. Borderline or incomplete
//! input always resolves to no-signal — this component fails closed.

use tracing::debug;

use crate::config::SignalConfig;
use crate::indicators::IndicatorSet;
use crate::strategy::Signal;

/// Confluence conditions counted per direction
const CONFLUENCE_CONDITIONS: f64 = 3.0;

/// Multi-timeframe signal generator
#[derive(Debug, Clone, Default)]
pub struct SignalGenerator {
    config: SignalConfig,
}

impl SignalGenerator {
    /// Create generator with the given thresholds
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    /// Generator configuration
    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Generate a signal from per-timeframe snapshots (fastest first) and
    /// the current price.
    pub fn generate(&self, sets: &[IndicatorSet], price: f64) -> Signal {
        let generated_at = sets.first().map_or(0, |s| s.computed_at);
        if sets.is_empty() {
            return Signal::none("no timeframe snapshots".to_string(), generated_at);
        }

        // Fail closed: every evaluated timeframe must carry RSI and bands,
        // and the fastest must carry the EMA cross pair.
        for (i, set) in sets.iter().enumerate() {
            if set.rsi14.is_none() || set.bb_upper.is_none() || set.bb_lower.is_none() {
                return Signal::none(
                    format!("indicators unavailable on timeframe {}", i),
                    generated_at,
                );
            }
        }
        let fastest = &sets[0];
        let (ema9, ema21) = match (fastest.ema9, fastest.ema21) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Signal::none(
                    "EMA9/EMA21 unavailable on fastest timeframe".to_string(),
                    generated_at,
                )
            }
        };

        if let Some(signal) = self.evaluate_long(sets, price, ema9, ema21, generated_at) {
            return signal;
        }
        if let Some(signal) = self.evaluate_short(sets, price, ema9, ema21, generated_at) {
            return signal;
        }

        Signal::none(
            format!(
                "confluence not met (RSI {:.1} on fastest, price {:.4})",
                fastest.rsi14.unwrap_or(50.0),
                price
            ),
            generated_at,
        )
    }

    fn evaluate_long(
        &self,
        sets: &[IndicatorSet],
        price: f64,
        ema9: f64,
        ema21: f64,
        generated_at: usize,
    ) -> Option<Signal> {
        let oversold = self.config.rsi_oversold;
        let rsi_hits: Vec<f64> = sets
            .iter()
            .filter_map(|s| s.rsi14)
            .filter(|rsi| *rsi < oversold)
            .collect();
        let proximity = 1.0 + self.config.band_proximity_percent / 100.0;
        let band_hit = sets
            .iter()
            .filter_map(|s| s.bb_lower)
            .any(|lower| price <= lower * proximity);
        let ema_ok = ema9 > ema21;

        if rsi_hits.len() < self.config.min_rsi_timeframes || !band_hit || !ema_ok {
            return None;
        }

        // Strongest (lowest) RSI drives the strength scale
        let best_rsi = rsi_hits.iter().cloned().fold(f64::INFINITY, f64::min);
        let strength = ((oversold - best_rsi) / oversold).clamp(0.0, 1.0);
        let confidence = self.confidence(sets, rsi_hits.len(), strength);

        debug!(rsi_hits = rsi_hits.len(), best_rsi, confidence, "long confluence met");
        Some(Signal::long(
            confidence,
            format!(
                "RSI oversold on {}/{} timeframe(s) (min {:.1}), price at lower band, EMA9 > EMA21",
                rsi_hits.len(),
                sets.len(),
                best_rsi
            ),
            generated_at,
        ))
    }

    fn evaluate_short(
        &self,
        sets: &[IndicatorSet],
        price: f64,
        ema9: f64,
        ema21: f64,
        generated_at: usize,
    ) -> Option<Signal> {
        let overbought = self.config.rsi_overbought;
        let rsi_hits: Vec<f64> = sets
            .iter()
            .filter_map(|s| s.rsi14)
            .filter(|rsi| *rsi > overbought)
            .collect();
        let proximity = 1.0 - self.config.band_proximity_percent / 100.0;
        let band_hit = sets
            .iter()
            .filter_map(|s| s.bb_upper)
            .any(|upper| price >= upper * proximity);
        let ema_ok = ema9 < ema21;

        if rsi_hits.len() < self.config.min_rsi_timeframes || !band_hit || !ema_ok {
            return None;
        }

        let best_rsi = rsi_hits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let strength = ((best_rsi - overbought) / (100.0 - overbought)).clamp(0.0, 1.0);
        let confidence = self.confidence(sets, rsi_hits.len(), strength);

        debug!(rsi_hits = rsi_hits.len(), best_rsi, confidence, "short confluence met");
        Some(Signal::short(
            confidence,
            format!(
                "RSI overbought on {}/{} timeframe(s) (max {:.1}), price at upper band, EMA9 < EMA21",
                rsi_hits.len(),
                sets.len(),
                best_rsi
            ),
            generated_at,
        ))
    }

    /// Confidence = condition fraction × RSI strength scale, plus a small
    /// volume-confirmation bonus (never a hard gate).
    fn confidence(&self, sets: &[IndicatorSet], rsi_hits: usize, strength: f64) -> f64 {
        let fraction =
            (rsi_hits as f64 / sets.len() as f64 + 2.0) / CONFLUENCE_CONDITIONS;
        let scale = 0.5 + 0.5 * strength;
        let volume_bonus = sets[0]
            .volume_ratio
            .filter(|r| *r >= self.config.volume_confirmation_ratio)
            .map_or(0.0, |_| 0.05);
        (fraction * scale + volume_bonus).clamp(0.0, 1.0)
    }
}
