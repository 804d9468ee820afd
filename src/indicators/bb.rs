//! Bollinger Bands indicator
//!
//! Middle band = SMA(period) of closes; upper/lower = middle ± std_dev · σ.
//! σ is the **population** standard deviation (divide by N); the sample
//! convention would widen the bands by a few percent and shift every
//! band-proximity threshold with it.

use std::collections::VecDeque;

use crate::indicators::Indicator;

/// Bollinger Bands output for one candle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerOutput {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Bollinger Bands indicator
#[derive(Debug, Clone)]
pub struct BollingerBands {
    period: usize,
    std_dev: f64,
    window: VecDeque<f64>,
}

impl BollingerBands {
    /// Create new Bollinger Bands indicator
    pub fn new(period: usize, std_dev: f64) -> Self {
        assert!(period > 1, "Bollinger period must exceed 1");
        Self {
            period,
            std_dev,
            window: VecDeque::with_capacity(period),
        }
    }

    /// Full band output, when ready
    pub fn output(&self) -> Option<BollingerOutput> {
        if self.window.len() < self.period {
            return None;
        }
        let n = self.period as f64;
        let middle = self.window.iter().sum::<f64>() / n;
        let variance = self
            .window
            .iter()
            .map(|value| (value - middle).powi(2))
            .sum::<f64>()
            / n;
        let offset = self.std_dev * variance.sqrt();
        Some(BollingerOutput {
            upper: middle + offset,
            middle,
            lower: middle - offset,
        })
    }

    /// Get upper band
    pub fn upper(&self) -> Option<f64> {
        self.output().map(|o| o.upper)
    }

    /// Get middle band (SMA)
    pub fn middle(&self) -> Option<f64> {
        self.output().map(|o| o.middle)
    }

    /// Get lower band
    pub fn lower(&self) -> Option<f64> {
        self.output().map(|o| o.lower)
    }
}

impl Indicator for BollingerBands {
    fn name(&self) -> &str {
        "BollingerBands"
    }

    fn update(&mut self, value: f64) {
        self.window.push_back(value);
        if self.window.len() > self.period {
            self.window.pop_front();
        }
    }

    fn value(&self) -> Option<f64> {
        self.middle()
    }

    fn is_ready(&self) -> bool {
        self.window.len() >= self.period
    }
}
