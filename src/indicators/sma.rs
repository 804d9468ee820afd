//! SMA (Simple Moving Average) indicator

use std::collections::VecDeque;

use crate::indicators::Indicator;

/// Rolling simple moving average
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
}

impl Sma {
    /// Create new SMA indicator
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "SMA period must be positive");
        Self {
            period,
            window: VecDeque::with_capacity(period),
            sum: 0.0,
        }
    }

    /// Get SMA period
    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        "SMA"
    }

    fn update(&mut self, value: f64) {
        self.window.push_back(value);
        self.sum += value;
        if self.window.len() > self.period {
            if let Some(evicted) = self.window.pop_front() {
                self.sum -= evicted;
            }
        }
    }

    fn value(&self) -> Option<f64> {
        if self.window.len() < self.period {
            return None;
        }
        Some(self.sum / self.period as f64)
    }

    fn is_ready(&self) -> bool {
        self.window.len() >= self.period
    }
}

/// Calculate SMA over a series, one output per input
pub fn calculate_sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut sma = Sma::new(period);
    values
        .iter()
        .map(|&value| {
            sma.update(value);
            sma.value()
        })
        .collect()
}
