//! RSI (Relative Strength Index) indicator
//!
//! Wilder's smoothing: the first average gain/loss is a simple mean over the
//! initial `period` price changes; every later average is smoothed
//! recursively as `(prev * (period - 1) + current) / period`. When the
//! average loss is zero the RSI is pinned at 100.

use crate::indicators::Indicator;

/// RSI indicator with Wilder smoothing
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev_close: Option<f64>,
    changes_seen: usize,
    gain_sum: f64,
    loss_sum: f64,
    avg_gain: Option<f64>,
    avg_loss: Option<f64>,
}

impl Rsi {
    /// Create new RSI indicator
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "RSI period must be positive");
        Self {
            period,
            prev_close: None,
            changes_seen: 0,
            gain_sum: 0.0,
            loss_sum: 0.0,
            avg_gain: None,
            avg_loss: None,
        }
    }

    /// Get RSI period
    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        "RSI"
    }

    fn update(&mut self, value: f64) {
        if let Some(prev) = self.prev_close {
            let change = value - prev;
            let gain = change.max(0.0);
            let loss = (-change).max(0.0);
            self.changes_seen += 1;

            let n = self.period as f64;
            match (self.avg_gain, self.avg_loss) {
                (Some(avg_gain), Some(avg_loss)) => {
                    self.avg_gain = Some((avg_gain * (n - 1.0) + gain) / n);
                    self.avg_loss = Some((avg_loss * (n - 1.0) + loss) / n);
                }
                _ => {
                    self.gain_sum += gain;
                    self.loss_sum += loss;
                    if self.changes_seen == self.period {
                        self.avg_gain = Some(self.gain_sum / n);
                        self.avg_loss = Some(self.loss_sum / n);
                    }
                }
            }
        }
        self.prev_close = Some(value);
    }

    fn value(&self) -> Option<f64> {
        let avg_gain = self.avg_gain?;
        let avg_loss = self.avg_loss?;
        if avg_loss == 0.0 {
            return Some(100.0);
        }
        let rs = avg_gain / avg_loss;
        Some(100.0 - 100.0 / (1.0 + rs))
    }

    fn is_ready(&self) -> bool {
        // Needs period+1 closes: period changes plus the first reference close
        self.avg_gain.is_some()
    }
}

/// Calculate RSI over a close-price series, one output per input
pub fn calculate_rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut rsi = Rsi::new(period);
    values
        .iter()
        .map(|&value| {
            rsi.update(value);
            rsi.value()
        })
        .collect()
}
