//! EMA (Exponential Moving Average) indicator
//!
//! Seeded with the simple moving average of the first `period` closes, then
//! `ema = close * k + prev * (1 - k)` with `k = 2 / (period + 1)`.

use crate::indicators::Indicator;

/// EMA indicator
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    seen: usize,
    seed_sum: f64,
    current: Option<f64>,
}

impl Ema {
    /// Create new EMA indicator
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "EMA period must be positive");
        Self {
            period,
            seen: 0,
            seed_sum: 0.0,
            current: None,
        }
    }

    /// Get EMA period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Smoothing factor k = 2 / (period + 1)
    pub fn multiplier(&self) -> f64 {
        2.0 / (self.period as f64 + 1.0)
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        "EMA"
    }

    fn update(&mut self, value: f64) {
        self.seen += 1;
        match self.current {
            Some(prev) => {
                let k = self.multiplier();
                self.current = Some(value * k + prev * (1.0 - k));
            }
            None => {
                self.seed_sum += value;
                if self.seen == self.period {
                    self.current = Some(self.seed_sum / self.period as f64);
                }
            }
        }
    }

    fn value(&self) -> Option<f64> {
        self.current
    }

    fn is_ready(&self) -> bool {
        self.current.is_some()
    }
}

/// Calculate EMA over a series, one output per input
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut ema = Ema::new(period);
    values
        .iter()
        .map(|&value| {
            ema.update(value);
            ema.value()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_with_sma() {
        let mut ema = Ema::new(4);
        for value in [10.0, 20.0, 30.0, 40.0] {
            ema.update(value);
        }
        assert_eq!(ema.value().unwrap(), 25.0);
    }

    #[test]
    fn test_not_ready_before_seed() {
        let mut ema = Ema::new(10);
        for i in 0..9 {
            ema.update(100.0 + i as f64);
        }
        assert!(!ema.is_ready());
        assert!(ema.value().is_none());
    }

    #[test]
    fn test_constant_series_convergence() {
        // For a constant-price series EMA equals that price exactly
        for period in [9usize, 21, 50] {
            let values = vec![123.45; period * 5];
            let result = calculate_ema(&values, period);
            let last = result.last().unwrap().unwrap();
            assert!((last - 123.45).abs() < 1e-9, "period {}: {}", period, last);
        }
    }
}
