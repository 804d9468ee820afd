//! Market condition classifier
//!
//! Derives a discrete regime and confidence from indicator snapshots across
//! one or more timeframes. All tie-breaks are deterministic: an exactly
//! split vote is `Range` with confidence 0.5, and a band-width blowout on
//! any timeframe overrides the trend vote entirely.

use tracing::debug;

use crate::config::ClassifierConfig;
use crate::error::BotError;
use crate::indicators::IndicatorSet;
use crate::market::{ConditionReport, MarketCondition};

/// Per-timeframe trend vote
#[derive(Debug, Clone, Copy)]
struct TimeframeVote {
    /// +1 up, -1 down, 0 neutral — from the EMA stack ordering
    direction: i32,
    /// Full ema9 > ema21 > ema50 > ema200 (or exact reverse) alignment
    perfect: bool,
    /// RSI midline agrees with the direction
    reinforced: bool,
    rsi: f64,
}

/// Market condition classifier
#[derive(Debug, Clone, Default)]
pub struct MarketClassifier {
    config: ClassifierConfig,
}

impl MarketClassifier {
    /// Create classifier with the given thresholds
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classify the market from indicator snapshots, one per timeframe.
    ///
    /// Returns `DataUnavailable` when no timeframe carries the full EMA
    /// stack plus RSI; partial availability classifies over the timeframes
    /// that do.
    pub fn classify(&self, sets: &[IndicatorSet]) -> Result<ConditionReport, BotError> {
        // Volatility override checked first, against every timeframe with bands
        for set in sets {
            if let Some(width) = set.band_width_ratio() {
                if width > self.config.volatility_band_width {
                    let confidence = width.clamp(0.0, 1.0);
                    return Ok(ConditionReport {
                        condition: MarketCondition::HighVolatility,
                        confidence,
                        reasoning: format!(
                            "band width {:.1}% exceeds {:.1}% volatility threshold",
                            width * 100.0,
                            self.config.volatility_band_width * 100.0
                        ),
                    });
                }
            }
        }

        let votes: Vec<TimeframeVote> = sets.iter().filter_map(Self::vote).collect();
        if votes.is_empty() {
            return Err(BotError::DataUnavailable(
                "no timeframe has the full EMA stack and RSI".to_string(),
            ));
        }

        let total = votes.len();
        let ups = votes.iter().filter(|v| v.direction > 0).count();
        let downs = votes.iter().filter(|v| v.direction < 0).count();
        let avg_rsi = votes.iter().map(|v| v.rsi).sum::<f64>() / total as f64;

        debug!(ups, downs, total, avg_rsi, "classifier vote");

        // Exactly split (including all-neutral) is a range market
        if ups == downs {
            return Ok(ConditionReport {
                condition: MarketCondition::Range,
                confidence: 0.5,
                reasoning: format!(
                    "trend vote split {}/{} across {} timeframe(s), RSI avg {:.1}",
                    ups, downs, total, avg_rsi
                ),
            });
        }

        let bullish = ups > downs;
        let agreeing = ups.max(downs);
        let rsi_scale = (votes.iter().map(|v| (v.rsi - 50.0).abs()).sum::<f64>()
            / total as f64
            / 25.0)
            .clamp(0.0, 1.0);
        let confidence = ((agreeing as f64 / total as f64) * rsi_scale).clamp(0.0, 1.0);

        let fully_aligned = votes.iter().all(|v| {
            v.perfect && v.reinforced && (v.direction > 0) == bullish && v.direction != 0
        });
        let strong = fully_aligned && confidence >= self.config.strong_trend_confidence;

        let condition = match (bullish, strong) {
            (true, true) => MarketCondition::StrongUptrend,
            (true, false) => MarketCondition::Uptrend,
            (false, true) => MarketCondition::StrongDowntrend,
            (false, false) => MarketCondition::Downtrend,
        };

        Ok(ConditionReport {
            condition,
            confidence,
            reasoning: format!(
                "{}/{} timeframe(s) vote {} on EMA ordering, RSI avg {:.1}",
                agreeing,
                total,
                if bullish { "up" } else { "down" },
                avg_rsi
            ),
        })
    }

    /// Single-timeframe vote. RSI only reinforces a direction the EMA stack
    /// already shows; it never creates one (so the flat-series RSI=100 edge
    /// case stays neutral).
    fn vote(set: &IndicatorSet) -> Option<TimeframeVote> {
        let (ema9, ema21, ema50, ema200) =
            (set.ema9?, set.ema21?, set.ema50?, set.ema200?);
        let rsi = set.rsi14?;

        let pairs = [(ema9, ema21), (ema21, ema50), (ema50, ema200)];
        let up_pairs = pairs.iter().filter(|(a, b)| a > b).count();
        let down_pairs = pairs.iter().filter(|(a, b)| a < b).count();

        let direction = if up_pairs >= 2 && up_pairs > down_pairs {
            1
        } else if down_pairs >= 2 && down_pairs > up_pairs {
            -1
        } else {
            0
        };
        let perfect = up_pairs == 3 || down_pairs == 3;
        let reinforced = match direction {
            1 => rsi > 55.0,
            -1 => rsi < 45.0,
            _ => false,
        };

        Some(TimeframeVote {
            direction,
            perfect,
            reinforced,
            rsi,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(
        rsi: f64,
        emas: (f64, f64, f64, f64),
        bands: (f64, f64, f64),
    ) -> IndicatorSet {
        IndicatorSet {
            rsi14: Some(rsi),
            ema9: Some(emas.0),
            ema21: Some(emas.1),
            ema50: Some(emas.2),
            ema200: Some(emas.3),
            bb_upper: Some(bands.0),
            bb_middle: Some(bands.1),
            bb_lower: Some(bands.2),
            volume_ratio: Some(1.0),
            computed_at: 249,
        }
    }

    #[test]
    fn test_aligned_uptrend() {
        let classifier = MarketClassifier::default();
        // ema9 > ema21 > ema50 > ema200 on both timeframes, RSI 65
        let set = snapshot(65.0, (108.0, 106.0, 103.0, 100.0), (110.0, 105.0, 100.0));
        let report = classifier.classify(&[set.clone(), set]).unwrap();

        assert!(matches!(
            report.condition,
            MarketCondition::Uptrend | MarketCondition::StrongUptrend
        ));
        assert!(report.confidence >= 0.6, "confidence {}", report.confidence);
    }

    #[test]
    fn test_strong_downtrend() {
        let classifier = MarketClassifier::default();
        // Perfect bearish stack with deeply bearish RSI on every timeframe
        let set = snapshot(22.0, (95.0, 97.0, 99.0, 103.0), (100.0, 97.0, 94.0));
        let report = classifier.classify(&[set.clone(), set]).unwrap();

        assert_eq!(report.condition, MarketCondition::StrongDowntrend);
        assert!(report.confidence >= 0.75);
    }

    #[test]
    fn test_flat_series_is_range() {
        let classifier = MarketClassifier::default();
        // Degenerate flat market: EMAs equal, bands collapsed, RSI pinned at 100
        let set = snapshot(100.0, (500.0, 500.0, 500.0, 500.0), (500.0, 500.0, 500.0));
        let report = classifier.classify(&[set]).unwrap();

        assert_eq!(report.condition, MarketCondition::Range);
        assert_eq!(report.confidence, 0.5);
    }

    #[test]
    fn test_split_vote_is_range() {
        let classifier = MarketClassifier::default();
        let up = snapshot(60.0, (108.0, 106.0, 103.0, 100.0), (110.0, 105.0, 100.0));
        let down = snapshot(40.0, (95.0, 97.0, 99.0, 103.0), (100.0, 97.0, 94.0));
        let report = classifier.classify(&[up, down]).unwrap();

        assert_eq!(report.condition, MarketCondition::Range);
        assert_eq!(report.confidence, 0.5);
    }

    #[test]
    fn test_volatility_override() {
        let classifier = MarketClassifier::default();
        // Uptrend stack, but band width 15% of middle
        let set = snapshot(65.0, (108.0, 106.0, 103.0, 100.0), (107.5, 100.0, 92.5));
        let report = classifier.classify(&[set]).unwrap();

        assert_eq!(report.condition, MarketCondition::HighVolatility);
        assert!((report.confidence - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_unavailable_indicators_error() {
        let classifier = MarketClassifier::default();
        let mut set = snapshot(60.0, (108.0, 106.0, 103.0, 100.0), (110.0, 105.0, 100.0));
        set.ema200 = None;
        // Width check needs bands, trend vote needs the full stack
        set.bb_upper = None;
        set.bb_lower = None;

        assert!(matches!(
            classifier.classify(&[set]),
            Err(BotError::DataUnavailable(_))
        ));
    }
}
