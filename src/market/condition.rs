//! Market condition types

use serde::{Deserialize, Serialize};

/// Discrete market regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketCondition {
    StrongUptrend,
    Uptrend,
    Range,
    Downtrend,
    StrongDowntrend,
    HighVolatility,
}

impl MarketCondition {
    /// Whether this regime trends upward
    pub fn is_bullish(&self) -> bool {
        matches!(self, MarketCondition::StrongUptrend | MarketCondition::Uptrend)
    }

    /// Whether this regime trends downward
    pub fn is_bearish(&self) -> bool {
        matches!(
            self,
            MarketCondition::StrongDowntrend | MarketCondition::Downtrend
        )
    }
}

/// Classifier output for one evaluation cycle; transient, recomputed fresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionReport {
    /// Classified regime
    pub condition: MarketCondition,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Human-readable explanation of the vote
    pub reasoning: String,
}
