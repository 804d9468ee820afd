//! Strategy selection
//!
//! Pure mapping from market condition and confidence to concrete risk
//! parameters. The match below is the single source of truth and is
//! exhaustive over every `MarketCondition` variant — no default arm.
//! Percent tiers follow the original gradual-entry table (TP 1.5/SL 3 for
//! confirmed trends down to TP 1.2/SL 2.5 for sideways markets).

use serde::{Deserialize, Serialize};

use crate::market::MarketCondition;

/// Risk parameters selected for one evaluation cycle; never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingStrategy {
    /// Take-profit distance as percent of entry price
    pub take_profit_percent: f64,
    /// Stop-loss distance as percent of entry price
    pub stop_loss_percent: f64,
    /// Take-profit as return on equity (percent × leverage)
    pub take_profit_roe: f64,
    /// Stop-loss as return on equity (percent × leverage)
    pub stop_loss_roe: f64,
    /// Leverage to request for new positions
    pub recommended_leverage: f64,
    /// Whether the trailing stop is active for this regime
    pub use_trailing_stop: bool,
    /// ROE percent at which the trailing stop arms
    pub trailing_stop_trigger_percent: f64,
    /// Human-readable summary
    pub description: String,
}

/// Confidence at which a plain trend gets its full (non-conservative) tier
const TREND_CONFIDENCE_FLOOR: f64 = 0.6;

/// Select the strategy for a classified market condition.
///
/// `max_leverage` caps every recommendation; high-volatility regimes always
/// get the most conservative tier with the trailing stop disabled so noise
/// cannot trigger it prematurely.
pub fn select_strategy(
    condition: MarketCondition,
    confidence: f64,
    max_leverage: f64,
) -> TradingStrategy {
    let (tp, sl, leverage, trailing, trigger, description) = match condition {
        MarketCondition::StrongUptrend | MarketCondition::StrongDowntrend => (
            1.5,
            3.0,
            10.0,
            true,
            2.0,
            "strong trend: tight TP, wide SL, trailing armed early",
        ),
        MarketCondition::Uptrend | MarketCondition::Downtrend => {
            if confidence >= TREND_CONFIDENCE_FLOOR {
                (
                    2.0,
                    4.0,
                    5.0,
                    true,
                    2.5,
                    "trend: moderate TP/SL with trailing stop",
                )
            } else {
                (
                    1.2,
                    2.5,
                    3.0,
                    true,
                    1.5,
                    "weak trend: conservative TP/SL, reduced leverage",
                )
            }
        }
        MarketCondition::Range => (
            1.2,
            2.5,
            3.0,
            true,
            1.5,
            "range: mean-reversion scalp, conservative TP/SL",
        ),
        MarketCondition::HighVolatility => (
            1.0,
            2.0,
            2.0,
            false,
            0.0,
            "high volatility: minimum leverage, trailing stop disabled",
        ),
    };

    let leverage = f64::min(leverage, max_leverage).max(1.0);
    TradingStrategy {
        take_profit_percent: tp,
        stop_loss_percent: sl,
        take_profit_roe: tp * leverage,
        stop_loss_roe: sl * leverage,
        recommended_leverage: leverage,
        use_trailing_stop: trailing,
        trailing_stop_trigger_percent: trigger,
        description: description.to_string(),
    }
}
