//! Account balance snapshot

use serde::{Deserialize, Serialize};

/// Account balance as reported by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// Free margin available for new positions
    pub available: f64,
    /// Margin locked in open positions
    pub position_margin: f64,
    /// Unrealized PnL across open positions
    pub unrealized_pnl: f64,
    /// Total account equity
    pub total_equity: f64,
}

impl AccountBalance {
    /// Create a flat balance with everything available
    pub fn new(total: f64) -> Self {
        Self {
            available: total,
            position_margin: 0.0,
            unrealized_pnl: 0.0,
            total_equity: total,
        }
    }

    /// Check whether `margin` can be committed
    pub fn can_afford(&self, margin: f64) -> bool {
        self.available >= margin
    }
}
