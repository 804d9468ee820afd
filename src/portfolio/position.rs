//! Position tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Position side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    /// Long position
    Long,
    /// Short position
    Short,
}

impl PositionSide {
    /// +1 for long, -1 for short
    pub fn multiplier(&self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }
}

/// Exchange position mirrored locally.
///
/// Owned exclusively by the controlling bot loop while running; external
/// readers only ever see cloned snapshots. `updated_at` orders refreshes so
/// a stale snapshot never overwrites a newer one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Symbol (e.g. "XRP/KRW")
    pub symbol: String,
    /// Position side
    pub side: PositionSide,
    /// Average entry price
    pub entry_price: f64,
    /// Latest mark price
    pub mark_price: f64,
    /// Position size in base units
    pub size: f64,
    /// Leverage in effect
    pub leverage: f64,
    /// Take-profit price, if attached
    pub take_profit: Option<f64>,
    /// Stop-loss price, if attached (ratcheted by the trailing stop)
    pub stop_loss: Option<f64>,
    /// Unrealized PnL in quote currency
    pub unrealized_pnl: f64,
    /// When this snapshot was produced
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// Open a new position at `entry_price`
    pub fn open(
        symbol: String,
        side: PositionSide,
        entry_price: f64,
        size: f64,
        leverage: f64,
    ) -> Self {
        Self {
            symbol,
            side,
            entry_price,
            mark_price: entry_price,
            size,
            leverage,
            take_profit: None,
            stop_loss: None,
            unrealized_pnl: 0.0,
            updated_at: Utc::now(),
        }
    }

    /// Update mark price and recompute PnL
    pub fn update_mark_price(&mut self, price: f64) {
        self.mark_price = price;
        self.unrealized_pnl =
            (price - self.entry_price) * self.size * self.side.multiplier();
        self.updated_at = Utc::now();
    }

    /// Price move from entry as a percentage (signed toward profit)
    pub fn price_move_percent(&self) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        ((self.mark_price - self.entry_price) / self.entry_price)
            * 100.0
            * self.side.multiplier()
    }

    /// Return on equity percent (price move × leverage)
    pub fn roe_percent(&self) -> f64 {
        self.price_move_percent() * self.leverage
    }

    /// Check if the take-profit price has been reached
    pub fn is_take_profit_hit(&self) -> bool {
        match (self.take_profit, self.side) {
            (Some(tp), PositionSide::Long) => self.mark_price >= tp,
            (Some(tp), PositionSide::Short) => self.mark_price <= tp,
            (None, _) => false,
        }
    }

    /// Check if the stop-loss price has been reached
    pub fn is_stop_loss_hit(&self) -> bool {
        match (self.stop_loss, self.side) {
            (Some(sl), PositionSide::Long) => self.mark_price <= sl,
            (Some(sl), PositionSide::Short) => self.mark_price >= sl,
            (None, _) => false,
        }
    }

    /// Ratchet the stop toward `candidate`, never loosening it.
    ///
    /// For longs the stop only ever moves up; for shorts only ever down.
    pub fn tighten_stop(&mut self, candidate: f64) {
        let tightened = match (self.stop_loss, self.side) {
            (Some(current), PositionSide::Long) => candidate.max(current),
            (Some(current), PositionSide::Short) => candidate.min(current),
            (None, _) => candidate,
        };
        self.stop_loss = Some(tightened);
    }

    /// Position notional at the current mark price
    pub fn notional(&self) -> f64 {
        self.mark_price * self.size
    }
}
