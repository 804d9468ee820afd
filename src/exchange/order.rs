//! Order management

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    /// Market order
    Market,
    /// Limit order
    Limit,
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    /// Buy
    Buy,
    /// Sell
    Sell,
}

/// Order status lifecycle:
/// `Placed → PartiallyFilled → Filled | Cancelled | Rejected`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Accepted by the exchange, not yet filled
    Placed,
    /// Partially filled
    PartiallyFilled,
    /// Fully filled (terminal)
    Filled,
    /// Cancelled (terminal)
    Cancelled,
    /// Rejected by the exchange (terminal)
    Rejected,
}

impl OrderStatus {
    /// Whether the order can still transition
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

/// Placement request sent to the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Symbol
    pub symbol: String,
    /// Order side
    pub side: OrderSide,
    /// Order type
    pub kind: OrderKind,
    /// Quantity in base units
    pub quantity: f64,
    /// Limit price (None for market orders)
    pub price: Option<f64>,
    /// Whether this order reduces an existing position
    pub reduce_only: bool,
}

impl OrderRequest {
    /// Market order request
    pub fn market(symbol: &str, side: OrderSide, quantity: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            kind: OrderKind::Market,
            quantity,
            price: None,
            reduce_only: false,
        }
    }

    /// Limit order request
    pub fn limit(symbol: &str, side: OrderSide, quantity: f64, price: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            kind: OrderKind::Limit,
            quantity,
            price: Some(price),
            reduce_only: false,
        }
    }

    /// Mark as position-reducing (close order)
    pub fn reduce_only(mut self) -> Self {
        self.reduce_only = true;
        self
    }
}

/// Order as tracked by the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Gateway-assigned order id
    pub id: String,
    /// Symbol
    pub symbol: String,
    /// Order side
    pub side: OrderSide,
    /// Order type
    pub kind: OrderKind,
    /// Requested quantity
    pub quantity: f64,
    /// Limit price, if any
    pub price: Option<f64>,
    /// Filled quantity so far
    pub filled_quantity: f64,
    /// Average fill price, once known
    pub avg_fill_price: Option<f64>,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Created time
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Check if order is fully filled
    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }

    /// Check if order is still working
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminality() {
        assert!(!OrderStatus::Placed.is_terminal());
        assert!(!OrderStatus::PartiallyFilled.is_terminal());
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_reduce_only_builder() {
        let request = OrderRequest::market("XRP/KRW", OrderSide::Sell, 10.0).reduce_only();
        assert!(request.reduce_only);
        assert_eq!(request.kind, OrderKind::Market);
        assert!(request.price.is_none());
    }
}
