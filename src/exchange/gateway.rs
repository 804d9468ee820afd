//! Exchange gateway trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::data::Candle;
use crate::error::BotError;
use crate::exchange::{Order, OrderRequest};
use crate::portfolio::{AccountBalance, Position};

/// Real-time price update pushed by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    /// Symbol
    pub symbol: String,
    /// Last traded price
    pub price: f64,
    /// Traded volume carried by this tick, if reported
    pub volume: Option<f64>,
    /// Exchange timestamp
    pub timestamp: DateTime<Utc>,
}

/// Boundary between the trading core and any concrete exchange.
///
/// Implementations translate these calls into venue-specific REST and
/// websocket traffic. Transient failures (timeouts, disconnects, rate
/// limits) map to [`BotError::GatewayTransient`]; a definitive refusal
/// (insufficient margin, bad symbol) maps to [`BotError::GatewayRejected`].
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Fetch recent candles for a symbol and interval, oldest first
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, BotError>;

    /// Submit an order
    async fn place_order(&self, request: OrderRequest) -> Result<Order, BotError>;

    /// Fetch the current state of a previously placed order
    async fn get_order(&self, order_id: &str) -> Result<Order, BotError>;

    /// Cancel a working order. Returns false if it was already terminal.
    async fn cancel_order(&self, order_id: &str) -> Result<bool, BotError>;

    /// Fetch open positions, optionally filtered by symbol
    async fn get_positions(&self, symbol: Option<&str>) -> Result<Vec<Position>, BotError>;

    /// Fetch the account balance
    async fn get_balance(&self) -> Result<AccountBalance, BotError>;

    /// Subscribe to live price ticks for a symbol
    async fn subscribe_ticker(
        &self,
        symbol: &str,
    ) -> Result<mpsc::Receiver<PriceTick>, BotError>;

    /// Subscribe to position updates pushed by the exchange
    async fn subscribe_positions(&self) -> Result<mpsc::Receiver<Position>, BotError>;
}
