//! Controller tests against a scripted gateway

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::{mpsc, Mutex};

use coinscalp_rs::bot::{BotController, BotState, LogSeverity};
use coinscalp_rs::config::{BotConfig, SignalConfig};
use coinscalp_rs::data::Candle;
use coinscalp_rs::error::BotError;
use coinscalp_rs::exchange::{
    ExchangeGateway, Order, OrderRequest, OrderStatus, PriceTick,
};
use coinscalp_rs::portfolio::{AccountBalance, Position, PositionSide};

const SYMBOL: &str = "XRP/KRW";

/// Gateway double: fills everything instantly unless told to reject
struct MockGateway {
    candles: Vec<Candle>,
    reject_orders: bool,
    orders: Mutex<HashMap<String, Order>>,
    positions: Mutex<Vec<Position>>,
    ticker_tx: Mutex<Option<mpsc::Sender<PriceTick>>>,
    position_tx: Mutex<Option<mpsc::Sender<Position>>>,
}

impl MockGateway {
    fn new(candles: Vec<Candle>) -> Self {
        Self {
            candles,
            reject_orders: false,
            orders: Mutex::new(HashMap::new()),
            positions: Mutex::new(Vec::new()),
            ticker_tx: Mutex::new(None),
            position_tx: Mutex::new(None),
        }
    }

    fn rejecting(candles: Vec<Candle>) -> Self {
        Self {
            reject_orders: true,
            ..Self::new(candles)
        }
    }

    async fn push_position(&self, position: Position) {
        if let Some(tx) = self.position_tx.lock().await.as_ref() {
            tx.send(position).await.ok();
        }
    }

    async fn placed_orders(&self) -> Vec<Order> {
        self.orders.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl ExchangeGateway for MockGateway {
    async fn fetch_candles(
        &self,
        _symbol: &str,
        _interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, BotError> {
        let start = self.candles.len().saturating_sub(limit);
        Ok(self.candles[start..].to_vec())
    }

    async fn place_order(&self, request: OrderRequest) -> Result<Order, BotError> {
        if self.reject_orders {
            return Err(BotError::GatewayRejected("insufficient margin".to_string()));
        }
        let fill_price = request
            .price
            .or_else(|| self.candles.last().map(|c| c.close))
            .unwrap_or(0.0);
        let order = Order {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: request.symbol.clone(),
            side: request.side,
            kind: request.kind,
            quantity: request.quantity,
            price: request.price,
            filled_quantity: request.quantity,
            avg_fill_price: Some(fill_price),
            status: OrderStatus::Filled,
            created_at: Utc::now(),
        };
        self.orders
            .lock()
            .await
            .insert(order.id.clone(), order.clone());
        let mut positions = self.positions.lock().await;
        if request.reduce_only {
            positions.retain(|p| p.symbol != request.symbol);
        } else {
            positions.push(Position::open(
                request.symbol,
                match request.side {
                    coinscalp_rs::exchange::OrderSide::Buy => PositionSide::Long,
                    coinscalp_rs::exchange::OrderSide::Sell => PositionSide::Short,
                },
                fill_price,
                request.quantity,
                1.0,
            ));
        }
        Ok(order)
    }

    async fn get_order(&self, order_id: &str) -> Result<Order, BotError> {
        self.orders
            .lock()
            .await
            .get(order_id)
            .cloned()
            .ok_or_else(|| BotError::GatewayRejected(format!("unknown order {}", order_id)))
    }

    async fn cancel_order(&self, order_id: &str) -> Result<bool, BotError> {
        let mut orders = self.orders.lock().await;
        match orders.get_mut(order_id) {
            Some(order) if order.is_active() => {
                order.status = OrderStatus::Cancelled;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(BotError::GatewayRejected(format!(
                "unknown order {}",
                order_id
            ))),
        }
    }

    async fn get_positions(&self, symbol: Option<&str>) -> Result<Vec<Position>, BotError> {
        let positions = self.positions.lock().await;
        Ok(positions
            .iter()
            .filter(|p| symbol.map_or(true, |s| p.symbol == s))
            .cloned()
            .collect())
    }

    async fn get_balance(&self) -> Result<AccountBalance, BotError> {
        Ok(AccountBalance::new(10_000.0))
    }

    async fn subscribe_ticker(
        &self,
        _symbol: &str,
    ) -> Result<mpsc::Receiver<PriceTick>, BotError> {
        let (tx, rx) = mpsc::channel(32);
        *self.ticker_tx.lock().await = Some(tx);
        Ok(rx)
    }

    async fn subscribe_positions(&self) -> Result<mpsc::Receiver<Position>, BotError> {
        let (tx, rx) = mpsc::channel(32);
        *self.position_tx.lock().await = Some(tx);
        Ok(rx)
    }
}

fn flat_candles(count: usize) -> Vec<Candle> {
    let base_time = Utc::now();
    (0..count)
        .map(|i| {
            Candle::new(
                base_time + Duration::minutes(5 * i as i64),
                100.0,
                100.0,
                100.0,
                100.0,
                1000.0,
            )
        })
        .collect()
}

fn rising_candles(count: usize) -> Vec<Candle> {
    let base_time = Utc::now();
    (0..count)
        .map(|i| {
            let price = 100.0 + 0.5 * i as f64;
            Candle::new(
                base_time + Duration::minutes(5 * i as i64),
                price,
                price + 0.5,
                price - 0.5,
                price,
                1000.0,
            )
        })
        .collect()
}

/// Fast cadences and long refresh intervals so tests control the timing
fn test_config() -> BotConfig {
    BotConfig {
        signal_poll_secs: 1,
        position_refresh_open_secs: 30,
        position_refresh_idle_secs: 30,
        retry_backoff_ms: 10,
        ..BotConfig::default()
    }
}

/// Thresholds loose enough that a steady uptrend produces a long entry
fn permissive_signal_config() -> SignalConfig {
    SignalConfig {
        timeframes: vec!["5m".to_string()],
        rsi_oversold: 101.0,
        band_proximity_percent: 50.0,
        min_confidence: 0.0,
        ..SignalConfig::default()
    }
}

#[tokio::test]
async fn test_second_start_rejected() {
    let gateway = Arc::new(MockGateway::new(flat_candles(250)));
    let mut controller = BotController::new(gateway, SYMBOL, test_config());

    controller.start().await.unwrap();
    assert!(matches!(
        controller.start().await,
        Err(BotError::AlreadyRunning(_))
    ));

    controller.stop().await.unwrap();
    assert_eq!(controller.state().await, BotState::Idle);
}

#[tokio::test]
async fn test_stop_while_idle_is_noop() {
    let gateway = Arc::new(MockGateway::new(flat_candles(250)));
    let mut controller = BotController::new(gateway, SYMBOL, test_config());
    controller.stop().await.unwrap();
    assert_eq!(controller.state().await, BotState::Idle);
}

#[tokio::test]
async fn test_flat_market_keeps_awaiting_signal() {
    let gateway = Arc::new(MockGateway::new(flat_candles(250)));
    let mut controller = BotController::new(Arc::clone(&gateway), SYMBOL, test_config());

    controller.start().await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    assert_eq!(controller.state().await, BotState::AwaitingSignal);
    assert!(controller.orders().await.is_empty());
    controller.stop().await.unwrap();
}

#[tokio::test]
async fn test_entry_flow_opens_position() {
    let gateway = Arc::new(MockGateway::new(rising_candles(250)));
    let mut config = test_config();
    config.signal = permissive_signal_config();
    let mut controller = BotController::new(Arc::clone(&gateway), SYMBOL, config);

    controller.start().await.unwrap();
    // First signal poll fires immediately; give the fill a moment
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.state, BotState::PositionOpen);
    let position = snapshot.position.expect("position should be open");
    assert_eq!(position.side, PositionSide::Long);
    assert!(position.take_profit.is_some());
    assert!(position.stop_loss.is_some());
    assert_eq!(controller.orders().await.len(), 1);

    controller.stop().await.unwrap();
    assert_eq!(controller.state().await, BotState::Idle);
    assert!(controller.snapshot().await.position.is_none());
}

#[tokio::test]
async fn test_rejected_order_returns_to_awaiting() {
    let gateway = Arc::new(MockGateway::rejecting(rising_candles(250)));
    let mut config = test_config();
    config.signal = permissive_signal_config();
    let mut controller = BotController::new(Arc::clone(&gateway), SYMBOL, config);

    controller.start().await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    // Rejection is not fatal: flat again and still evaluating
    assert_eq!(controller.state().await, BotState::AwaitingSignal);
    assert!(controller.snapshot().await.position.is_none());
    let log = controller.trade_log().await;
    assert!(log.iter().any(|e| e.severity == LogSeverity::Error));

    controller.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_with_open_position_closes_it() {
    let gateway = Arc::new(MockGateway::new(flat_candles(250)));
    let mut controller = BotController::new(Arc::clone(&gateway), SYMBOL, test_config());

    controller.start().await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    // Position opened outside the bot (e.g. manually on the exchange)
    let external = Position::open(SYMBOL.to_string(), PositionSide::Long, 100.0, 10.0, 3.0);
    gateway.positions.lock().await.push(external.clone());
    gateway.push_position(external).await;
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    assert_eq!(controller.state().await, BotState::PositionOpen);

    controller.stop().await.unwrap();

    // Stop returned only after the position was flattened
    assert_eq!(controller.state().await, BotState::Idle);
    assert!(controller.snapshot().await.position.is_none());
    let orders = gateway.placed_orders().await;
    assert!(orders.iter().any(|o| o.is_filled()));
    assert!(gateway.positions.lock().await.is_empty());
}

#[tokio::test]
async fn test_two_positions_for_symbol_halt_the_bot() {
    let gateway = Arc::new(MockGateway::new(flat_candles(250)));
    let mut config = test_config();
    // Refresh must fire between signal polls for reconciliation to run
    config.signal_poll_secs = 5;
    config.position_refresh_open_secs = 1;
    config.position_refresh_idle_secs = 1;
    let mut controller = BotController::new(Arc::clone(&gateway), SYMBOL, config);

    controller.start().await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    // Gateway reports a long and a short against the same symbol
    {
        let mut positions = gateway.positions.lock().await;
        positions.push(Position::open(
            SYMBOL.to_string(),
            PositionSide::Long,
            100.0,
            10.0,
            3.0,
        ));
        positions.push(Position::open(
            SYMBOL.to_string(),
            PositionSide::Short,
            100.0,
            10.0,
            3.0,
        ));
    }
    tokio::time::sleep(std::time::Duration::from_millis(2500)).await;

    // Ambiguous exposure is fatal: no adoption, no further trading
    assert_eq!(controller.state().await, BotState::Error);
    assert!(controller.snapshot().await.position.is_none());
}

#[tokio::test]
async fn test_manual_order_and_log() {
    let gateway = Arc::new(MockGateway::new(flat_candles(250)));
    let controller = BotController::new(
        Arc::clone(&gateway),
        SYMBOL,
        test_config(),
    );

    let order = controller
        .place_manual_order(coinscalp_rs::exchange::OrderSide::Buy, 5.0)
        .await
        .unwrap();
    assert!(order.is_filled());
    assert_eq!(controller.orders().await.len(), 1);

    let log = controller.trade_log().await;
    assert!(!log.is_empty());
    controller.clear_trade_log().await;
    assert!(controller.trade_log().await.is_empty());
}

#[tokio::test]
async fn test_leverage_update_validated() {
    let gateway = Arc::new(MockGateway::new(flat_candles(250)));
    let controller = BotController::new(gateway, SYMBOL, test_config());

    controller.set_leverage(5.0).await.unwrap();
    assert!(matches!(
        controller.set_leverage(500.0).await,
        Err(BotError::ConfigurationInvalid(_))
    ));
    controller.set_investment_amount(250.0).await.unwrap();
}
