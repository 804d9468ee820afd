//! Bot execution controller
//!
//! Owns the trading loop for one symbol: candle ingestion, signal
//! evaluation on a fixed cadence, order placement with fill confirmation,
//! position management with a ratcheting trailing stop, and reconciliation
//! against gateway position snapshots. All mutation of bot state happens on
//! the loop task; the controller handle only reads snapshots and posts
//! configuration changes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::bot::{BotState, LogSeverity, TradeLog, TradeLogEntry};
use crate::config::BotConfig;
use crate::data::{Candle, CandleStore};
use crate::error::BotError;
use crate::exchange::{
    retry, ExchangeGateway, Order, OrderRequest, OrderSide, PriceTick,
};
use crate::indicators::IndicatorSet;
use crate::market::{ConditionReport, MarketClassifier};
use crate::portfolio::{Position, PositionSide, RiskManager};
use crate::strategy::{select_strategy, Signal, SignalGenerator, SignalKind, TradingStrategy};

/// State shared between the controller handle and the loop task
#[derive(Debug)]
struct SharedState {
    state: Mutex<BotState>,
    position: Mutex<Option<Position>>,
    last_signal: Mutex<Option<Signal>>,
    last_report: Mutex<Option<ConditionReport>>,
    indicators: Mutex<Vec<IndicatorSet>>,
    strategy: Mutex<Option<TradingStrategy>>,
    orders: Mutex<Vec<Order>>,
    risk: Mutex<RiskManager>,
    log: Mutex<TradeLog>,
}

impl SharedState {
    async fn set_state(&self, next: BotState) {
        let mut state = self.state.lock().await;
        if *state != next {
            info!(from = %*state, to = %next, "bot state transition");
            *state = next;
        }
    }

    async fn log(&self, severity: LogSeverity, message: impl Into<String>) {
        self.log.lock().await.push(severity, message);
    }
}

/// Read-only view of the running bot
#[derive(Debug, Clone)]
pub struct BotSnapshot {
    /// Current lifecycle state
    pub state: BotState,
    /// Open position, if any
    pub position: Option<Position>,
    /// Most recent evaluated signal
    pub last_signal: Option<Signal>,
    /// Most recent market classification
    pub condition: Option<ConditionReport>,
    /// Per-timeframe indicator snapshots from the last evaluation
    pub indicators: Vec<IndicatorSet>,
    /// Risk parameters in effect for the open or pending position
    pub strategy: Option<TradingStrategy>,
}

/// Bot execution controller for a single symbol
pub struct BotController<G: ExchangeGateway + 'static> {
    gateway: Arc<G>,
    symbol: String,
    config: BotConfig,
    shared: Arc<SharedState>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<G: ExchangeGateway + 'static> BotController<G> {
    /// Create a controller. Nothing runs until [`Self::start`].
    pub fn new(gateway: Arc<G>, symbol: impl Into<String>, config: BotConfig) -> Self {
        let shared = Arc::new(SharedState {
            state: Mutex::new(BotState::Idle),
            position: Mutex::new(None),
            last_signal: Mutex::new(None),
            last_report: Mutex::new(None),
            indicators: Mutex::new(Vec::new()),
            strategy: Mutex::new(None),
            orders: Mutex::new(Vec::new()),
            risk: Mutex::new(RiskManager::new(config.risk.clone())),
            log: Mutex::new(TradeLog::new(config.max_log_entries)),
        });
        Self {
            gateway,
            symbol: symbol.into(),
            config,
            shared,
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    /// Start the trading loop. Fails with `AlreadyRunning` when the bot is
    /// not idle.
    pub async fn start(&mut self) -> Result<(), BotError> {
        {
            let mut state = self.shared.state.lock().await;
            if state.is_running() {
                return Err(BotError::AlreadyRunning(self.symbol.clone()));
            }
            *state = BotState::AwaitingSignal;
        }
        self.shared
            .log(LogSeverity::Info, format!("bot started for {}", self.symbol))
            .await;
        info!(symbol = %self.symbol, "bot starting");

        self.cancel = CancellationToken::new();
        let engine = Engine {
            gateway: Arc::clone(&self.gateway),
            symbol: self.symbol.clone(),
            config: self.config.clone(),
            shared: Arc::clone(&self.shared),
            cancel: self.cancel.clone(),
            store: CandleStore::new(),
            classifier: MarketClassifier::default(),
            generator: SignalGenerator::new(self.config.signal.clone()),
            active_strategy: None,
            peak_mark: None,
        };
        self.task = Some(tokio::spawn(engine.run()));
        Ok(())
    }

    /// Stop the trading loop. If a position is open it is closed before this
    /// returns; the caller can rely on being flat afterwards.
    pub async fn stop(&mut self) -> Result<(), BotError> {
        if self.task.is_none() && !self.shared.state.lock().await.is_running() {
            return Ok(());
        }
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "bot loop task failed");
            }
        }

        let open = { self.shared.position.lock().await.clone() };
        if let Some(position) = open {
            self.shared.set_state(BotState::Closing).await;
            self.shared
                .log(LogSeverity::Info, "closing position on stop")
                .await;
            let order =
                submit_close(self.gateway.as_ref(), &self.config, &position).await?;
            if !order.is_filled() {
                self.shared.set_state(BotState::Error).await;
                return Err(BotError::GatewayRejected(format!(
                    "close order {} not filled on stop (status {:?})",
                    order.id, order.status
                )));
            }
            self.shared
                .log(
                    LogSeverity::Success,
                    format!(
                        "position closed on stop, realized pnl {:.2}",
                        position.unrealized_pnl
                    ),
                )
                .await;
            *self.shared.position.lock().await = None;
        }

        self.shared.set_state(BotState::Idle).await;
        self.shared.log(LogSeverity::Info, "bot stopped").await;
        info!(symbol = %self.symbol, "bot stopped");
        Ok(())
    }

    /// Current state
    pub async fn state(&self) -> BotState {
        *self.shared.state.lock().await
    }

    /// State, position, signal and latest evaluation in one view
    pub async fn snapshot(&self) -> BotSnapshot {
        BotSnapshot {
            state: *self.shared.state.lock().await,
            position: self.shared.position.lock().await.clone(),
            last_signal: self.shared.last_signal.lock().await.clone(),
            condition: self.shared.last_report.lock().await.clone(),
            indicators: self.shared.indicators.lock().await.clone(),
            strategy: self.shared.strategy.lock().await.clone(),
        }
    }

    /// Orders placed since start, newest last
    pub async fn orders(&self) -> Vec<Order> {
        self.shared.orders.lock().await.clone()
    }

    /// Trade log entries, oldest first
    pub async fn trade_log(&self) -> Vec<TradeLogEntry> {
        self.shared.log.lock().await.entries().cloned().collect()
    }

    /// Drop all trade log entries
    pub async fn clear_trade_log(&self) {
        self.shared.log.lock().await.clear();
    }

    /// Update the margin committed per trade
    pub async fn set_investment_amount(&self, amount: f64) -> Result<(), BotError> {
        self.shared
            .risk
            .lock()
            .await
            .set_investment_amount(amount)?;
        self.shared
            .log(LogSeverity::Info, format!("investment amount set to {}", amount))
            .await;
        Ok(())
    }

    /// Update the leverage used for new positions
    pub async fn set_leverage(&self, leverage: f64) -> Result<(), BotError> {
        self.shared.risk.lock().await.set_leverage(leverage)?;
        self.shared
            .log(LogSeverity::Info, format!("leverage set to {}x", leverage))
            .await;
        Ok(())
    }

    /// Place an order outside the signal loop (operator action)
    pub async fn place_manual_order(
        &self,
        side: OrderSide,
        quantity: f64,
    ) -> Result<Order, BotError> {
        let request = OrderRequest::market(&self.symbol, side, quantity);
        let order = retry::with_backoff(
            "manual_order",
            self.config.max_gateway_retries,
            Duration::from_millis(self.config.retry_backoff_ms),
            || self.gateway.place_order(request.clone()),
        )
        .await?;
        self.shared.orders.lock().await.push(order.clone());
        self.shared
            .log(
                LogSeverity::Info,
                format!("manual {:?} order placed: {}", side, order.id),
            )
            .await;
        Ok(order)
    }
}

/// Loop-owned engine; consumed by the spawned task
struct Engine<G: ExchangeGateway> {
    gateway: Arc<G>,
    symbol: String,
    config: BotConfig,
    shared: Arc<SharedState>,
    cancel: CancellationToken,
    store: CandleStore,
    classifier: MarketClassifier,
    generator: SignalGenerator,
    /// Risk parameters of the position being entered or managed
    active_strategy: Option<TradingStrategy>,
    /// Best mark price seen since the trailing stop armed
    peak_mark: Option<f64>,
}

impl<G: ExchangeGateway> Engine<G> {
    async fn run(mut self) {
        if let Err(e) = self.backfill().await {
            self.enter_error(format!("initial candle fetch failed: {}", e))
                .await;
            return;
        }

        let mut ticker = match self.gateway.subscribe_ticker(&self.symbol).await {
            Ok(rx) => rx,
            Err(e) => {
                self.enter_error(format!("ticker subscription failed: {}", e))
                    .await;
                return;
            }
        };
        let mut positions = match self.gateway.subscribe_positions().await {
            Ok(rx) => rx,
            Err(e) => {
                self.enter_error(format!("position subscription failed: {}", e))
                    .await;
                return;
            }
        };

        let mut signal_tick = tokio::time::interval(self.config.signal_poll());
        signal_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let cancel = self.cancel.clone();

        loop {
            let position_open = { self.shared.position.lock().await.is_some() };
            let refresh = tokio::time::sleep(self.config.position_refresh(position_open));
            tokio::pin!(refresh);

            tokio::select! {
                _ = cancel.cancelled() => break,
                tick = ticker.recv() => match tick {
                    Some(tick) => {
                        if let Err(e) = self.on_tick(tick).await {
                            self.handle_loop_error(e).await;
                        }
                    }
                    None => {
                        self.enter_error("ticker stream closed".to_string()).await;
                        break;
                    }
                },
                update = positions.recv() => {
                    if let Some(incoming) = update {
                        self.apply_position_update(incoming).await;
                    }
                },
                _ = signal_tick.tick() => {
                    if let Err(e) = self.evaluate_and_trade().await {
                        self.handle_loop_error(e).await;
                    }
                },
                _ = &mut refresh => {
                    if let Err(e) = self.refresh_positions().await {
                        self.handle_loop_error(e).await;
                    }
                },
            }

            if *self.shared.state.lock().await == BotState::Error {
                break;
            }
        }
    }

    /// Fetch the initial candle history for every configured timeframe
    async fn backfill(&mut self) -> Result<(), BotError> {
        for interval in self.config.signal.timeframes.clone() {
            let candles = retry::with_backoff(
                "fetch_candles",
                self.config.max_gateway_retries,
                Duration::from_millis(self.config.retry_backoff_ms),
                || {
                    self.gateway.fetch_candles(
                        &self.symbol,
                        &interval,
                        self.config.candle_fetch_limit,
                    )
                },
            )
            .await?;
            info!(symbol = %self.symbol, %interval, count = candles.len(), "candles loaded");
            self.store.merge(&self.symbol, &interval, candles);
        }
        Ok(())
    }

    /// One signal evaluation cycle. Only acts while flat and awaiting.
    async fn evaluate_and_trade(&mut self) -> Result<(), BotError> {
        if *self.shared.state.lock().await != BotState::AwaitingSignal {
            return Ok(());
        }
        self.backfill().await?;

        let mut sets = Vec::with_capacity(self.config.signal.timeframes.len());
        for interval in &self.config.signal.timeframes {
            let series = self
                .store
                .series(&self.symbol, interval)
                .ok_or_else(|| {
                    BotError::DataUnavailable(format!("no candles for {}", interval))
                })?;
            let set = IndicatorSet::compute(series).ok_or_else(|| {
                BotError::DataUnavailable(format!("empty series for {}", interval))
            })?;
            sets.push(set);
        }
        let price = self
            .store
            .latest(&self.symbol, self.config.signal.fastest_timeframe())
            .map(|c| c.close)
            .ok_or_else(|| BotError::DataUnavailable("no current price".to_string()))?;

        *self.shared.indicators.lock().await = sets.clone();
        let report = match self.classifier.classify(&sets) {
            Ok(report) => report,
            Err(BotError::DataUnavailable(reason)) => {
                // Not enough history yet; keep waiting
                self.shared
                    .log(LogSeverity::Signal, format!("classification skipped: {}", reason))
                    .await;
                return Ok(());
            }
            Err(other) => return Err(other),
        };

        let max_leverage = {
            let risk = self.shared.risk.lock().await;
            risk.config().max_leverage
        };
        let strategy = select_strategy(report.condition, report.confidence, max_leverage);
        let signal = self.generator.generate(&sets, price);
        *self.shared.last_report.lock().await = Some(report.clone());
        *self.shared.last_signal.lock().await = Some(signal.clone());

        if !signal.is_actionable(self.config.signal.min_confidence) {
            return Ok(());
        }

        self.shared
            .log(
                LogSeverity::Signal,
                format!(
                    "{:?} signal ({:.0}% confidence) in {:?} market: {}",
                    signal.kind,
                    signal.confidence * 100.0,
                    report.condition,
                    signal.reasoning
                ),
            )
            .await;
        match self.place_entry(&signal, strategy, price).await {
            Ok(()) => Ok(()),
            Err(e @ BotError::InvariantViolation(_)) => Err(e),
            Err(e) => {
                // Entry failed before any fill; stay flat and keep evaluating
                self.shared
                    .log(LogSeverity::Error, format!("entry failed: {}", e))
                    .await;
                self.shared.set_state(BotState::AwaitingSignal).await;
                Ok(())
            }
        }
    }

    /// Place the entry order and confirm the fill
    async fn place_entry(
        &mut self,
        signal: &Signal,
        strategy: TradingStrategy,
        price: f64,
    ) -> Result<(), BotError> {
        self.shared.set_state(BotState::PlacingOrder).await;

        let (quantity, leverage) = {
            let mut risk = self.shared.risk.lock().await;
            risk.set_leverage(strategy.recommended_leverage)?;
            let balance = retry::with_backoff(
                "get_balance",
                self.config.max_gateway_retries,
                Duration::from_millis(self.config.retry_backoff_ms),
                || self.gateway.get_balance(),
            )
            .await?;
            risk.check_margin(&balance)?;
            (risk.order_quantity(price)?, risk.config().leverage)
        };

        let side = match signal.kind {
            SignalKind::Long => OrderSide::Buy,
            SignalKind::Short => OrderSide::Sell,
            SignalKind::None => {
                return Err(BotError::InvariantViolation(
                    "attempted to place an order for a no-entry signal".to_string(),
                ))
            }
        };
        let request = OrderRequest::market(&self.symbol, side, quantity);
        let placed = match retry::with_backoff(
            "place_order",
            self.config.max_gateway_retries,
            Duration::from_millis(self.config.retry_backoff_ms),
            || self.gateway.place_order(request.clone()),
        )
        .await
        {
            Ok(order) => order,
            Err(e @ BotError::InvariantViolation(_)) => return Err(e),
            Err(e) => {
                // Placement failed cleanly; stay flat and keep evaluating
                self.shared
                    .log(LogSeverity::Error, format!("order placement failed: {}", e))
                    .await;
                self.shared.set_state(BotState::AwaitingSignal).await;
                return Ok(());
            }
        };
        self.shared.orders.lock().await.push(placed.clone());

        let confirmed = await_fill(self.gateway.as_ref(), &self.config, &placed).await?;
        {
            let mut orders = self.shared.orders.lock().await;
            if let Some(slot) = orders.iter_mut().find(|o| o.id == confirmed.id) {
                *slot = confirmed.clone();
            }
        }
        if !confirmed.is_filled() {
            // Ambiguous or dead order: make sure nothing is left working
            if confirmed.is_active() {
                if let Err(e) = self.gateway.cancel_order(&confirmed.id).await {
                    warn!(order_id = %confirmed.id, error = %e, "cancel after timeout failed");
                }
            }
            self.shared
                .log(
                    LogSeverity::Error,
                    format!("entry order {} not filled, cancelled", confirmed.id),
                )
                .await;
            self.shared.set_state(BotState::AwaitingSignal).await;
            return Ok(());
        }

        let entry_price = confirmed.avg_fill_price.unwrap_or(price);
        let position_side = match side {
            OrderSide::Buy => PositionSide::Long,
            OrderSide::Sell => PositionSide::Short,
        };
        let mut position = Position::open(
            self.symbol.clone(),
            position_side,
            entry_price,
            confirmed.filled_quantity.max(quantity),
            leverage,
        );
        let tp_offset = strategy.take_profit_percent / 100.0;
        let sl_offset = strategy.stop_loss_percent / 100.0;
        match position_side {
            PositionSide::Long => {
                position.take_profit = Some(entry_price * (1.0 + tp_offset));
                position.stop_loss = Some(entry_price * (1.0 - sl_offset));
            }
            PositionSide::Short => {
                position.take_profit = Some(entry_price * (1.0 - tp_offset));
                position.stop_loss = Some(entry_price * (1.0 + sl_offset));
            }
        }

        self.shared
            .log(
                LogSeverity::Success,
                format!(
                    "{:?} position opened at {:.4} ({} @ {}x): {}",
                    position_side, entry_price, position.size, leverage, strategy.description
                ),
            )
            .await;
        *self.shared.position.lock().await = Some(position);
        *self.shared.strategy.lock().await = Some(strategy.clone());
        self.active_strategy = Some(strategy);
        self.peak_mark = None;
        self.shared.set_state(BotState::PositionOpen).await;
        Ok(())
    }

    /// Apply a live price tick: forming candle update, then exit management
    async fn on_tick(&mut self, tick: PriceTick) -> Result<(), BotError> {
        if tick.symbol != self.symbol {
            return Ok(());
        }
        let interval = self.config.signal.fastest_timeframe().to_string();
        if let Some(candle) = self.forming_candle(&interval, &tick) {
            self.store.apply_tick(&self.symbol, &interval, candle);
            self.store
                .trim(&self.symbol, &interval, self.config.candle_fetch_limit);
        }

        let mut close_reason: Option<String> = None;
        {
            let shared = Arc::clone(&self.shared);
            let mut guard = shared.position.lock().await;
            if let Some(position) = guard.as_mut() {
                position.update_mark_price(tick.price);
                self.manage_trailing_stop(position);
                if position.is_take_profit_hit() {
                    close_reason = Some(format!(
                        "take profit hit at {:.4} (ROE {:+.2}%)",
                        tick.price,
                        position.roe_percent()
                    ));
                } else if position.is_stop_loss_hit() {
                    close_reason = Some(format!(
                        "stop loss hit at {:.4} (ROE {:+.2}%)",
                        tick.price,
                        position.roe_percent()
                    ));
                }
            }
        }
        if let Some(reason) = close_reason {
            if *self.shared.state.lock().await == BotState::PositionOpen {
                self.close_position(&reason).await?;
            }
        }
        Ok(())
    }

    /// Arm and ratchet the trailing stop. The stop trails the best mark seen
    /// by half the strategy's stop-loss distance, and only ever tightens.
    fn manage_trailing_stop(&mut self, position: &mut Position) {
        let Some(strategy) = &self.active_strategy else {
            return;
        };
        if !strategy.use_trailing_stop {
            return;
        }
        if position.roe_percent() < strategy.trailing_stop_trigger_percent {
            return;
        }

        let mark = position.mark_price;
        let peak = match (self.peak_mark, position.side) {
            (Some(peak), PositionSide::Long) => peak.max(mark),
            (Some(peak), PositionSide::Short) => peak.min(mark),
            (None, _) => mark,
        };
        self.peak_mark = Some(peak);

        let trail = strategy.stop_loss_percent / 2.0 / 100.0;
        let candidate = match position.side {
            PositionSide::Long => peak * (1.0 - trail),
            PositionSide::Short => peak * (1.0 + trail),
        };
        position.tighten_stop(candidate);
    }

    /// Close the open position with a reduce-only market order
    async fn close_position(&mut self, reason: &str) -> Result<(), BotError> {
        let open = { self.shared.position.lock().await.clone() };
        let Some(position) = open else {
            return Ok(());
        };
        self.shared.set_state(BotState::Closing).await;
        self.shared
            .log(LogSeverity::Info, format!("closing position: {}", reason))
            .await;

        let order = submit_close(self.gateway.as_ref(), &self.config, &position).await?;
        self.shared.orders.lock().await.push(order.clone());
        if !order.is_filled() {
            self.shared
                .log(
                    LogSeverity::Error,
                    format!("close order {} not filled (status {:?})", order.id, order.status),
                )
                .await;
            // Exposure unknown until the next position refresh resolves it
            self.shared.set_state(BotState::PositionOpen).await;
            return Ok(());
        }

        self.shared
            .log(
                LogSeverity::Success,
                format!("position closed, realized pnl {:.2}", position.unrealized_pnl),
            )
            .await;
        *self.shared.position.lock().await = None;
        *self.shared.strategy.lock().await = None;
        self.active_strategy = None;
        self.peak_mark = None;
        self.shared.set_state(BotState::AwaitingSignal).await;
        Ok(())
    }

    /// Reconcile local position state against the gateway
    async fn refresh_positions(&mut self) -> Result<(), BotError> {
        let remote = retry::with_backoff(
            "get_positions",
            self.config.max_gateway_retries,
            Duration::from_millis(self.config.retry_backoff_ms),
            || self.gateway.get_positions(Some(&self.symbol)),
        )
        .await?;
        let mut matching: Vec<Position> = remote
            .into_iter()
            .filter(|p| p.symbol == self.symbol)
            .collect();
        // One symbol, at most one position; anything else means local and
        // exchange state have diverged and trading must halt
        if matching.len() > 1 {
            return Err(BotError::InvariantViolation(format!(
                "{} open positions reported for {}",
                matching.len(),
                self.symbol
            )));
        }

        match matching.pop() {
            Some(position) => self.apply_position_update(position).await,
            None => {
                let was_open = { self.shared.position.lock().await.take().is_some() };
                if was_open && *self.shared.state.lock().await == BotState::PositionOpen {
                    // Closed on the exchange side (server TP/SL, liquidation)
                    self.shared
                        .log(LogSeverity::Success, "position closed on exchange")
                        .await;
                    *self.shared.strategy.lock().await = None;
                    self.active_strategy = None;
                    self.peak_mark = None;
                    self.shared.set_state(BotState::AwaitingSignal).await;
                }
            }
        }
        Ok(())
    }

    /// Merge a pushed or polled position snapshot, keeping the tighter stop
    async fn apply_position_update(&mut self, incoming: Position) {
        if incoming.symbol != self.symbol {
            return;
        }
        let mut guard = self.shared.position.lock().await;
        match guard.as_mut() {
            Some(current) => {
                // Out-of-order snapshots must never rewind local state
                if incoming.updated_at <= current.updated_at {
                    return;
                }
                let ratcheted_stop = current.stop_loss;
                let take_profit = current.take_profit.or(incoming.take_profit);
                *current = incoming;
                current.take_profit = take_profit;
                if let Some(stop) = ratcheted_stop {
                    current.tighten_stop(stop);
                }
            }
            None => {
                // Position we did not open locally (manual entry, restart)
                *guard = Some(incoming);
                drop(guard);
                if *self.shared.state.lock().await == BotState::AwaitingSignal {
                    self.shared
                        .log(LogSeverity::Info, "adopted externally opened position")
                        .await;
                    self.shared.set_state(BotState::PositionOpen).await;
                }
            }
        }
    }

    /// Route a loop-iteration error: invariant breaks halt trading, the
    /// rest is logged and retried next cycle
    async fn handle_loop_error(&mut self, e: BotError) {
        match e {
            BotError::InvariantViolation(_) => {
                self.enter_error(e.to_string()).await;
            }
            other => {
                warn!(symbol = %self.symbol, error = %other, "recoverable loop error");
                self.shared
                    .log(LogSeverity::Error, other.to_string())
                    .await;
            }
        }
    }

    /// Halt trading: cancel working orders best-effort, enter `Error`
    async fn enter_error(&mut self, reason: String) {
        error!(symbol = %self.symbol, %reason, "bot entering error state");
        let working: Vec<Order> = {
            self.shared
                .orders
                .lock()
                .await
                .iter()
                .filter(|o| o.is_active())
                .cloned()
                .collect()
        };
        for order in working {
            if let Err(e) = self.gateway.cancel_order(&order.id).await {
                warn!(order_id = %order.id, error = %e, "cancel on error failed");
            }
        }
        self.shared.log(LogSeverity::Error, reason).await;
        self.shared.set_state(BotState::Error).await;
    }

    /// Fold a tick into the forming candle for `interval`
    fn forming_candle(&self, interval: &str, tick: &PriceTick) -> Option<Candle> {
        let secs = interval_seconds(interval)? as i64;
        let bucket = tick.timestamp.timestamp() - tick.timestamp.timestamp().rem_euclid(secs);
        let bucket = chrono::DateTime::from_timestamp(bucket, 0)?;
        let volume = tick.volume.unwrap_or(0.0);

        match self.store.latest(&self.symbol, interval) {
            Some(last) if last.timestamp == bucket => Some(Candle::new(
                bucket,
                last.open,
                last.high.max(tick.price),
                last.low.min(tick.price),
                tick.price,
                last.volume + volume,
            )),
            _ => Some(Candle::new(
                bucket, tick.price, tick.price, tick.price, tick.price, volume,
            )),
        }
    }
}

/// Parse an interval label like "5m", "1h" or "1d" into seconds
fn interval_seconds(interval: &str) -> Option<u64> {
    let (digits, unit) = interval.split_at(interval.len().checked_sub(1)?);
    let n: u64 = digits.parse().ok()?;
    match unit {
        "s" => Some(n),
        "m" => Some(n * 60),
        "h" => Some(n * 3600),
        "d" => Some(n * 86_400),
        _ => None,
    }
}

/// Place a reduce-only market order closing `position` and await its fill
async fn submit_close<G: ExchangeGateway>(
    gateway: &G,
    config: &BotConfig,
    position: &Position,
) -> Result<Order, BotError> {
    let side = match position.side {
        PositionSide::Long => OrderSide::Sell,
        PositionSide::Short => OrderSide::Buy,
    };
    let request = OrderRequest::market(&position.symbol, side, position.size).reduce_only();
    let order = retry::with_backoff(
        "close_order",
        config.max_gateway_retries,
        Duration::from_millis(config.retry_backoff_ms),
        || gateway.place_order(request.clone()),
    )
    .await?;
    await_fill(gateway, config, &order).await
}

/// Poll an order until it reaches a terminal status or the configured number
/// of checks is spent; returns the last observed order state
async fn await_fill<G: ExchangeGateway>(
    gateway: &G,
    config: &BotConfig,
    order: &Order,
) -> Result<Order, BotError> {
    let order_id = order.id.clone();
    let mut latest = order.clone();
    for _ in 0..config.max_order_checks {
        if latest.status.is_terminal() {
            return Ok(latest);
        }
        tokio::time::sleep(Duration::from_millis(config.retry_backoff_ms)).await;
        latest = retry::with_backoff(
            "get_order",
            config.max_gateway_retries,
            Duration::from_millis(config.retry_backoff_ms),
            || gateway.get_order(&order_id),
        )
        .await?;
    }
    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_seconds() {
        assert_eq!(interval_seconds("5m"), Some(300));
        assert_eq!(interval_seconds("30m"), Some(1800));
        assert_eq!(interval_seconds("1h"), Some(3600));
        assert_eq!(interval_seconds("1d"), Some(86_400));
        assert_eq!(interval_seconds("xyz"), None);
        assert_eq!(interval_seconds(""), None);
    }
}
