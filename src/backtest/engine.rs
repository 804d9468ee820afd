//! Backtesting engine
//!
//! Walks the candle series once. At candle `i` the signal source sees the
//! prefix `0..=i` and nothing else; an actionable signal becomes a pending
//! entry that fills at the open of candle `i + 1`, adjusted for slippage.
//! Exits are resolved intra-candle against the high/low with the stop
//! checked before the target, so overlapping candles resolve pessimistically.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::{ClassifierConfig, SignalConfig};
use crate::data::Candle;
use crate::error::BotError;
use crate::indicators::IndicatorSet;
use crate::market::MarketClassifier;
use crate::portfolio::PositionSide;
use crate::strategy::{select_strategy, Signal, SignalGenerator, SignalKind, TradingStrategy};

/// Backtest cost and sizing parameters
#[derive(Debug, Clone)]
pub struct BacktestConfig {
    /// Starting account balance
    pub initial_balance: f64,
    /// Margin committed per trade
    pub stake_amount: f64,
    /// Taker fee as percent of notional, charged on entry and exit
    pub fee_percent: f64,
    /// Adverse fill slippage as percent of price, applied on entry and exit
    pub slippage_percent: f64,
    /// Minimum signal confidence to act on
    pub min_confidence: f64,
    /// Leverage cap passed to strategy selection
    pub max_leverage: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_balance: 10_000.0,
            stake_amount: 100.0,
            fee_percent: 0.04,
            slippage_percent: 0.02,
            min_confidence: 0.6,
            max_leverage: 20.0,
        }
    }
}

/// Signal plus the risk parameters selected for it
#[derive(Debug, Clone)]
pub struct Decision {
    /// Entry signal
    pub signal: Signal,
    /// Strategy parameters in effect for this entry
    pub strategy: TradingStrategy,
}

/// Source of trading decisions evaluated over a growing candle history.
///
/// The engine only ever passes closed candles up to and including the
/// decision candle; implementations must not assume anything beyond the
/// slice they are given.
pub trait SignalSource {
    /// Evaluate the history ending at the decision candle. `None` means
    /// hold; `DataUnavailable` during warmup is treated as hold by the
    /// engine.
    fn evaluate(&mut self, candles: &[Candle]) -> Result<Option<Decision>, BotError>;
}

/// Production decision pipeline over a single timeframe: classify the
/// regime, select risk parameters, then look for entry confluence.
pub struct IndicatorSource {
    classifier: MarketClassifier,
    generator: SignalGenerator,
    max_leverage: f64,
}

impl IndicatorSource {
    /// Create the pipeline with the given thresholds
    pub fn new(
        signal: SignalConfig,
        classifier: ClassifierConfig,
        max_leverage: f64,
    ) -> Self {
        Self {
            classifier: MarketClassifier::new(classifier),
            generator: SignalGenerator::new(signal),
            max_leverage,
        }
    }
}

impl SignalSource for IndicatorSource {
    fn evaluate(&mut self, candles: &[Candle]) -> Result<Option<Decision>, BotError> {
        let Some(set) = IndicatorSet::compute(candles) else {
            return Ok(None);
        };
        let sets = [set];
        let report = match self.classifier.classify(&sets) {
            Ok(report) => report,
            Err(BotError::DataUnavailable(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let strategy = select_strategy(report.condition, report.confidence, self.max_leverage);
        let price = candles.last().map_or(0.0, |c| c.close);
        let signal = self.generator.generate(&sets, price);
        if signal.kind == SignalKind::None {
            return Ok(None);
        }
        Ok(Some(Decision { signal, strategy }))
    }
}

/// Why a simulated trade was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Take-profit price reached
    TakeProfit,
    /// Stop-loss (or ratcheted trailing stop) price reached
    StopLoss,
    /// Force-closed at the last candle
    EndOfData,
}

/// Completed simulated trade
#[derive(Debug, Clone)]
pub struct Trade {
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub side: PositionSide,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub leverage: f64,
    pub pnl: f64,
    pub pnl_percent: f64,
    pub fees: f64,
    pub exit_reason: ExitReason,
}

/// Backtest result
#[derive(Debug, Clone)]
pub struct BacktestResult {
    /// Starting balance
    pub start_balance: f64,
    /// Ending balance
    pub end_balance: f64,
    /// Total return
    pub total_return: f64,
    /// Total return percentage
    pub total_return_percent: f64,
    /// Number of trades
    pub num_trades: usize,
    /// Winning trades
    pub winning_trades: usize,
    /// Losing trades
    pub losing_trades: usize,
    /// Win rate
    pub win_rate: f64,
    /// Average profit of winning trades
    pub avg_profit: f64,
    /// Average loss of losing trades
    pub avg_loss: f64,
    /// Fees paid across all trades
    pub total_fees: f64,
    /// Maximum drawdown of the equity curve
    pub max_drawdown: f64,
    /// Sharpe ratio over per-trade returns
    pub sharpe_ratio: f64,
    /// Account equity after each candle
    pub equity_curve: Vec<f64>,
}

/// Simulated open trade
struct OpenTrade {
    side: PositionSide,
    entry_time: DateTime<Utc>,
    entry_price: f64,
    quantity: f64,
    leverage: f64,
    take_profit: f64,
    stop_loss: f64,
    strategy: TradingStrategy,
    /// Best favorable price seen, for the trailing stop
    peak: f64,
    entry_fee: f64,
}

impl OpenTrade {
    fn unrealized(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.quantity * self.side.multiplier()
    }

    fn roe_percent(&self, price: f64) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        (price - self.entry_price) / self.entry_price
            * 100.0
            * self.side.multiplier()
            * self.leverage
    }
}

/// Backtesting engine
pub struct BacktestEngine {
    config: BacktestConfig,
    balance: f64,
    trades: Vec<Trade>,
    equity_curve: Vec<f64>,
}

impl BacktestEngine {
    /// Create new backtest engine
    pub fn new(config: BacktestConfig) -> Self {
        let balance = config.initial_balance;
        Self {
            config,
            balance,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    /// Run the simulation over `candles` (oldest first)
    pub fn run<S: SignalSource>(
        &mut self,
        source: &mut S,
        candles: &[Candle],
    ) -> Result<BacktestResult, BotError> {
        if candles.is_empty() {
            return Err(BotError::DataUnavailable(
                "no candles to backtest".to_string(),
            ));
        }

        let mut open: Option<OpenTrade> = None;
        let mut pending: Option<Decision> = None;

        for i in 0..candles.len() {
            let candle = &candles[i];

            // 1. A decision made on the previous candle fills at this open
            if open.is_none() {
                if let Some(decision) = pending.take() {
                    open = Some(self.fill_entry(&decision, candle));
                }
            }

            // 2. Manage the open trade against this candle's range
            if let Some(mut trade) = open.take() {
                match Self::resolve_exit(&trade, candle) {
                    Some((price, reason)) => {
                        self.close_trade(trade, price, candle.timestamp, reason)
                    }
                    None => {
                        Self::ratchet_trailing(&mut trade, candle);
                        open = Some(trade);
                    }
                }
            }

            // 3. Decide from the history up to and including this candle
            if open.is_none() && pending.is_none() {
                match source.evaluate(&candles[..=i]) {
                    Ok(Some(decision))
                        if decision.signal.is_actionable(self.config.min_confidence) =>
                    {
                        debug!(
                            index = i,
                            kind = ?decision.signal.kind,
                            confidence = decision.signal.confidence,
                            "entry queued for next open"
                        );
                        pending = Some(decision);
                    }
                    Ok(_) => {}
                    Err(BotError::DataUnavailable(_)) => {}
                    Err(e) => return Err(e),
                }
            }

            let unrealized = open.as_ref().map_or(0.0, |t| t.unrealized(candle.close));
            self.equity_curve.push(self.balance + unrealized);
        }

        // Force-close whatever is still open at the final close
        if let Some(trade) = open.take() {
            let last = candles.last().ok_or_else(|| {
                BotError::InvariantViolation("candle series emptied mid-run".to_string())
            })?;
            self.close_trade(trade, last.close, last.timestamp, ExitReason::EndOfData);
            if let Some(point) = self.equity_curve.last_mut() {
                *point = self.balance;
            }
        }

        self.calculate_results()
    }

    /// Open a trade at the candle open with adverse slippage and entry fee
    fn fill_entry(&mut self, decision: &Decision, candle: &Candle) -> OpenTrade {
        let side = match decision.signal.kind {
            SignalKind::Short => PositionSide::Short,
            _ => PositionSide::Long,
        };
        let slip = self.config.slippage_percent / 100.0;
        let entry_price = candle.open * (1.0 + slip * side.multiplier());
        let leverage = decision.strategy.recommended_leverage;
        let quantity = self.config.stake_amount * leverage / entry_price;
        let entry_fee = entry_price * quantity * self.config.fee_percent / 100.0;

        let tp = decision.strategy.take_profit_percent / 100.0;
        let sl = decision.strategy.stop_loss_percent / 100.0;
        let (take_profit, stop_loss) = match side {
            PositionSide::Long => (entry_price * (1.0 + tp), entry_price * (1.0 - sl)),
            PositionSide::Short => (entry_price * (1.0 - tp), entry_price * (1.0 + sl)),
        };

        debug!(?side, entry_price, quantity, leverage, "entry filled");
        OpenTrade {
            side,
            entry_time: candle.timestamp,
            entry_price,
            quantity,
            leverage,
            take_profit,
            stop_loss,
            strategy: decision.strategy.clone(),
            peak: entry_price,
            entry_fee,
        }
    }

    /// Resolve an exit within the candle, stop before target. A gap through
    /// a level exits at the open, not at the level.
    fn resolve_exit(trade: &OpenTrade, candle: &Candle) -> Option<(f64, ExitReason)> {
        match trade.side {
            PositionSide::Long => {
                if candle.open <= trade.stop_loss {
                    Some((candle.open, ExitReason::StopLoss))
                } else if candle.low <= trade.stop_loss {
                    Some((trade.stop_loss, ExitReason::StopLoss))
                } else if candle.open >= trade.take_profit {
                    Some((candle.open, ExitReason::TakeProfit))
                } else if candle.high >= trade.take_profit {
                    Some((trade.take_profit, ExitReason::TakeProfit))
                } else {
                    None
                }
            }
            PositionSide::Short => {
                if candle.open >= trade.stop_loss {
                    Some((candle.open, ExitReason::StopLoss))
                } else if candle.high >= trade.stop_loss {
                    Some((trade.stop_loss, ExitReason::StopLoss))
                } else if candle.open <= trade.take_profit {
                    Some((candle.open, ExitReason::TakeProfit))
                } else if candle.low <= trade.take_profit {
                    Some((trade.take_profit, ExitReason::TakeProfit))
                } else {
                    None
                }
            }
        }
    }

    /// Ratchet the trailing stop once the trigger ROE is reached; the stop
    /// trails the peak by half the stop-loss distance and never loosens
    fn ratchet_trailing(trade: &mut OpenTrade, candle: &Candle) {
        if !trade.strategy.use_trailing_stop {
            return;
        }
        if trade.roe_percent(candle.close) < trade.strategy.trailing_stop_trigger_percent {
            return;
        }
        let trail = trade.strategy.stop_loss_percent / 2.0 / 100.0;
        match trade.side {
            PositionSide::Long => {
                trade.peak = trade.peak.max(candle.high);
                trade.stop_loss = trade.stop_loss.max(trade.peak * (1.0 - trail));
            }
            PositionSide::Short => {
                trade.peak = trade.peak.min(candle.low);
                trade.stop_loss = trade.stop_loss.min(trade.peak * (1.0 + trail));
            }
        }
    }

    /// Realize a trade at `raw_price` with exit slippage and fee
    fn close_trade(
        &mut self,
        trade: OpenTrade,
        raw_price: f64,
        exit_time: DateTime<Utc>,
        reason: ExitReason,
    ) {
        let slip = self.config.slippage_percent / 100.0;
        let exit_price = raw_price * (1.0 - slip * trade.side.multiplier());
        let exit_fee = exit_price * trade.quantity * self.config.fee_percent / 100.0;
        let fees = trade.entry_fee + exit_fee;
        let gross = (exit_price - trade.entry_price)
            * trade.quantity
            * trade.side.multiplier();
        let pnl = gross - fees;
        let pnl_percent = if self.config.stake_amount > 0.0 {
            pnl / self.config.stake_amount * 100.0
        } else {
            0.0
        };

        self.balance += pnl;
        debug!(?reason, exit_price, pnl, "trade closed");
        self.trades.push(Trade {
            entry_time: trade.entry_time,
            exit_time,
            side: trade.side,
            entry_price: trade.entry_price,
            exit_price,
            quantity: trade.quantity,
            leverage: trade.leverage,
            pnl,
            pnl_percent,
            fees,
            exit_reason: reason,
        });
    }

    /// Calculate backtest results
    fn calculate_results(&self) -> Result<BacktestResult, BotError> {
        let total_return = self.balance - self.config.initial_balance;
        let total_return_percent = total_return / self.config.initial_balance * 100.0;

        let winning_trades = self.trades.iter().filter(|t| t.pnl > 0.0).count();
        let losing_trades = self.trades.iter().filter(|t| t.pnl < 0.0).count();
        let win_rate = if self.trades.is_empty() {
            0.0
        } else {
            winning_trades as f64 / self.trades.len() as f64 * 100.0
        };

        let avg_profit = if winning_trades > 0 {
            self.trades
                .iter()
                .filter(|t| t.pnl > 0.0)
                .map(|t| t.pnl)
                .sum::<f64>()
                / winning_trades as f64
        } else {
            0.0
        };
        let avg_loss = if losing_trades > 0 {
            self.trades
                .iter()
                .filter(|t| t.pnl < 0.0)
                .map(|t| t.pnl)
                .sum::<f64>()
                / losing_trades as f64
        } else {
            0.0
        };
        let total_fees = self.trades.iter().map(|t| t.fees).sum();

        let mut max_drawdown = 0.0f64;
        let mut peak = self.config.initial_balance;
        for &equity in &self.equity_curve {
            if equity > peak {
                peak = equity;
            }
            if peak > 0.0 {
                max_drawdown = max_drawdown.max((peak - equity) / peak);
            }
        }

        let sharpe_ratio = if self.trades.len() > 1 {
            let returns: Vec<f64> = self.trades.iter().map(|t| t.pnl_percent / 100.0).collect();
            let mean = returns.iter().sum::<f64>() / returns.len() as f64;
            let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>()
                / returns.len() as f64;
            let std_dev = variance.sqrt();
            if std_dev > 0.0 {
                mean / std_dev
            } else {
                0.0
            }
        } else {
            0.0
        };

        Ok(BacktestResult {
            start_balance: self.config.initial_balance,
            end_balance: self.balance,
            total_return,
            total_return_percent,
            num_trades: self.trades.len(),
            winning_trades,
            losing_trades,
            win_rate,
            avg_profit,
            avg_loss,
            total_fees,
            max_drawdown,
            sharpe_ratio,
            equity_curve: self.equity_curve.clone(),
        })
    }

    /// Completed trades, oldest first
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::collections::HashMap;

    fn candles(bars: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
        let base = Utc::now();
        bars.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| {
                Candle::new(
                    base + Duration::minutes(5 * i as i64),
                    open,
                    high,
                    low,
                    close,
                    1000.0,
                )
            })
            .collect()
    }

    fn long_decision() -> Decision {
        Decision {
            signal: Signal::long(0.9, "scripted".to_string(), 0),
            strategy: select_strategy(crate::market::MarketCondition::Range, 0.5, 20.0),
        }
    }

    /// Emits scripted decisions and records the history length it was shown
    struct ScriptedSource {
        script: HashMap<usize, Decision>,
        seen_lengths: Vec<usize>,
    }

    impl ScriptedSource {
        fn new(script: HashMap<usize, Decision>) -> Self {
            Self {
                script,
                seen_lengths: Vec::new(),
            }
        }
    }

    impl SignalSource for ScriptedSource {
        fn evaluate(&mut self, candles: &[Candle]) -> Result<Option<Decision>, BotError> {
            self.seen_lengths.push(candles.len());
            Ok(self.script.get(&(candles.len() - 1)).cloned())
        }
    }

    #[test]
    fn test_history_grows_one_candle_at_a_time() {
        let series = candles(&[(100.0, 101.0, 99.0, 100.0); 10]);
        let mut source = ScriptedSource::new(HashMap::new());
        let mut engine = BacktestEngine::new(BacktestConfig::default());
        engine.run(&mut source, &series).unwrap();

        // Every evaluation saw exactly one more candle than the previous one
        assert_eq!(source.seen_lengths, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn test_entry_fills_at_next_open() {
        let series = candles(&[
            (100.0, 101.0, 99.0, 100.0),
            (100.0, 101.0, 99.0, 100.0),
            (105.0, 106.0, 104.0, 105.5), // fill candle
            (105.5, 106.0, 105.0, 105.5),
        ]);
        let mut script = HashMap::new();
        script.insert(1, long_decision());
        let mut source = ScriptedSource::new(script);
        let mut engine = BacktestEngine::new(BacktestConfig::default());
        engine.run(&mut source, &series).unwrap();

        let trade = &engine.trades()[0];
        // Signal at index 1 fills at index 2's open, slipped upward
        let expected = 105.0 * (1.0 + 0.02 / 100.0);
        assert!((trade.entry_price - expected).abs() < 1e-9);
    }

    #[test]
    fn test_stop_loss_exit() {
        // Range tier: SL 2.5% below entry near 100
        let series = candles(&[
            (100.0, 100.5, 99.5, 100.0),
            (100.0, 100.5, 99.5, 100.0),
            (100.0, 100.5, 99.5, 100.0),
            (99.0, 99.5, 95.0, 95.5), // plunges through the stop
            (95.5, 96.0, 95.0, 95.5),
        ]);
        let mut script = HashMap::new();
        script.insert(1, long_decision());
        let mut source = ScriptedSource::new(script);
        let mut engine = BacktestEngine::new(BacktestConfig::default());
        let result = engine.run(&mut source, &series).unwrap();

        let trade = &engine.trades()[0];
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert!(trade.pnl < 0.0);
        assert_eq!(result.losing_trades, 1);
        assert!(result.end_balance < result.start_balance);
    }

    #[test]
    fn test_open_trade_force_closed_at_end() {
        let series = candles(&[
            (100.0, 100.5, 99.5, 100.0),
            (100.0, 100.5, 99.5, 100.0),
            (100.0, 100.6, 99.8, 100.5),
        ]);
        let mut script = HashMap::new();
        script.insert(1, long_decision());
        let mut source = ScriptedSource::new(script);
        let mut engine = BacktestEngine::new(BacktestConfig::default());
        let result = engine.run(&mut source, &series).unwrap();

        assert_eq!(result.num_trades, 1);
        assert_eq!(engine.trades()[0].exit_reason, ExitReason::EndOfData);
    }

    #[test]
    fn test_no_signals_no_trades() {
        let series = candles(&[(100.0, 101.0, 99.0, 100.0); 20]);
        let mut source = ScriptedSource::new(HashMap::new());
        let mut engine = BacktestEngine::new(BacktestConfig::default());
        let result = engine.run(&mut source, &series).unwrap();

        assert_eq!(result.num_trades, 0);
        assert_eq!(result.end_balance, result.start_balance);
        assert_eq!(result.total_fees, 0.0);
        assert_eq!(result.equity_curve.len(), 20);
    }

    #[test]
    fn test_fees_charged_both_sides() {
        let series = candles(&[
            (100.0, 100.5, 99.5, 100.0),
            (100.0, 100.5, 99.5, 100.0),
            (100.0, 100.5, 99.5, 100.0), // fill and hold
            (100.0, 100.5, 99.5, 100.0),
        ]);
        let mut script = HashMap::new();
        script.insert(1, long_decision());
        let mut source = ScriptedSource::new(script);
        let mut engine = BacktestEngine::new(BacktestConfig::default());
        let result = engine.run(&mut source, &series).unwrap();

        let trade = &engine.trades()[0];
        assert!(trade.fees > 0.0);
        // Flat market: the loss is slippage plus fees
        assert!(result.end_balance < result.start_balance);
    }
}
