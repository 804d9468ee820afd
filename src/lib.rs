//! CoinScalp-RS: the computational and control core of a short-horizon
//! scalping bot.
//!
//! # Features
//!
//! - **Candle Store**: ordered, deduplicated OHLCV series per symbol/interval
//! - **Indicator Engine**: RSI(14), EMA(9/21/50/200), Bollinger Bands(20,2)
//! - **Market Classifier**: trend/range/volatility regime with confidence
//! - **Strategy Selector**: TP/SL/leverage/trailing-stop per market regime
//! - **Signal Generator**: multi-timeframe confluence entry signals
//! - **Bot Controller**: polling state machine driving an exchange gateway
//! - **Backtesting**: causal historical replay with slippage and fees
//!
//! Everything exchange-specific lives behind the [`exchange::ExchangeGateway`]
//! trait; the core never talks to a wire format directly.
//!
//! # Example
//!
//! ```no_run
//! use coinscalp_rs::prelude::*;
//!
//! let candles: Vec<Candle> = Vec::new(); // load history
//! let mut engine = BacktestEngine::new(BacktestConfig::default());
//! let mut source = IndicatorSource::new(
//!     SignalConfig::default(),
//!     ClassifierConfig::default(),
//!     20.0,
//! );
//! let result = engine.run(&mut source, &candles).unwrap();
//! println!("{}", BacktestReport::new(result, engine.trades()).format());
//! ```

pub mod backtest;
pub mod bot;
pub mod config;
pub mod data;
pub mod error;
pub mod exchange;
pub mod indicators;
pub mod market;
pub mod portfolio;
pub mod strategy;

// Re-export commonly used types
pub mod prelude {
    pub use crate::backtest::*;
    pub use crate::bot::*;
    pub use crate::config::*;
    pub use crate::data::*;
    pub use crate::error::BotError;
    pub use crate::exchange::*;
    pub use crate::indicators::*;
    pub use crate::market::*;
    pub use crate::portfolio::*;
    pub use crate::strategy::*;

    pub use anyhow::{Context, Result};
}

/// Result type alias
pub type Result<T> = anyhow::Result<T>;
