//! Backtest runner: replays a JSON candle file through the signal pipeline
//!
//! Usage: `backtest <candles.json>` where the file holds an array of OHLCV
//! candles, oldest first. Cost parameters can be overridden through the
//! environment (`STAKE_AMOUNT`, `FEE_PERCENT`, `SLIPPAGE_PERCENT`).

use std::fs;

use anyhow::{Context, Result};
use tracing::info;

use coinscalp_rs::backtest::{BacktestConfig, BacktestEngine, BacktestReport, IndicatorSource};
use coinscalp_rs::config::{ClassifierConfig, SignalConfig};
use coinscalp_rs::data::Candle;

fn env_or(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: backtest <candles.json>")?;
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read candle file {}", path))?;
    let mut candles: Vec<Candle> =
        serde_json::from_str(&raw).context("failed to parse candle file")?;
    candles.sort_by_key(|c| c.timestamp);
    candles.dedup_by_key(|c| c.timestamp);
    info!(count = candles.len(), file = %path, "candles loaded");

    let defaults = BacktestConfig::default();
    let config = BacktestConfig {
        stake_amount: env_or("STAKE_AMOUNT", defaults.stake_amount),
        fee_percent: env_or("FEE_PERCENT", defaults.fee_percent),
        slippage_percent: env_or("SLIPPAGE_PERCENT", defaults.slippage_percent),
        ..defaults
    };

    let mut source = IndicatorSource::new(
        SignalConfig::default(),
        ClassifierConfig::default(),
        config.max_leverage,
    );
    let mut engine = BacktestEngine::new(config);
    let result = engine.run(&mut source, &candles)?;

    println!("{}", BacktestReport::new(result, engine.trades()).format());
    Ok(())
}
