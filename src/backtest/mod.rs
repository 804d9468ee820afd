//! Backtesting module
//!
//! Replays historical candles through the same classifier, selector and
//! generator the live bot runs, with strict causality: a decision at candle
//! `i` sees candles `0..=i` only and fills at the open of candle `i + 1`.

pub mod engine;
pub mod metrics;
pub mod report;

pub use engine::*;
pub use metrics::*;
pub use report::*;
