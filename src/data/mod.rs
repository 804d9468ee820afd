//! Data management module
//!
//! Handles OHLCV candle data storage, deduplication, and live updates.

pub mod candle;
pub mod store;

pub use candle::*;
pub use store::*;
