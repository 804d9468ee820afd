//! Bot execution controller
//!
//! Drives the full trading loop over an [`crate::exchange::ExchangeGateway`]:
//! candle ingestion, signal evaluation, order placement, position management
//! with trailing stop, and a bounded in-memory trade log.

pub mod controller;
pub mod log;
pub mod state;

pub use controller::*;
pub use log::*;
pub use state::*;
