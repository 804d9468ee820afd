//! Exchange gateway module
//!
//! The core never speaks a wire format; everything exchange-specific sits
//! behind the [`ExchangeGateway`] trait so live adapters and test mocks are
//! interchangeable.

pub mod gateway;
pub mod order;
pub mod retry;

pub use gateway::*;
pub use order::*;
pub use retry::*;
