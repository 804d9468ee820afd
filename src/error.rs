//! Error taxonomy shared by every component
//!
//! Recovery rules:
//! - [`BotError::DataUnavailable`] is non-fatal; callers fail closed to
//!   no-signal and the loop continues.
//! - [`BotError::GatewayTransient`] is retried with bounded exponential
//!   backoff before being surfaced.
//! - [`BotError::GatewayRejected`] is logged to the trade feed and the
//!   controller returns to awaiting-signal.
//! - [`BotError::InvariantViolation`] is never silently recovered; it halts
//!   the bot loop for that symbol.
//! - [`BotError::ConfigurationInvalid`] is rejected before anything is sent
//!   to the gateway.

use thiserror::Error;

/// Typed error for the trading core
#[derive(Debug, Error)]
pub enum BotError {
    /// Candle history is shorter than an indicator or rule requires
    #[error("insufficient data: {0}")]
    DataUnavailable(String),

    /// Network-level gateway failure, retriable
    #[error("gateway transient failure after {attempts} attempt(s): {message}")]
    GatewayTransient { attempts: u32, message: String },

    /// Exchange-side rejection (insufficient margin, bad symbol, ...)
    #[error("gateway rejected request: {0}")]
    GatewayRejected(String),

    /// A core invariant no longer holds; operator intervention required
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Configuration failed validation before reaching the gateway
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    /// A bot loop is already active for this symbol
    #[error("bot already running for {0}")]
    AlreadyRunning(String),
}

impl BotError {
    /// Whether the controller loop may continue after this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, BotError::InvariantViolation(_))
    }
}
