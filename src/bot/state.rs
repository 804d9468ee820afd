//! Bot lifecycle state machine

use serde::{Deserialize, Serialize};

/// Controller lifecycle state.
///
/// Normal cycle: `Idle → AwaitingSignal → PlacingOrder → PositionOpen →
/// Closing → Idle` (or back to `AwaitingSignal` when the bot keeps running
/// after a close). `Error` is terminal until an operator restarts the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotState {
    /// Not running
    Idle,
    /// Running, flat, evaluating signals
    AwaitingSignal,
    /// Entry order submitted, awaiting fill confirmation
    PlacingOrder,
    /// Position open, managing exits
    PositionOpen,
    /// Close order submitted, awaiting flat confirmation
    Closing,
    /// Unrecoverable fault; trading halted
    Error,
}

impl BotState {
    /// Whether the controller considers itself running
    pub fn is_running(&self) -> bool {
        !matches!(self, BotState::Idle | BotState::Error)
    }

    /// Whether a position is open or being closed
    pub fn has_exposure(&self) -> bool {
        matches!(self, BotState::PositionOpen | BotState::Closing)
    }
}

impl std::fmt::Display for BotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BotState::Idle => "idle",
            BotState::AwaitingSignal => "awaiting_signal",
            BotState::PlacingOrder => "placing_order",
            BotState::PositionOpen => "position_open",
            BotState::Closing => "closing",
            BotState::Error => "error",
        };
        write!(f, "{}", name)
    }
}
