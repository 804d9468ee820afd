//! Bot execution controller configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{RiskConfig, SignalConfig};

/// Bot execution controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Signal evaluation cadence in seconds
    pub signal_poll_secs: u64,
    /// Position refresh cadence while a position is open
    pub position_refresh_open_secs: u64,
    /// Position refresh cadence while flat (reduces gateway load)
    pub position_refresh_idle_secs: u64,
    /// How many candles to request per fetch
    pub candle_fetch_limit: usize,
    /// Order status checks before an ambiguous placement is treated as failed
    pub max_order_checks: u32,
    /// Gateway retry attempts for transient failures
    pub max_gateway_retries: u32,
    /// Initial backoff between retries, in milliseconds
    pub retry_backoff_ms: u64,
    /// Trade log ring capacity; oldest entries evicted first
    pub max_log_entries: usize,
    /// Signal generation settings
    pub signal: SignalConfig,
    /// Sizing and leverage settings
    pub risk: RiskConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            signal_poll_secs: 3,
            position_refresh_open_secs: 2,
            position_refresh_idle_secs: 10,
            candle_fetch_limit: 250,
            max_order_checks: 5,
            max_gateway_retries: 3,
            retry_backoff_ms: 500,
            max_log_entries: 500,
            signal: SignalConfig::default(),
            risk: RiskConfig::default(),
        }
    }
}

impl BotConfig {
    /// Signal evaluation interval
    pub fn signal_poll(&self) -> Duration {
        Duration::from_secs(self.signal_poll_secs)
    }

    /// Position refresh interval for the given state
    pub fn position_refresh(&self, position_open: bool) -> Duration {
        if position_open {
            Duration::from_secs(self.position_refresh_open_secs)
        } else {
            Duration::from_secs(self.position_refresh_idle_secs)
        }
    }
}
