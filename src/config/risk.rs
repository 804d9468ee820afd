//! Risk management configuration

use serde::{Deserialize, Serialize};

use crate::error::BotError;

/// Risk management configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Capital committed per entry, in quote currency
    pub investment_amount: f64,
    /// Leverage applied to new positions
    pub leverage: f64,
    /// Hard leverage ceiling (exchange maximum)
    pub max_leverage: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            investment_amount: 100.0,
            leverage: 3.0,
            max_leverage: 20.0,
        }
    }
}

impl RiskConfig {
    /// Validate before anything reaches the gateway
    pub fn validate(&self) -> Result<(), BotError> {
        if self.investment_amount <= 0.0 {
            return Err(BotError::ConfigurationInvalid(format!(
                "investment amount must be positive, got {}",
                self.investment_amount
            )));
        }
        if self.leverage < 1.0 || self.leverage > self.max_leverage {
            return Err(BotError::ConfigurationInvalid(format!(
                "leverage {} outside [1, {}]",
                self.leverage, self.max_leverage
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leverage_bounds() {
        let mut config = RiskConfig::default();
        assert!(config.validate().is_ok());

        config.leverage = 50.0;
        assert!(matches!(
            config.validate(),
            Err(BotError::ConfigurationInvalid(_))
        ));

        config.leverage = 0.5;
        assert!(config.validate().is_err());
    }
}
