//! Order sizing and pre-trade risk checks

use crate::config::RiskConfig;
use crate::error::BotError;
use crate::portfolio::AccountBalance;

/// Risk manager: sizing plus validation before anything reaches the gateway
#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
}

impl RiskManager {
    /// Create new risk manager
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Current risk configuration
    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Replace the investment amount (presentation-layer command)
    pub fn set_investment_amount(&mut self, amount: f64) -> Result<(), BotError> {
        let mut next = self.config.clone();
        next.investment_amount = amount;
        next.validate()?;
        self.config = next;
        Ok(())
    }

    /// Replace the leverage (presentation-layer command)
    pub fn set_leverage(&mut self, leverage: f64) -> Result<(), BotError> {
        let mut next = self.config.clone();
        next.leverage = leverage;
        next.validate()?;
        self.config = next;
        Ok(())
    }

    /// Order quantity for an entry at `price`:
    /// investment amount × leverage / price.
    pub fn order_quantity(&self, price: f64) -> Result<f64, BotError> {
        self.config.validate()?;
        if price <= 0.0 {
            return Err(BotError::ConfigurationInvalid(format!(
                "entry price must be positive, got {}",
                price
            )));
        }
        Ok(self.config.investment_amount * self.config.leverage / price)
    }

    /// Check the account can cover the configured margin
    pub fn check_margin(&self, balance: &AccountBalance) -> Result<(), BotError> {
        if !balance.can_afford(self.config.investment_amount) {
            return Err(BotError::GatewayRejected(format!(
                "insufficient margin: need {:.2}, available {:.2}",
                self.config.investment_amount, balance.available
            )));
        }
        Ok(())
    }
}
