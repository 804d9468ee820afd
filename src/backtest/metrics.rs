//! Backtest performance metrics

use crate::backtest::BacktestResult;

/// Calculate additional metrics from backtest result
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Calculate profit factor (gross profit / gross loss)
    pub fn profit_factor(result: &BacktestResult) -> f64 {
        let gross_loss = (result.avg_loss * result.losing_trades as f64).abs();
        if gross_loss == 0.0 {
            return 0.0;
        }
        (result.avg_profit * result.winning_trades as f64).abs() / gross_loss
    }

    /// Calculate expectancy per trade
    pub fn expectancy(result: &BacktestResult) -> f64 {
        if result.num_trades == 0 {
            return 0.0;
        }
        (result.win_rate / 100.0 * result.avg_profit)
            - ((100.0 - result.win_rate) / 100.0 * result.avg_loss.abs())
    }

    /// Calculate return on investment
    pub fn roi(result: &BacktestResult) -> f64 {
        result.total_return_percent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(
        winning_trades: usize,
        losing_trades: usize,
        avg_profit: f64,
        avg_loss: f64,
    ) -> BacktestResult {
        let num_trades = winning_trades + losing_trades;
        BacktestResult {
            start_balance: 10_000.0,
            end_balance: 10_000.0,
            total_return: 0.0,
            total_return_percent: 0.0,
            num_trades,
            winning_trades,
            losing_trades,
            win_rate: winning_trades as f64 / num_trades as f64 * 100.0,
            avg_profit,
            avg_loss,
            total_fees: 0.0,
            max_drawdown: 0.0,
            sharpe_ratio: 0.0,
            equity_curve: Vec::new(),
        }
    }

    #[test]
    fn test_profit_factor() {
        let result = result_with(6, 4, 50.0, -25.0);
        // 300 gross profit / 100 gross loss
        assert!((MetricsCalculator::profit_factor(&result) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_expectancy_no_trades() {
        let mut result = result_with(1, 1, 10.0, -10.0);
        result.num_trades = 0;
        assert_eq!(MetricsCalculator::expectancy(&result), 0.0);
    }
}
