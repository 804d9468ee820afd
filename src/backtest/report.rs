//! Backtest report formatting
//!
//! Summarizes a finished run: account outcome, trade quality metrics,
//! direction split and how positions were exited.

use crate::backtest::{BacktestResult, ExitReason, MetricsCalculator, Trade};
use crate::portfolio::PositionSide;

/// Aggregated view of a backtest run, ready for display
#[derive(Debug)]
pub struct BacktestReport {
    result: BacktestResult,
    profit_factor: f64,
    expectancy: f64,
    peak_equity: f64,
    long_trades: usize,
    short_trades: usize,
    take_profit_exits: usize,
    stop_loss_exits: usize,
    end_of_data_exits: usize,
}

impl BacktestReport {
    /// Build the report from the run result and its trade list
    pub fn new(result: BacktestResult, trades: &[Trade]) -> Self {
        let profit_factor = MetricsCalculator::profit_factor(&result);
        let expectancy = MetricsCalculator::expectancy(&result);
        let peak_equity = result
            .equity_curve
            .iter()
            .copied()
            .fold(result.start_balance, f64::max);
        let long_trades = trades
            .iter()
            .filter(|t| t.side == PositionSide::Long)
            .count();
        let count_exit = |reason: ExitReason| {
            trades.iter().filter(|t| t.exit_reason == reason).count()
        };

        Self {
            profit_factor,
            expectancy,
            peak_equity,
            long_trades,
            short_trades: trades.len() - long_trades,
            take_profit_exits: count_exit(ExitReason::TakeProfit),
            stop_loss_exits: count_exit(ExitReason::StopLoss),
            end_of_data_exits: count_exit(ExitReason::EndOfData),
            result,
        }
    }

    /// Format report as string
    pub fn format(&self) -> String {
        let r = &self.result;
        format!(
            r#"
Backtest Results
================
Account
  Starting balance   ${:.2}
  Ending balance     ${:.2}
  Net return         ${:.2} ({:+.2}%)
  Peak equity        ${:.2}
  Max drawdown       {:.2}%
  Fees paid          ${:.2}

Trades
  Total              {} ({} long / {} short)
  Wins / losses      {} / {} (win rate {:.2}%)
  Avg win / loss     ${:.2} / ${:.2}
  Profit factor      {:.2}
  Expectancy         ${:.2}
  Sharpe ratio       {:.2}

Exits
  Take profit        {}
  Stop loss          {}
  End of data        {}
"#,
            r.start_balance,
            r.end_balance,
            r.total_return,
            r.total_return_percent,
            self.peak_equity,
            r.max_drawdown * 100.0,
            r.total_fees,
            r.num_trades,
            self.long_trades,
            self.short_trades,
            r.winning_trades,
            r.losing_trades,
            r.win_rate,
            r.avg_profit,
            r.avg_loss,
            self.profit_factor,
            self.expectancy,
            r.sharpe_ratio,
            self.take_profit_exits,
            self.stop_loss_exits,
            self.end_of_data_exits,
        )
    }

    /// Get result reference
    pub fn result(&self) -> &BacktestResult {
        &self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn trade(side: PositionSide, pnl: f64, exit_reason: ExitReason) -> Trade {
        Trade {
            entry_time: Utc::now(),
            exit_time: Utc::now(),
            side,
            entry_price: 100.0,
            exit_price: 100.0 + pnl,
            quantity: 1.0,
            leverage: 3.0,
            pnl,
            pnl_percent: pnl,
            fees: 0.1,
            exit_reason,
        }
    }

    fn result() -> BacktestResult {
        BacktestResult {
            start_balance: 10_000.0,
            end_balance: 10_050.0,
            total_return: 50.0,
            total_return_percent: 0.5,
            num_trades: 3,
            winning_trades: 2,
            losing_trades: 1,
            win_rate: 66.67,
            avg_profit: 40.0,
            avg_loss: -30.0,
            total_fees: 0.3,
            max_drawdown: 0.01,
            sharpe_ratio: 0.4,
            equity_curve: vec![10_000.0, 10_080.0, 10_050.0],
        }
    }

    #[test]
    fn test_report_breaks_down_sides_and_exits() {
        let trades = vec![
            trade(PositionSide::Long, 40.0, ExitReason::TakeProfit),
            trade(PositionSide::Short, 40.0, ExitReason::TakeProfit),
            trade(PositionSide::Long, -30.0, ExitReason::StopLoss),
        ];
        let report = BacktestReport::new(result(), &trades);
        let text = report.format();

        assert!(text.contains("Backtest Results"));
        assert!(text.contains("3 (2 long / 1 short)"));
        assert!(text.contains("Take profit        2"));
        assert!(text.contains("Stop loss          1"));
        assert!(text.contains("End of data        0"));
        // Peak comes from the equity curve, not the ending balance
        assert!(text.contains("Peak equity        $10080.00"));
    }
}
