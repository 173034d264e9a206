//! Backtest report generation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stratlab_core::traits::StrategyState;
use stratlab_core::types::Portfolio;

use crate::{BacktestConfig, BacktestStats};

const RULE: &str = "───────────────────────────────────────────────────────────\n";
const DOUBLE_RULE: &str = "═══════════════════════════════════════════════════════════\n";

/// Result of one runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub strategy: String,
    pub symbol: String,
    /// Statistics
    pub stats: BacktestStats,
    /// Final account state
    pub final_portfolio: Portfolio,
    /// Strategy state after the last bar
    pub state: StrategyState,
}

/// Complete backtest report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Configuration used
    pub config: BacktestConfig,
    /// One entry per runner, in configuration order
    pub runs: Vec<RunReport>,
}

impl RunReport {
    /// Net realized result over all closed trades.
    pub fn net_pnl(&self) -> Decimal {
        self.stats.closed_trades().filter_map(|t| t.pnl).sum()
    }

    fn write_summary(&self, s: &mut String) {
        let stats = &self.stats;

        s.push_str(&format!("{} on {}\n", self.strategy, self.symbol));
        s.push_str(RULE);

        s.push_str("PERFORMANCE\n");
        s.push_str(&format!("  Initial Capital:     {:.2}\n", stats.initial_capital));
        s.push_str(&format!("  Final Equity:        {:.2}\n", stats.final_equity));
        s.push_str(&format!("  Net PnL:             {:.5}\n", self.net_pnl()));
        s.push_str(&format!("  Total Return:        {:.2}%\n", stats.total_return_pct));
        s.push_str(&format!("  Annualized Return:   {:.2}%\n", stats.annualized_return_pct));
        s.push_str(&format!("  Max Drawdown:        {:.2}%\n", stats.max_drawdown_pct));
        s.push('\n');

        s.push_str("RISK METRICS\n");
        s.push_str(&format!("  Sharpe Ratio:        {:.2}\n", stats.sharpe_ratio));
        s.push_str(&format!("  Sortino Ratio:       {:.2}\n", stats.sortino_ratio));
        s.push_str(&format!("  Profit Factor:       {:.2}\n", stats.profit_factor));
        s.push('\n');

        s.push_str("TRADE STATISTICS\n");
        s.push_str(&format!("  Total Trades:        {}\n", stats.total_trades));
        s.push_str(&format!("  Winning Trades:      {}\n", stats.winning_trades));
        s.push_str(&format!("  Losing Trades:       {}\n", stats.losing_trades));
        s.push_str(&format!("  Breakeven Trades:    {}\n", stats.breakeven_trades));
        s.push_str(&format!("  Protective Exits:    {}\n", stats.protective_exits));
        s.push_str(&format!("  Win Rate:            {:.2}%\n", stats.win_rate_pct));
        s.push_str(&format!("  Avg Win:             {:.5}\n", stats.avg_win));
        s.push_str(&format!("  Avg Loss:            {:.5}\n", stats.avg_loss));
        s.push('\n');

        s.push_str("EXECUTION\n");
        s.push_str(&format!("  Bars Processed:      {}\n", stats.bars_processed));
        s.push_str(&format!("  Fills:               {}\n", stats.total_fills));
        s.push_str(&format!("  Signals Generated:   {}\n", self.state.signals_generated));
        s.push('\n');
    }
}

impl BacktestReport {
    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let mut s = String::new();

        s.push_str(DOUBLE_RULE);
        s.push_str("                     BACKTEST REPORT                        \n");
        s.push_str(DOUBLE_RULE);
        s.push('\n');

        for run in &self.runs {
            run.write_summary(&mut s);
        }

        s.push_str(DOUBLE_RULE);
        s
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export the equity curves as CSV.
    pub fn equity_to_csv(&self) -> String {
        let mut csv = String::from("strategy,symbol,timestamp,equity\n");
        for run in &self.runs {
            for (ts, equity) in &run.stats.equity_curve {
                csv.push_str(&format!("{},{},{},{}\n", run.strategy, run.symbol, ts, equity));
            }
        }
        csv
    }

    /// Export every fill as CSV.
    pub fn trades_to_csv(&self) -> String {
        let mut csv = String::from("strategy,symbol,timestamp,side,quantity,price,reason,pnl\n");
        for trade in self.runs.iter().flat_map(|r| &r.stats.trades) {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{}\n",
                trade.strategy,
                trade.symbol,
                trade.timestamp.to_rfc3339(),
                trade.side,
                trade.quantity,
                trade.price,
                trade.reason,
                trade.pnl.map(|p| p.to_string()).unwrap_or_default(),
            ));
        }
        csv
    }
}
