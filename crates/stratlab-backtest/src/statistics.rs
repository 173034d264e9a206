//! Backtest statistics.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use stratlab_core::types::{Portfolio, Side};
use stratlab_risk::ExitTrigger;

/// Why a fill happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillReason {
    Entry,
    AddOn,
    SignalExit,
    StopLoss,
    TakeProfit,
    TrailingStop,
    Reversal,
    EndOfData,
}

impl From<ExitTrigger> for FillReason {
    fn from(trigger: ExitTrigger) -> Self {
        match trigger {
            ExitTrigger::StopLoss => FillReason::StopLoss,
            ExitTrigger::TakeProfit => FillReason::TakeProfit,
            ExitTrigger::TrailingStop => FillReason::TrailingStop,
        }
    }
}

impl FillReason {
    /// Exit forced by the bracket rather than by the strategy.
    pub fn is_protective(&self) -> bool {
        matches!(
            self,
            FillReason::StopLoss | FillReason::TakeProfit | FillReason::TrailingStop
        )
    }
}

impl std::fmt::Display for FillReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FillReason::Entry => "entry",
            FillReason::AddOn => "add-on",
            FillReason::SignalExit => "signal exit",
            FillReason::StopLoss => "stop-loss",
            FillReason::TakeProfit => "take-profit",
            FillReason::TrailingStop => "trailing stop",
            FillReason::Reversal => "reversal",
            FillReason::EndOfData => "end of data",
        };
        write!(f, "{s}")
    }
}

/// Record of a single fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub strategy: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
    pub reason: FillReason,
    /// Realized result of the round trip, set on the fill that went flat
    pub pnl: Option<Decimal>,
}

impl TradeRecord {
    /// Check whether this fill closed a round trip.
    pub fn is_close(&self) -> bool {
        self.pnl.is_some()
    }
}

/// Running and final statistics of one runner.
///
/// Equity is recorded once per bar; fills as they happen. [`finalize`]
/// derives the ratios once the feed is exhausted.
///
/// [`finalize`]: BacktestStats::finalize
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacktestStats {
    pub initial_capital: Decimal,
    pub final_equity: Decimal,
    pub total_return_pct: Decimal,
    pub annualized_return_pct: Decimal,
    /// Deepest fall from a running equity peak, in percent
    pub max_drawdown_pct: Decimal,
    /// Annualized, risk-free rate 0
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub total_fills: usize,
    /// Round trips, counted on the fill that went flat
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
    /// Round trips closed by stop-loss, take-profit or trailing stop
    pub protective_exits: usize,
    pub win_rate_pct: Decimal,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    /// Gross profit over gross loss; 0 when nothing was lost
    pub profit_factor: Decimal,
    pub bars_processed: usize,
    pub equity_curve: Vec<(i64, Decimal)>,
    pub trades: Vec<TradeRecord>,
    peak_equity: Decimal,
    bar_returns: Vec<f64>,
}

impl BacktestStats {
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            final_equity: initial_capital,
            peak_equity: initial_capital,
            ..Self::default()
        }
    }

    pub fn record_equity(&mut self, timestamp: i64, equity: Decimal) {
        if let Some(&(_, prev)) = self.equity_curve.last() {
            if prev > Decimal::ZERO {
                self.bar_returns.push(((equity - prev) / prev).to_f64().unwrap_or(0.0));
            }
        }
        self.equity_curve.push((timestamp, equity));
        self.bars_processed += 1;

        self.peak_equity = self.peak_equity.max(equity);
        if self.peak_equity > Decimal::ZERO {
            let drawdown = (self.peak_equity - equity) / self.peak_equity * dec!(100);
            self.max_drawdown_pct = self.max_drawdown_pct.max(drawdown);
        }
    }

    pub fn add_trade(&mut self, trade: TradeRecord) {
        self.total_fills += 1;
        self.total_trades += usize::from(trade.is_close());
        self.trades.push(trade);
    }

    /// Closed round trips, in order.
    pub fn closed_trades(&self) -> impl Iterator<Item = &TradeRecord> {
        self.trades.iter().filter(|t| t.is_close())
    }

    /// Derive returns, trade breakdown and risk ratios.
    ///
    /// `periods_per_year` is the number of bars in a year at the feed's
    /// timeframe.
    pub fn finalize(&mut self, portfolio: &Portfolio, periods_per_year: f64) {
        self.final_equity = portfolio.equity;
        if self.initial_capital > Decimal::ZERO {
            self.total_return_pct =
                (self.final_equity - self.initial_capital) / self.initial_capital * dec!(100);
        }
        if !self.equity_curve.is_empty() {
            let growth = 1.0 + self.total_return_pct.to_f64().unwrap_or(0.0) / 100.0;
            let years = self.equity_curve.len() as f64 / periods_per_year;
            let annualized = (growth.powf(1.0 / years) - 1.0) * 100.0;
            self.annualized_return_pct = Decimal::try_from(annualized).unwrap_or_default();
        }

        self.tally_trades();

        let scale = periods_per_year.sqrt();
        if let Some((mean, std_dev)) = mean_and_std(&self.bar_returns) {
            if std_dev > 0.0 {
                self.sharpe_ratio = mean * scale / std_dev;
            }
            if let Some(downside) = downside_deviation(&self.bar_returns) {
                self.sortino_ratio = mean * scale / downside;
            }
        }
    }

    fn tally_trades(&mut self) {
        let pnls: Vec<(Decimal, FillReason)> = self
            .closed_trades()
            .filter_map(|t| Some((t.pnl?, t.reason)))
            .collect();

        let gross_profit: Decimal = pnls.iter().map(|(p, _)| (*p).max(Decimal::ZERO)).sum();
        let gross_loss: Decimal = pnls.iter().map(|(p, _)| (-*p).max(Decimal::ZERO)).sum();

        self.winning_trades = pnls.iter().filter(|(p, _)| *p > Decimal::ZERO).count();
        self.losing_trades = pnls.iter().filter(|(p, _)| *p < Decimal::ZERO).count();
        self.breakeven_trades = pnls.len() - self.winning_trades - self.losing_trades;
        self.protective_exits = pnls.iter().filter(|(_, reason)| reason.is_protective()).count();

        if self.total_trades > 0 {
            self.win_rate_pct = Decimal::from(self.winning_trades * 100) / Decimal::from(self.total_trades);
        }
        if self.winning_trades > 0 {
            self.avg_win = gross_profit / Decimal::from(self.winning_trades);
        }
        if self.losing_trades > 0 {
            self.avg_loss = gross_loss / Decimal::from(self.losing_trades);
        }
        if gross_loss > Decimal::ZERO {
            self.profit_factor = gross_profit / gross_loss;
        }
    }
}

/// Mean and population standard deviation.
fn mean_and_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}

/// Root mean square of the losing returns. `None` without losses.
fn downside_deviation(returns: &[f64]) -> Option<f64> {
    let losses: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    if losses.is_empty() {
        return None;
    }
    let mean_square = losses.iter().map(|r| r * r).sum::<f64>() / losses.len() as f64;
    Some(mean_square.sqrt())
}
