//! Backtesting engine.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use stratlab_core::error::{DataError, TradingError};
use stratlab_core::types::{Bar, Timeframe};
use stratlab_strategies::StrategyRegistry;
use tracing::{debug, info};

use crate::report::BacktestReport;
use crate::runner::{RunnerConfig, StrategyRunner};

/// Backtest configuration shared by every runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Starting capital of each runner's account
    pub initial_capital: Decimal,
    /// Commission per unit of volume
    pub commission: Decimal,
    /// Slippage percentage on market and stop fills
    pub slippage_pct: Decimal,
    /// Bar timeframe of the data
    pub timeframe: Timeframe,
    /// Bars of history kept per runner (0 = unlimited)
    pub history_capacity: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: dec!(100000),
            commission: Decimal::ZERO,
            slippage_pct: Decimal::ZERO,
            timeframe: Timeframe::Daily,
            history_capacity: 500,
        }
    }
}

/// Backtesting engine.
pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    /// Create a new backtest engine.
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Create and validate one runner per configured strategy instance.
    ///
    /// Fails on the first invalid configuration.
    pub fn build_runners(
        &self,
        configs: &[RunnerConfig],
        registry: &StrategyRegistry,
    ) -> Result<Vec<StrategyRunner>, TradingError> {
        configs
            .iter()
            .map(|config| StrategyRunner::from_config(config, registry, &self.config))
            .collect()
    }

    /// Run a backtest.
    ///
    /// Bars of all symbols are merged into one chronological feed; each bar
    /// goes to every runner trading its symbol.
    pub async fn run(
        &self,
        mut runners: Vec<StrategyRunner>,
        data: HashMap<String, Vec<Bar>>,
    ) -> Result<BacktestReport, TradingError> {
        if let Some(runner) = runners.iter().find(|r| !data.contains_key(r.symbol())) {
            return Err(DataError::SymbolNotFound(runner.symbol().to_string()).into());
        }

        let mut feed: Vec<(i64, &str, Bar)> = data
            .iter()
            .flat_map(|(symbol, bars)| bars.iter().map(move |bar| (bar.timestamp, symbol.as_str(), *bar)))
            .collect();
        feed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

        info!(
            runners = runners.len(),
            symbols = data.len(),
            bars = feed.len(),
            "backtest started"
        );

        for (_, symbol, bar) in feed {
            for runner in runners.iter_mut().filter(|r| r.symbol() == symbol) {
                runner.on_bar(bar).await;
            }
        }

        let mut runs = Vec::with_capacity(runners.len());
        for runner in runners {
            let run = runner.finish().await;
            debug!(
                strategy = %run.strategy,
                symbol = %run.symbol,
                trades = run.stats.total_trades,
                final_equity = %run.stats.final_equity,
                "runner finished"
            );
            runs.push(run);
        }

        info!(runs = runs.len(), "backtest finished");

        Ok(BacktestReport {
            config: self.config.clone(),
            runs,
        })
    }
}
