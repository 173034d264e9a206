//! Backtesting engine.
//!
//! A [`StrategyRunner`] binds one strategy to one instrument with its own
//! bracket, volume sizing and paper account. The [`BacktestEngine`] feeds
//! historical bars to all runners in time order and collects their reports.

mod engine;
mod report;
mod runner;
mod statistics;

pub use engine::{BacktestConfig, BacktestEngine};
pub use report::{BacktestReport, RunReport};
pub use runner::{RunnerConfig, StrategyRunner};
pub use statistics::{BacktestStats, FillReason, TradeRecord};
