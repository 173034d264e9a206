//! Strategy contracts.

use crate::error::StrategyError;
use crate::types::{BarSeries, Order, Signal};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parameters of one strategy, read from a runner's JSON `params` table.
pub trait StrategyConfig: DeserializeOwned + Clone + Send + Sync + 'static {
    fn validate(&self) -> Result<(), StrategyError>;

    fn symbols_mut(&mut self) -> &mut Vec<String>;

    /// Deserialize `params`, bind the runner's symbols and validate.
    ///
    /// Keys missing from `params` keep their defaults as long as the config
    /// is declared `#[serde(default)]`.
    fn from_params(params: serde_json::Value, symbols: Vec<String>) -> Result<Self, StrategyError> {
        let mut config: Self = serde_json::from_value(params)
            .map_err(|e| StrategyError::InvalidConfig(e.to_string()))?;
        *config.symbols_mut() = symbols;
        config.validate()?;
        Ok(config)
    }
}

/// Snapshot reported for monitoring and `--format json` output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyState {
    pub name: String,
    pub is_warmed_up: bool,
    pub bars_processed: usize,
    pub signals_generated: usize,
    /// Latest indicator readings by name
    pub indicators: HashMap<String, f64>,
    pub custom: serde_json::Value,
}

/// A bar-driven signal generator.
///
/// The runner hands over the growing series once per closed bar and acts on
/// the returned signal. Strategies never place orders or manage stops; order
/// routing and the protective bracket belong to the runner.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    /// Look at the newest bar of `series` and maybe emit a signal.
    fn on_bar(&mut self, series: &BarSeries) -> Option<Signal>;

    /// Told about every fill of an order the runner placed on this
    /// strategy's behalf.
    fn on_fill(&mut self, _order: &Order) {}

    /// Forget all history. The runner calls this before every run.
    fn reset(&mut self);

    fn state(&self) -> StrategyState;

    /// Bars required before `on_bar` can produce a signal.
    fn warmup_period(&self) -> usize;

    fn symbols(&self) -> &[String];
}
