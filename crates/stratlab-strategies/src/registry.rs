//! Strategy registry for creating strategies by name.

use crate::{
    BollingerBreakoutConfig, BollingerBreakoutStrategy, MACrossoverConfig, MACrossoverStrategy,
    MacdHistogramConfig, MacdHistogramStrategy, PivotMartingaleConfig, PivotMartingaleStrategy,
    RsiThresholdConfig, RsiThresholdStrategy, StreakReversalConfig, StreakReversalStrategy,
    SupertrendVolumeConfig, SupertrendVolumeStrategy,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use stratlab_core::{error::StrategyError, traits::Strategy, traits::StrategyConfig};
use tracing::debug;

/// Information about a registered strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInfo {
    /// Strategy name
    pub name: String,
    /// Strategy description
    pub description: String,
    /// Default configuration as JSON
    pub default_config: serde_json::Value,
}

/// Registry for available trading strategies, keyed by id.
pub struct StrategyRegistry {
    strategies: BTreeMap<String, StrategyInfo>,
}

fn info<C: Serialize + Default>(name: &str, description: &str) -> StrategyInfo {
    StrategyInfo {
        name: name.to_string(),
        description: description.to_string(),
        default_config: serde_json::to_value(C::default()).unwrap_or_default(),
    }
}

fn boxed<C, S>(
    params: serde_json::Value,
    symbols: Vec<String>,
    make: impl FnOnce(C) -> S,
) -> Result<Box<dyn Strategy>, StrategyError>
where
    C: StrategyConfig,
    S: Strategy + 'static,
{
    Ok(Box::new(make(C::from_params(params, symbols)?)))
}

impl StrategyRegistry {
    /// Create a new strategy registry with all built-in strategies.
    pub fn new() -> Self {
        let strategies = [
            (
                "ma_crossover",
                info::<MACrossoverConfig>(
                    "MA Crossover",
                    "Generates signals based on fast/slow moving average crossovers",
                ),
            ),
            (
                "rsi_threshold",
                info::<RsiThresholdConfig>(
                    "RSI Threshold",
                    "Enters when RSI leaves an overbought/oversold zone, exits at the opposite level",
                ),
            ),
            (
                "bollinger_breakout",
                info::<BollingerBreakoutConfig>(
                    "Bollinger Breakout",
                    "Enters on a close outside the Bollinger bands, exits at the middle band",
                ),
            ),
            (
                "macd_histogram",
                info::<MacdHistogramConfig>(
                    "MACD Histogram",
                    "Trades five-colour MACD histogram momentum turns at a configurable signal bar",
                ),
            ),
            (
                "supertrend_volume",
                info::<SupertrendVolumeConfig>(
                    "Supertrend Volume",
                    "Enters on Supertrend flips confirmed by above-average volume",
                ),
            ),
            (
                "pivot_martingale",
                info::<PivotMartingaleConfig>(
                    "Pivot Martingale",
                    "Takes the side of the open relative to the previous bar's floor pivot",
                ),
            ),
            (
                "streak_reversal",
                info::<StreakReversalConfig>(
                    "Streak Reversal",
                    "Fades a run of consecutive same-colour candles",
                ),
            ),
        ]
        .into_iter()
        .map(|(id, info)| (id.to_string(), info))
        .collect();

        Self { strategies }
    }

    /// List all available strategies, ordered by id.
    pub fn list(&self) -> Vec<(&str, &StrategyInfo)> {
        self.strategies
            .iter()
            .map(|(id, info)| (id.as_str(), info))
            .collect()
    }

    /// Create a strategy instance from JSON parameters.
    ///
    /// Missing parameters take their defaults; `symbols` always overrides
    /// whatever the parameters carry.
    pub fn create(
        &self,
        name: &str,
        params: serde_json::Value,
        symbols: Vec<String>,
    ) -> Result<Box<dyn Strategy>, StrategyError> {
        debug!(strategy = name, %params, "creating strategy");
        match name {
            "ma_crossover" => boxed(params, symbols, MACrossoverStrategy::new),
            "rsi_threshold" => boxed(params, symbols, RsiThresholdStrategy::new),
            "bollinger_breakout" => boxed(params, symbols, BollingerBreakoutStrategy::new),
            "macd_histogram" => boxed(params, symbols, MacdHistogramStrategy::new),
            "supertrend_volume" => boxed(params, symbols, SupertrendVolumeStrategy::new),
            "pivot_martingale" => boxed(params, symbols, PivotMartingaleStrategy::new),
            "streak_reversal" => boxed(params, symbols, StreakReversalStrategy::new),
            _ => Err(StrategyError::NotFound(name.to_string())),
        }
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
