//! Configuration structures.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use stratlab_backtest::{BacktestConfig, BacktestEngine, RunnerConfig};
use stratlab_core::error::TradingError;
use stratlab_monitor::LogFormat;
use stratlab_strategies::StrategyRegistry;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub backtest: BacktestConfig,
    /// Strategy instances to run, one per instrument
    #[serde(default)]
    pub strategies: Vec<RunnerConfig>,
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "stratlab".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Where candle files live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Directory holding one `<SYMBOL>.csv` per instrument
    pub dir: PathBuf,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
        }
    }
}

impl AppConfig {
    /// Check every strategy instance the way a backtest would build it.
    pub fn validate(&self, registry: &StrategyRegistry) -> Result<(), TradingError> {
        if self.strategies.is_empty() {
            return Err(TradingError::Config("no strategies configured".into()));
        }
        BacktestEngine::new(self.backtest.clone()).build_runners(&self.strategies, registry)?;
        Ok(())
    }

    /// Distinct symbols traded by the configured strategies, in order.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = Vec::new();
        for runner in &self.strategies {
            if !symbols.contains(&runner.instrument.symbol) {
                symbols.push(runner.instrument.symbol.clone());
            }
        }
        symbols
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
