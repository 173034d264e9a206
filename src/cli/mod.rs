//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;
use stratlab_core::types::Timeframe;
use stratlab_monitor::LogFormat;

#[derive(Parser)]
#[command(name = "stratlab")]
#[command(author, version, about = "Indicator-driven strategies with bracket risk management")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", env = "STRATLAB_CONFIG")]
    pub config: PathBuf,

    /// Log level (overrides the configuration file)
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Log format: pretty, compact or json (overrides the configuration file)
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the configured strategies over historical candles
    Backtest(BacktestArgs),
    /// List available strategies and their default parameters
    Strategies,
    /// Validate configuration
    ValidateConfig(ValidateArgs),
}

#[derive(Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    /// Run only this strategy instead of the configured ones
    #[arg(short, long, requires = "symbol")]
    pub strategy: Option<String>,

    /// Symbol for --strategy
    #[arg(short = 'S', long)]
    pub symbol: Option<String>,

    /// Strategy parameters as JSON for --strategy
    #[arg(long, requires = "strategy")]
    pub params: Option<String>,

    /// Candle CSV file, or a directory of <SYMBOL>.csv files
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Initial capital per runner
    #[arg(long)]
    pub capital: Option<Decimal>,

    /// Bar timeframe of the data (1m, 5m, 1h, 1d, ...)
    #[arg(short, long)]
    pub timeframe: Option<Timeframe>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Save the JSON report to a file
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Write equity curves as CSV
    #[arg(long)]
    pub equity_csv: Option<PathBuf>,

    /// Write all fills as CSV
    #[arg(long)]
    pub trades_csv: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Print the effective configuration as TOML
    #[arg(long)]
    pub print: bool,
}
