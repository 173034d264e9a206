//! stratlab command line application.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use stratlab_config::{load_config, AppConfig};
use stratlab_monitor::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing file falls back to defaults; a broken one is fatal
    let config: Option<AppConfig> = if cli.config.exists() {
        Some(
            load_config(&cli.config)
                .with_context(|| format!("failed to load {}", cli.config.display()))?,
        )
    } else {
        None
    };

    let logging = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    let level = cli
        .log_level
        .map(|l| l.as_str().to_string())
        .unwrap_or(logging.level);
    setup_logging(&level, cli.log_format.unwrap_or(logging.format))?;

    match cli.command {
        Commands::Backtest(args) => {
            cli::commands::backtest::run(args, config.unwrap_or_default()).await
        }
        Commands::Strategies => cli::commands::strategies::run(),
        Commands::ValidateConfig(args) => cli::commands::validate::run(&cli.config, config, args),
    }
}
