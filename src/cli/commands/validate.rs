//! Validate configuration command.

use anyhow::{bail, Context, Result};
use std::path::Path;
use stratlab_config::AppConfig;
use stratlab_strategies::StrategyRegistry;

use crate::cli::ValidateArgs;

pub fn run(config_path: &Path, config: Option<AppConfig>, args: ValidateArgs) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    let Some(config) = config else {
        bail!("configuration file {} not found", config_path.display());
    };

    config
        .validate(&StrategyRegistry::new())
        .context("Configuration error")?;

    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Log level: {}", config.logging.level);
    println!("Data directory: {}", config.data.dir.display());
    println!("Initial capital: {}", config.backtest.initial_capital);
    println!("Timeframe: {}", config.backtest.timeframe);
    for runner in &config.strategies {
        println!(
            "  {} on {} (stop {} / take {} / trail {} pips)",
            runner.strategy,
            runner.instrument.symbol,
            runner.bracket.stop_loss_pips,
            runner.bracket.take_profit_pips,
            runner.bracket.trailing_stop_pips,
        );
    }

    if args.print {
        println!();
        println!("{}", config.to_toml()?);
    }

    Ok(())
}
