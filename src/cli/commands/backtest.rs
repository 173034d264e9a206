//! Backtest command implementation.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;
use stratlab_backtest::{BacktestEngine, RunnerConfig};
use stratlab_config::AppConfig;
use stratlab_core::types::{Bar, Instrument};
use stratlab_strategies::StrategyRegistry;
use tracing::info;

use crate::cli::{BacktestArgs, OutputFormat};

/// Replace the configured runners with the one given on the command line.
fn apply_overrides(config: &mut AppConfig, args: &BacktestArgs) -> Result<()> {
    if let Some(capital) = args.capital {
        config.backtest.initial_capital = capital;
    }
    if let Some(timeframe) = args.timeframe {
        config.backtest.timeframe = timeframe;
    }

    let (Some(strategy), Some(symbol)) = (&args.strategy, &args.symbol) else {
        return Ok(());
    };
    let params = match &args.params {
        Some(json) => serde_json::from_str(json).context("--params is not valid JSON")?,
        None => serde_json::json!({}),
    };

    // Keep instrument metadata and risk settings from a matching configured runner
    let template = config
        .strategies
        .iter()
        .find(|r| r.instrument.symbol == *symbol)
        .cloned();
    let runner = match template {
        Some(template) => RunnerConfig {
            strategy: strategy.clone(),
            params,
            ..template
        },
        None => RunnerConfig {
            strategy: strategy.clone(),
            params,
            instrument: Instrument::new(symbol.clone()),
            bracket: Default::default(),
            volume: Default::default(),
            window: None,
        },
    };
    config.strategies = vec![runner];
    Ok(())
}

async fn load_data(path: &Path, symbols: &[String]) -> Result<HashMap<String, Vec<Bar>>> {
    if path.is_file() {
        let [symbol] = symbols else {
            bail!(
                "a single data file can only feed one symbol, but {} are configured",
                symbols.len()
            );
        };
        let bars = stratlab_data::load_csv(path)
            .await
            .with_context(|| format!("failed to load {}", path.display()))?;
        return Ok(HashMap::from([(symbol.clone(), bars)]));
    }

    if !path.is_dir() {
        bail!(
            "Data path '{}' does not exist. Provide a CSV file or a directory of <SYMBOL>.csv files",
            path.display()
        );
    }
    Ok(stratlab_data::load_symbols(path, symbols).await?)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "written");
    Ok(())
}

pub async fn run(args: BacktestArgs, mut config: AppConfig) -> Result<()> {
    apply_overrides(&mut config, &args)?;

    let registry = StrategyRegistry::new();
    config
        .validate(&registry)
        .context("invalid backtest configuration")?;

    let engine = BacktestEngine::new(config.backtest.clone());
    let runners = engine.build_runners(&config.strategies, &registry)?;

    let data_path = args.data.clone().unwrap_or_else(|| config.data.dir.clone());
    let data = load_data(&data_path, &config.symbols()).await?;
    info!(symbols = data.len(), runners = runners.len(), "starting backtest");

    let report = engine.run(runners, data).await?;

    match args.output {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => println!("{}", report.summary()),
    }

    if let Some(path) = &args.save {
        write_file(path, &report.to_json()?)?;
    }
    if let Some(path) = &args.equity_csv {
        write_file(path, &report.equity_to_csv())?;
    }
    if let Some(path) = &args.trades_csv {
        write_file(path, &report.trades_to_csv())?;
    }

    Ok(())
}
