//! List strategies command.

use anyhow::Result;
use stratlab_strategies::StrategyRegistry;

pub fn run() -> Result<()> {
    let registry = StrategyRegistry::new();

    println!("Available Strategies");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for (id, info) in registry.list() {
        println!("  {} ({})", info.name, id);
        println!("  ───────────────────────────────────────────────────────");
        println!("  {}", info.description);
        println!("  defaults: {}", info.default_config);
        println!();
    }

    println!("Use `backtest --strategy <id> --symbol <SYMBOL>` to run one directly,");
    println!("or list instances under [[strategies]] in the configuration file.");

    Ok(())
}
