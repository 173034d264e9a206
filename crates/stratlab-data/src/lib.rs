//! Historical candle data.
//!
//! Bars are read from CSV files whose headers may follow any of the common
//! export conventions (lower/upper case names, MetaTrader `<DATE>` style,
//! separate date and time columns).

mod csv_source;

pub use csv_source::CsvDataSource;

use std::collections::HashMap;
use std::path::Path;
use stratlab_core::error::DataError;
use stratlab_core::types::Bar;
use tracing::info;

/// Load bars from a CSV file off the async runtime.
pub async fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Bar>, DataError> {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || CsvDataSource::new(&path)?.load())
        .await
        .map_err(|e| DataError::ParseError(e.to_string()))?
}

/// Load `<dir>/<SYMBOL>.csv` for every symbol.
pub async fn load_symbols(
    dir: impl AsRef<Path>,
    symbols: &[String],
) -> Result<HashMap<String, Vec<Bar>>, DataError> {
    let dir = dir.as_ref();
    let mut data = HashMap::with_capacity(symbols.len());

    for symbol in symbols {
        if data.contains_key(symbol) {
            continue;
        }
        let path = dir.join(format!("{symbol}.csv"));
        if !path.exists() {
            return Err(DataError::SymbolNotFound(symbol.clone()));
        }
        let bars = load_csv(&path).await?;
        info!(%symbol, bars = bars.len(), path = %path.display(), "loaded candles");
        data.insert(symbol.clone(), bars);
    }

    Ok(data)
}
