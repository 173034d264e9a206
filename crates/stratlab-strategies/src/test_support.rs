use stratlab_core::traits::Strategy;
use stratlab_core::types::{Bar, BarSeries, Signal, Timeframe};

pub const DAY_MS: i64 = 86_400_000;

/// Flat-bodied bars at the given closes, one day apart.
pub fn closes_to_bars(prices: &[f64]) -> Vec<Bar> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &price)| Bar::new(i as i64 * DAY_MS, price, price + 1.0, price - 1.0, price, 1000.0))
        .collect()
}

/// Feed bars one at a time, as the runner does, collecting every signal
/// together with the index of the bar that produced it.
pub fn run_bars(strategy: &mut dyn Strategy, bars: &[Bar]) -> Vec<(usize, Signal)> {
    let mut series = BarSeries::new("TEST", Timeframe::Daily);
    let mut signals = Vec::new();
    for (i, bar) in bars.iter().enumerate() {
        series.push(*bar);
        if let Some(signal) = strategy.on_bar(&series) {
            signals.push((i, signal));
        }
    }
    signals
}

pub fn symbols() -> Vec<String> {
    vec!["TEST".to_string()]
}
