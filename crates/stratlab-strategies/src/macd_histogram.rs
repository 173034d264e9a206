//! MACD histogram colour strategy.
//!
//! Each histogram bar is classified into one of five colours. The strategy
//! acts when the colour family `signal_bar` bars ago differs from the one
//! before it: a turn to rising momentum buys, a turn to falling momentum
//! sells (or only closes the long when shorts are disabled).

use serde::{Deserialize, Serialize};
use stratlab_core::{
    error::StrategyError,
    traits::{Indicator, Strategy, StrategyConfig, StrategyState},
    types::{BarSeries, Signal, SignalType},
};
use stratlab_indicators::Macd;
use stratlab_signals::{HistogramColor, SignalBarEvaluator};

/// Configuration for the MACD histogram strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdHistogramConfig {
    /// Symbols to trade
    pub symbols: Vec<String>,
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
    /// Closed bars back to evaluate (0 = newest)
    pub signal_bar: usize,
    /// Sell on a bearish turn; otherwise only close longs
    pub allow_short: bool,
}

impl Default for MacdHistogramConfig {
    fn default() -> Self {
        Self {
            symbols: vec![],
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
            signal_bar: 1,
            allow_short: true,
        }
    }
}

impl StrategyConfig for MacdHistogramConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.fast_period == 0 || self.signal_period == 0 {
            return Err(StrategyError::InvalidConfig(
                "MACD periods must be greater than 0".into(),
            ));
        }
        if self.fast_period >= self.slow_period {
            return Err(StrategyError::InvalidConfig(
                "Fast period must be less than slow period".into(),
            ));
        }
        crate::require_symbols(&self.symbols)
    }

    fn symbols_mut(&mut self) -> &mut Vec<String> {
        &mut self.symbols
    }
}

pub struct MacdHistogramStrategy {
    config: MacdHistogramConfig,
    macd: Macd,
    evaluator: SignalBarEvaluator<HistogramColor>,
    last_histogram: Option<f64>,
    last_color: Option<HistogramColor>,
    bars_processed: usize,
    signals_generated: usize,
}

impl MacdHistogramStrategy {
    pub fn new(config: MacdHistogramConfig) -> Self {
        let macd = Macd::new(
            config.fast_period,
            config.slow_period,
            config.signal_period,
        );
        let evaluator = SignalBarEvaluator::new(config.signal_bar);
        Self {
            config,
            macd,
            evaluator,
            last_histogram: None,
            last_color: None,
            bars_processed: 0,
            signals_generated: 0,
        }
    }
}

impl Strategy for MacdHistogramStrategy {
    fn name(&self) -> &str {
        "MACD Histogram"
    }

    fn on_bar(&mut self, series: &BarSeries) -> Option<Signal> {
        self.bars_processed += 1;

        if series.len() < self.warmup_period() {
            return None;
        }

        let histogram = self.macd.histogram(&series.closes());
        let current = *histogram.last()?;
        let previous = histogram.len().checked_sub(2).map(|i| histogram[i]);
        let color = HistogramColor::classify(previous, current);

        self.last_histogram = Some(current);
        self.last_color = Some(color);

        let reading = self.evaluator.update(color)?;
        let (signal_type, reason) = if reading.turned_bullish() {
            (SignalType::Buy, "histogram momentum turned up")
        } else if reading.turned_bearish() {
            if self.config.allow_short {
                (SignalType::Sell, "histogram momentum turned down")
            } else {
                (SignalType::CloseLong, "histogram momentum turned down")
            }
        } else {
            return None;
        };

        // Report the bar the decision was taken on, not the newest one
        let signal_bar = self.config.signal_bar;
        let signal_value = histogram[histogram.len().checked_sub(1 + signal_bar)?];
        let signal_color = self.evaluator.history().get(signal_bar)?;

        let bar = series.last()?;
        self.signals_generated += 1;
        Some(
            Signal::new(series.symbol.clone(), signal_type, bar.close, bar.timestamp)
                .with_metadata(
                    self.name(),
                    &[
                        ("histogram", signal_value),
                        ("color", signal_color.code() as f64),
                        ("signal_bar", signal_bar as f64),
                    ],
                    format!("{reason} {} bar(s) ago", self.config.signal_bar),
                ),
        )
    }

    fn reset(&mut self) {
        self.evaluator.reset();
        self.last_histogram = None;
        self.last_color = None;
        self.bars_processed = 0;
        self.signals_generated = 0;
    }

    fn state(&self) -> StrategyState {
        StrategyState {
            name: self.name().to_string(),
            is_warmed_up: self.bars_processed >= self.warmup_period(),
            bars_processed: self.bars_processed,
            signals_generated: self.signals_generated,
            indicators: [("histogram".to_string(), self.last_histogram.unwrap_or(0.0))]
                .into_iter()
                .collect(),
            custom: serde_json::json!({
                "color": self.last_color,
                "signal_bar": self.config.signal_bar,
                "history_len": self.evaluator.history().len(),
            }),
        }
    }

    /// One extra bar so the first histogram value has a predecessor.
    fn warmup_period(&self) -> usize {
        self.macd.warmup() + 1
    }

    fn symbols(&self) -> &[String] {
        &self.config.symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{closes_to_bars, run_bars, symbols};

    fn wave(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| 100.0 + 5.0 * (i as f64 * std::f64::consts::TAU / 24.0).sin())
            .collect()
    }

    fn config(signal_bar: usize) -> MacdHistogramConfig {
        MacdHistogramConfig {
            symbols: symbols(),
            fast_period: 3,
            slow_period: 6,
            signal_period: 3,
            signal_bar,
            allow_short: true,
        }
    }

    fn signals_for(config: MacdHistogramConfig, prices: &[f64]) -> Vec<(usize, SignalType)> {
        let mut strategy = MacdHistogramStrategy::new(config);
        run_bars(&mut strategy, &closes_to_bars(prices))
            .into_iter()
            .map(|(i, s)| (i, s.signal_type))
            .collect()
    }

    #[test]
    fn test_config_validation() {
        assert!(config(1).validate().is_ok());

        let bad = MacdHistogramConfig {
            fast_period: 10,
            slow_period: 6,
            ..config(1)
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_wave_alternates_buys_and_sells() {
        let signals = signals_for(config(0), &wave(120));

        assert!(signals.len() >= 4);
        for pair in signals.windows(2) {
            assert_ne!(pair[0].1, pair[1].1, "momentum turns must alternate");
        }
        assert!(signals.iter().any(|(_, t)| *t == SignalType::Buy));
        assert!(signals.iter().any(|(_, t)| *t == SignalType::Sell));
    }

    #[test]
    fn test_signal_bar_delays_by_exact_bar_count() {
        let prices = wave(120);
        let immediate = signals_for(config(0), &prices);
        let delayed = signals_for(config(2), &prices);

        let expected: Vec<_> = immediate
            .iter()
            .filter(|(i, _)| i + 2 < prices.len())
            .map(|(i, t)| (i + 2, *t))
            .collect();
        assert_eq!(delayed, expected);
    }

    #[test]
    fn test_long_only_closes_instead_of_selling() {
        let config = MacdHistogramConfig {
            allow_short: false,
            ..config(0)
        };
        let signals = signals_for(config, &wave(120));

        assert!(signals.iter().any(|(_, t)| *t == SignalType::CloseLong));
        assert!(signals.iter().all(|(_, t)| *t != SignalType::Sell));
    }

    #[test]
    fn test_metadata_describes_signal_bar() {
        let prices = wave(120);
        let mut strategy = MacdHistogramStrategy::new(config(2));
        let signals = run_bars(&mut strategy, &closes_to_bars(&prices));
        assert!(!signals.is_empty());

        let histogram = Macd::new(3, 6, 3).histogram(&prices);
        let first_bar = prices.len() - histogram.len();
        for (i, signal) in &signals {
            let at = i - 2 - first_bar;
            let color = HistogramColor::classify(Some(histogram[at - 1]), histogram[at]);

            assert_eq!(signal.metadata.indicators["histogram"], histogram[at]);
            assert_eq!(signal.metadata.indicators["color"], color.code() as f64);
            assert_ne!(signal.metadata.indicators["histogram"], histogram[i - first_bar]);
        }
    }

    #[test]
    fn test_reset_twice_clears_history() {
        let mut strategy = MacdHistogramStrategy::new(config(1));
        run_bars(&mut strategy, &closes_to_bars(&wave(40)));
        assert!(!strategy.evaluator.history().is_empty());

        strategy.reset();
        strategy.reset();

        assert!(strategy.evaluator.history().is_empty());
        assert!(strategy.last_color.is_none());
        assert_eq!(strategy.bars_processed, 0);
    }
}
