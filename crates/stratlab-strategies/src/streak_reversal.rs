//! Candle streak reversal strategy.
//!
//! After exactly `streak_length` consecutive bearish candles the strategy
//! buys; after the same number of bullish candles it sells. Longer streaks
//! do not repeat the signal.

use serde::{Deserialize, Serialize};
use stratlab_core::{
    error::StrategyError,
    traits::{Strategy, StrategyConfig, StrategyState},
    types::{Bar, BarSeries, Signal, SignalType},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakReversalConfig {
    /// Symbols to trade
    pub symbols: Vec<String>,
    /// Consecutive same-colour candles that trigger a reversal entry
    pub streak_length: usize,
}

impl Default for StreakReversalConfig {
    fn default() -> Self {
        Self {
            symbols: vec![],
            streak_length: 3,
        }
    }
}

impl StrategyConfig for StreakReversalConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.streak_length == 0 {
            return Err(StrategyError::InvalidConfig(
                "Streak length must be at least 1".into(),
            ));
        }
        crate::require_symbols(&self.symbols)
    }

    fn symbols_mut(&mut self) -> &mut Vec<String> {
        &mut self.symbols
    }
}

pub struct StreakReversalStrategy {
    config: StreakReversalConfig,
    bearish_streak: usize,
    bullish_streak: usize,
    bars_processed: usize,
    signals_generated: usize,
}

impl StreakReversalStrategy {
    pub fn new(config: StreakReversalConfig) -> Self {
        Self {
            config,
            bearish_streak: 0,
            bullish_streak: 0,
            bars_processed: 0,
            signals_generated: 0,
        }
    }

    /// Length of the run of candles matching `pred` ending at the newest bar,
    /// counted up to one past the trigger length.
    fn streak(&self, series: &BarSeries, pred: impl Fn(&Bar) -> bool) -> usize {
        series
            .iter()
            .rev()
            .take(self.config.streak_length + 1)
            .take_while(|bar| pred(bar))
            .count()
    }
}

impl Strategy for StreakReversalStrategy {
    fn name(&self) -> &str {
        "Streak Reversal"
    }

    fn on_bar(&mut self, series: &BarSeries) -> Option<Signal> {
        self.bars_processed += 1;

        if series.len() < self.warmup_period() {
            return None;
        }

        self.bearish_streak = self.streak(series, Bar::is_bearish);
        self.bullish_streak = self.streak(series, Bar::is_bullish);

        let n = self.config.streak_length;
        let (signal_type, reason) = if self.bearish_streak == n {
            (SignalType::Buy, format!("{n} consecutive bearish candles"))
        } else if self.bullish_streak == n {
            (SignalType::Sell, format!("{n} consecutive bullish candles"))
        } else {
            return None;
        };

        let bar = series.last()?;
        self.signals_generated += 1;
        Some(
            Signal::new(series.symbol.clone(), signal_type, bar.close, bar.timestamp)
                .with_metadata(self.name(), &[("streak", n as f64)], reason),
        )
    }

    fn reset(&mut self) {
        self.bearish_streak = 0;
        self.bullish_streak = 0;
        self.bars_processed = 0;
        self.signals_generated = 0;
    }

    fn state(&self) -> StrategyState {
        StrategyState {
            name: self.name().to_string(),
            is_warmed_up: self.bars_processed >= self.warmup_period(),
            bars_processed: self.bars_processed,
            signals_generated: self.signals_generated,
            indicators: [
                ("bearish_streak".to_string(), self.bearish_streak as f64),
                ("bullish_streak".to_string(), self.bullish_streak as f64),
            ]
            .into_iter()
            .collect(),
            custom: serde_json::json!({ "streak_length": self.config.streak_length }),
        }
    }

    fn warmup_period(&self) -> usize {
        self.config.streak_length
    }

    fn symbols(&self) -> &[String] {
        &self.config.symbols
    }
}
