//! Bollinger band breakout strategy.
//!
//! A close that breaks out of the bands enters in the breakout direction,
//! either at market or with a stop order just beyond the band. A close back
//! across the middle band exits.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use stratlab_core::{
    error::StrategyError,
    traits::{Indicator, Strategy, StrategyConfig, StrategyState},
    types::{BarSeries, EntryOrder, Signal, SignalStrength, SignalType},
};
use stratlab_indicators::{BollingerBands, BollingerOutput};
use stratlab_signals::{crossed_above, crossed_below};

/// Configuration for the Bollinger breakout strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BollingerBreakoutConfig {
    /// Symbols to trade
    pub symbols: Vec<String>,
    /// Band period
    pub period: usize,
    /// Standard deviation multiplier
    pub std_dev: f64,
    /// Enter with a stop order beyond the band instead of at market
    pub use_stop_entry: bool,
    /// Distance beyond the band for stop entries, in price units
    pub entry_offset: f64,
}

impl Default for BollingerBreakoutConfig {
    fn default() -> Self {
        Self {
            symbols: vec![],
            period: 20,
            std_dev: 2.0,
            use_stop_entry: false,
            entry_offset: 0.0,
        }
    }
}

impl StrategyConfig for BollingerBreakoutConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.period < 2 {
            return Err(StrategyError::InvalidConfig(
                "BB period must be at least 2".into(),
            ));
        }
        if self.std_dev <= 0.0 {
            return Err(StrategyError::InvalidConfig(
                "BB std dev must be positive".into(),
            ));
        }
        if self.entry_offset < 0.0 {
            return Err(StrategyError::InvalidConfig(
                "Entry offset cannot be negative".into(),
            ));
        }
        crate::require_symbols(&self.symbols)
    }

    fn symbols_mut(&mut self) -> &mut Vec<String> {
        &mut self.symbols
    }
}

/// Bollinger band breakout strategy.
pub struct BollingerBreakoutStrategy {
    config: BollingerBreakoutConfig,
    bb: BollingerBands,
    prev: Option<(f64, BollingerOutput)>,
    bars_processed: usize,
    signals_generated: usize,
}

impl BollingerBreakoutStrategy {
    pub fn new(config: BollingerBreakoutConfig) -> Self {
        let bb = BollingerBands::new(config.period, config.std_dev);
        Self {
            config,
            bb,
            prev: None,
            bars_processed: 0,
            signals_generated: 0,
        }
    }

    /// Strength from how far %B sits outside the bands.
    fn classify_strength(percent_b: f64) -> SignalStrength {
        let excess = if percent_b > 1.0 {
            percent_b - 1.0
        } else if percent_b < 0.0 {
            -percent_b
        } else {
            0.0
        };

        if excess > 0.5 {
            SignalStrength::Strong
        } else if excess > 0.1 {
            SignalStrength::Moderate
        } else {
            SignalStrength::Weak
        }
    }

    fn entry_order(&self, price: f64) -> EntryOrder {
        if self.config.use_stop_entry {
            EntryOrder::Stop(price)
        } else {
            EntryOrder::Market
        }
    }

    fn evaluate(
        &self,
        prev_close: f64,
        prev: &BollingerOutput,
        close: f64,
        bb: &BollingerOutput,
    ) -> Option<(SignalType, EntryOrder, String)> {
        if crossed_above(prev_close, prev.upper, close, bb.upper) {
            Some((
                SignalType::Buy,
                self.entry_order(bb.upper_entry(self.config.entry_offset)),
                format!("Close ({close:.5}) broke above upper band ({:.5})", bb.upper),
            ))
        } else if crossed_below(prev_close, prev.lower, close, bb.lower) {
            Some((
                SignalType::Sell,
                self.entry_order(bb.lower_entry(self.config.entry_offset)),
                format!("Close ({close:.5}) broke below lower band ({:.5})", bb.lower),
            ))
        } else if crossed_below(prev_close, prev.middle, close, bb.middle) {
            Some((
                SignalType::CloseLong,
                EntryOrder::Market,
                format!("Close ({close:.5}) fell back below middle band ({:.5})", bb.middle),
            ))
        } else if crossed_above(prev_close, prev.middle, close, bb.middle) {
            Some((
                SignalType::CloseShort,
                EntryOrder::Market,
                format!("Close ({close:.5}) rose back above middle band ({:.5})", bb.middle),
            ))
        } else {
            None
        }
    }
}

impl Strategy for BollingerBreakoutStrategy {
    fn name(&self) -> &str {
        "Bollinger Breakout"
    }

    fn on_bar(&mut self, series: &BarSeries) -> Option<Signal> {
        self.bars_processed += 1;

        if series.len() < self.warmup_period() {
            return None;
        }

        let bb = self.bb.last(&series.closes())?;
        let bar = series.last()?;
        let (prev_close, prev_bb) = self.prev.replace((bar.close, bb))?;
        let (signal_type, entry, reason) = self.evaluate(prev_close, &prev_bb, bar.close, &bb)?;

        self.signals_generated += 1;
        Some(
            Signal::new(series.symbol.clone(), signal_type, bar.close, bar.timestamp)
                .with_entry(entry)
                .with_strength(Self::classify_strength(bb.percent_b))
                .with_metadata(
                    self.name(),
                    &[
                        ("upper_band", bb.upper),
                        ("middle_band", bb.middle),
                        ("lower_band", bb.lower),
                        ("percent_b", bb.percent_b),
                        ("bandwidth", bb.bandwidth),
                    ],
                    reason,
                ),
        )
    }

    fn reset(&mut self) {
        self.prev = None;
        self.bars_processed = 0;
        self.signals_generated = 0;
    }

    fn state(&self) -> StrategyState {
        let indicators: HashMap<String, f64> = self
            .prev
            .map(|(_, bb)| {
                [
                    ("upper_band".to_string(), bb.upper),
                    ("middle_band".to_string(), bb.middle),
                    ("lower_band".to_string(), bb.lower),
                    ("percent_b".to_string(), bb.percent_b),
                ]
                .into_iter()
                .collect()
            })
            .unwrap_or_default();

        StrategyState {
            name: self.name().to_string(),
            is_warmed_up: self.bars_processed >= self.warmup_period(),
            bars_processed: self.bars_processed,
            signals_generated: self.signals_generated,
            indicators,
            custom: serde_json::json!({
                "period": self.config.period,
                "std_dev": self.config.std_dev,
                "use_stop_entry": self.config.use_stop_entry,
            }),
        }
    }

    fn warmup_period(&self) -> usize {
        self.config.period
    }

    fn symbols(&self) -> &[String] {
        &self.config.symbols
    }
}
