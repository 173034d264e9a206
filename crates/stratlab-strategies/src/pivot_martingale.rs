//! Floor pivot bias strategy.
//!
//! The pivot of the previous bar sets the bias for the next one: an open
//! above it is long, an open below it is short. The bias is restated on
//! every bar so that a position stopped out by its bracket is re-entered
//! on the following bar, which is what martingale sizing expects.

use serde::{Deserialize, Serialize};
use stratlab_core::{
    error::StrategyError,
    traits::{Strategy, StrategyConfig, StrategyState},
    types::{BarSeries, Signal, SignalType},
};
use stratlab_indicators::PivotPoints;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PivotMartingaleConfig {
    /// Symbols to trade
    pub symbols: Vec<String>,
    /// Minimum distance between open and pivot, in price units
    pub min_distance: f64,
}

impl Default for PivotMartingaleConfig {
    fn default() -> Self {
        Self {
            symbols: vec![],
            min_distance: 0.0,
        }
    }
}

impl StrategyConfig for PivotMartingaleConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.min_distance < 0.0 {
            return Err(StrategyError::InvalidConfig(
                "Minimum distance cannot be negative".into(),
            ));
        }
        crate::require_symbols(&self.symbols)
    }

    fn symbols_mut(&mut self) -> &mut Vec<String> {
        &mut self.symbols
    }
}

pub struct PivotMartingaleStrategy {
    config: PivotMartingaleConfig,
    pivots: Option<PivotPoints>,
    bars_processed: usize,
    signals_generated: usize,
}

impl PivotMartingaleStrategy {
    pub fn new(config: PivotMartingaleConfig) -> Self {
        Self {
            config,
            pivots: None,
            bars_processed: 0,
            signals_generated: 0,
        }
    }
}

impl Strategy for PivotMartingaleStrategy {
    fn name(&self) -> &str {
        "Pivot Martingale"
    }

    fn on_bar(&mut self, series: &BarSeries) -> Option<Signal> {
        self.bars_processed += 1;

        if series.len() < self.warmup_period() {
            return None;
        }

        let pivots = PivotPoints::from_bar(series.back(1)?);
        self.pivots = Some(pivots);

        let bar = series.last()?;
        let distance = self.config.min_distance;
        let signal_type = if pivots.is_above(bar.open - distance) {
            SignalType::Buy
        } else if pivots.is_below(bar.open + distance) {
            SignalType::Sell
        } else {
            return None;
        };

        self.signals_generated += 1;
        Some(
            Signal::new(series.symbol.clone(), signal_type, bar.close, bar.timestamp)
                .with_metadata(
                    self.name(),
                    &[
                        ("pivot", pivots.pivot),
                        ("r1", pivots.r1),
                        ("s1", pivots.s1),
                        ("open", bar.open),
                    ],
                    format!("Open {:.5} vs pivot {:.5}", bar.open, pivots.pivot),
                ),
        )
    }

    fn reset(&mut self) {
        self.pivots = None;
        self.bars_processed = 0;
        self.signals_generated = 0;
    }

    fn state(&self) -> StrategyState {
        StrategyState {
            name: self.name().to_string(),
            is_warmed_up: self.bars_processed >= self.warmup_period(),
            bars_processed: self.bars_processed,
            signals_generated: self.signals_generated,
            indicators: [("pivot".to_string(), self.pivots.map_or(0.0, |p| p.pivot))]
                .into_iter()
                .collect(),
            custom: serde_json::json!({ "levels": self.pivots }),
        }
    }

    fn warmup_period(&self) -> usize {
        2
    }

    fn symbols(&self) -> &[String] {
        &self.config.symbols
    }
}
