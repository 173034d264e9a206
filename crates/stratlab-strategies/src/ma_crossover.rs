//! Fast/slow moving-average crossover.

use serde::{Deserialize, Serialize};
use stratlab_core::{
    error::StrategyError,
    traits::{Strategy, StrategyConfig, StrategyState},
    types::{BarSeries, Signal, SignalStrength, SignalType},
};
use stratlab_indicators::MaKind;
use stratlab_signals::Cross;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MACrossoverConfig {
    pub symbols: Vec<String>,
    pub fast_period: usize,
    pub slow_period: usize,
    /// Averaging used for both lines
    pub ma_kind: MaKind,
    /// Smallest fast/slow gap, as a fraction of the slow line, that still
    /// counts as a crossover
    pub signal_threshold: f64,
}

impl Default for MACrossoverConfig {
    fn default() -> Self {
        Self {
            symbols: vec![],
            fast_period: 12,
            slow_period: 26,
            ma_kind: MaKind::Ema,
            signal_threshold: 0.0,
        }
    }
}

impl StrategyConfig for MACrossoverConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        let problem = if self.fast_period == 0 {
            Some("fast_period must be positive")
        } else if self.fast_period >= self.slow_period {
            Some("fast_period must be shorter than slow_period")
        } else if self.signal_threshold < 0.0 {
            Some("signal_threshold cannot be negative")
        } else {
            None
        };
        match problem {
            Some(msg) => Err(StrategyError::InvalidConfig(msg.into())),
            None => crate::require_symbols(&self.symbols),
        }
    }

    fn symbols_mut(&mut self) -> &mut Vec<String> {
        &mut self.symbols
    }
}

/// Buys when the fast line crosses above the slow one and sells on the
/// opposite cross.
pub struct MACrossoverStrategy {
    config: MACrossoverConfig,
    /// (fast, slow) on the previous bar
    lines: Option<(f64, f64)>,
    bars_processed: usize,
    signals_generated: usize,
}

impl MACrossoverStrategy {
    pub fn new(config: MACrossoverConfig) -> Self {
        Self {
            config,
            lines: None,
            bars_processed: 0,
            signals_generated: 0,
        }
    }

    fn line(&self, closes: &[f64], period: usize) -> Option<f64> {
        self.config.ma_kind.compute(closes, period).last().copied()
    }
}

fn gap_strength(gap: f64) -> SignalStrength {
    match gap {
        g if g > 0.02 => SignalStrength::Strong,
        g if g > 0.01 => SignalStrength::Moderate,
        _ => SignalStrength::Weak,
    }
}

impl Strategy for MACrossoverStrategy {
    fn name(&self) -> &str {
        "MA Crossover"
    }

    fn on_bar(&mut self, series: &BarSeries) -> Option<Signal> {
        self.bars_processed += 1;

        if series.len() < self.warmup_period() {
            return None;
        }

        let closes = series.closes();
        let fast = self.line(&closes, self.config.fast_period)?;
        let slow = self.line(&closes, self.config.slow_period)?;
        let previous = self.lines.replace((fast, slow));

        let (prev_fast, prev_slow) = previous?;
        let cross = Cross::detect(prev_fast, prev_slow, fast, slow)?;
        let gap = if slow == 0.0 { 0.0 } else { ((fast - slow) / slow).abs() };
        if gap < self.config.signal_threshold {
            debug!(gap, threshold = self.config.signal_threshold, "crossover too shallow");
            return None;
        }

        let bar = series.last()?;
        let (signal_type, verb) = match cross {
            Cross::Above => (SignalType::Buy, "above"),
            Cross::Below => (SignalType::Sell, "below"),
        };
        let reason = format!("fast MA {fast:.5} crossed {verb} slow MA {slow:.5}");

        self.signals_generated += 1;
        Some(
            Signal::new(series.symbol.clone(), signal_type, bar.close, bar.timestamp)
                .with_strength(gap_strength(gap))
                .with_confidence(gap)
                .with_metadata(
                    self.name(),
                    &[("fast_ma", fast), ("slow_ma", slow), ("crossover_magnitude", gap)],
                    reason,
                ),
        )
    }

    fn reset(&mut self) {
        self.lines = None;
        self.bars_processed = 0;
        self.signals_generated = 0;
    }

    fn state(&self) -> StrategyState {
        StrategyState {
            name: self.name().to_string(),
            is_warmed_up: self.bars_processed >= self.warmup_period(),
            bars_processed: self.bars_processed,
            signals_generated: self.signals_generated,
            indicators: self
                .lines
                .map(|(fast, slow)| [("fast_ma".to_string(), fast), ("slow_ma".to_string(), slow)])
                .into_iter()
                .flatten()
                .collect(),
            custom: serde_json::json!({
                "fast_period": self.config.fast_period,
                "slow_period": self.config.slow_period,
                "ma_kind": self.config.ma_kind,
            }),
        }
    }

    fn warmup_period(&self) -> usize {
        self.config.slow_period
    }

    fn symbols(&self) -> &[String] {
        &self.config.symbols
    }
}
