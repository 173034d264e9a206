//! Supertrend flip with volume confirmation.
//!
//! A Supertrend direction change on above-average volume enters in the new
//! direction. A flip on ordinary volume only closes the position that the
//! flip goes against.

use serde::{Deserialize, Serialize};
use stratlab_core::{
    error::StrategyError,
    traits::{Indicator, Strategy, StrategyConfig, StrategyState},
    types::{BarSeries, Signal, SignalStrength, SignalType},
};
use stratlab_indicators::{Sma, Supertrend, SupertrendOutput};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupertrendVolumeConfig {
    /// Symbols to trade
    pub symbols: Vec<String>,
    /// ATR period for the Supertrend bands
    pub atr_period: usize,
    /// ATR multiplier for the Supertrend bands
    pub multiplier: f64,
    /// Bars in the volume average, not counting the signal bar
    pub volume_period: usize,
    /// Signal bar volume must exceed the average times this
    pub volume_multiplier: f64,
}

impl Default for SupertrendVolumeConfig {
    fn default() -> Self {
        Self {
            symbols: vec![],
            atr_period: 10,
            multiplier: 3.0,
            volume_period: 20,
            volume_multiplier: 1.5,
        }
    }
}

impl StrategyConfig for SupertrendVolumeConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.atr_period == 0 || self.volume_period == 0 {
            return Err(StrategyError::InvalidConfig(
                "Periods must be greater than 0".into(),
            ));
        }
        if self.multiplier <= 0.0 {
            return Err(StrategyError::InvalidConfig(
                "Supertrend multiplier must be positive".into(),
            ));
        }
        if self.volume_multiplier < 0.0 {
            return Err(StrategyError::InvalidConfig(
                "Volume multiplier cannot be negative".into(),
            ));
        }
        crate::require_symbols(&self.symbols)
    }

    fn symbols_mut(&mut self) -> &mut Vec<String> {
        &mut self.symbols
    }
}

pub struct SupertrendVolumeStrategy {
    config: SupertrendVolumeConfig,
    supertrend: Supertrend,
    volume_sma: Sma,
    last: Option<SupertrendOutput>,
    bars_processed: usize,
    signals_generated: usize,
}

impl SupertrendVolumeStrategy {
    pub fn new(config: SupertrendVolumeConfig) -> Self {
        let supertrend = Supertrend::new(config.atr_period, config.multiplier);
        let volume_sma = Sma::new(config.volume_period);
        Self {
            config,
            supertrend,
            volume_sma,
            last: None,
            bars_processed: 0,
            signals_generated: 0,
        }
    }
}

impl Strategy for SupertrendVolumeStrategy {
    fn name(&self) -> &str {
        "Supertrend Volume"
    }

    fn on_bar(&mut self, series: &BarSeries) -> Option<Signal> {
        self.bars_processed += 1;

        if series.len() < self.warmup_period() {
            return None;
        }

        let outputs =
            self.supertrend
                .compute_hlc(&series.highs(), &series.lows(), &series.closes());
        let current = *outputs.last()?;
        self.last = Some(current);

        let previous = outputs.len().checked_sub(2).map(|i| outputs[i])?;
        if !current.flipped_from(&previous) {
            return None;
        }

        let bar = series.last()?;
        let volumes = series.volumes();
        let prior = &volumes[..volumes.len() - 1];
        let average = self.volume_sma.last(prior)?;
        let ratio = if average > 0.0 { bar.volume / average } else { 0.0 };
        let confirmed = ratio > self.config.volume_multiplier;

        debug!(
            trending_up = current.trending_up,
            volume_ratio = ratio,
            confirmed,
            "supertrend flip"
        );

        let (signal_type, reason) = match (current.trending_up, confirmed) {
            (true, true) => (SignalType::Buy, "Supertrend flipped up on high volume"),
            (false, true) => (SignalType::Sell, "Supertrend flipped down on high volume"),
            (true, false) => (SignalType::CloseShort, "Supertrend flipped up without volume"),
            (false, false) => (SignalType::CloseLong, "Supertrend flipped down without volume"),
        };
        let strength = if ratio > 2.0 * self.config.volume_multiplier {
            SignalStrength::Strong
        } else if confirmed {
            SignalStrength::Moderate
        } else {
            SignalStrength::Weak
        };

        self.signals_generated += 1;
        Some(
            Signal::new(series.symbol.clone(), signal_type, bar.close, bar.timestamp)
                .with_strength(strength)
                .with_metadata(
                    self.name(),
                    &[
                        ("supertrend", current.value),
                        ("volume", bar.volume),
                        ("volume_average", average),
                        ("volume_ratio", ratio),
                    ],
                    reason,
                ),
        )
    }

    fn reset(&mut self) {
        self.last = None;
        self.bars_processed = 0;
        self.signals_generated = 0;
    }

    fn state(&self) -> StrategyState {
        StrategyState {
            name: self.name().to_string(),
            is_warmed_up: self.bars_processed >= self.warmup_period(),
            bars_processed: self.bars_processed,
            signals_generated: self.signals_generated,
            indicators: [(
                "supertrend".to_string(),
                self.last.map_or(0.0, |o| o.value),
            )]
            .into_iter()
            .collect(),
            custom: serde_json::json!({
                "trending_up": self.last.map(|o| o.trending_up),
            }),
        }
    }

    /// Two Supertrend readings and a full volume average before the signal bar.
    fn warmup_period(&self) -> usize {
        (self.supertrend.warmup() + 1).max(self.volume_sma.warmup() + 1)
    }

    fn symbols(&self) -> &[String] {
        &self.config.symbols
    }
}
