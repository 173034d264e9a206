//! RSI threshold strategy.
//!
//! Enters when RSI leaves an extreme zone (crosses back above oversold or
//! below overbought) and exits when it reaches the opposite level.

use serde::{Deserialize, Serialize};
use stratlab_core::{
    error::StrategyError,
    traits::{Indicator, Strategy, StrategyConfig, StrategyState},
    types::{BarSeries, Signal, SignalStrength, SignalType},
};
use stratlab_indicators::Rsi;
use stratlab_signals::{crossed_above, crossed_below};
use tracing::trace;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiThresholdConfig {
    pub symbols: Vec<String>,
    pub period: usize,
    /// Overbought level: short entry on the way down, long exit on the way up
    pub overbought: f64,
    /// Oversold level: long entry on the way up, short exit on the way down
    pub oversold: f64,
    pub allow_short: bool,
}

impl Default for RsiThresholdConfig {
    fn default() -> Self {
        Self {
            symbols: vec![],
            period: 14,
            overbought: 70.0,
            oversold: 30.0,
            allow_short: true,
        }
    }
}

impl StrategyConfig for RsiThresholdConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        let invalid = |msg: &str| Err(StrategyError::InvalidConfig(msg.into()));
        if self.period < 2 {
            return invalid("period must be at least 2");
        }
        if !(0.0..=100.0).contains(&self.oversold) || !(0.0..=100.0).contains(&self.overbought) {
            return invalid("RSI levels must lie in 0..=100");
        }
        if self.overbought <= self.oversold {
            return invalid("overbought must be above oversold");
        }
        crate::require_symbols(&self.symbols)
    }

    fn symbols_mut(&mut self) -> &mut Vec<String> {
        &mut self.symbols
    }
}

pub struct RsiThresholdStrategy {
    config: RsiThresholdConfig,
    rsi: Rsi,
    prev_rsi: Option<f64>,
    bars_processed: usize,
    signals_generated: usize,
}

impl RsiThresholdStrategy {
    pub fn new(config: RsiThresholdConfig) -> Self {
        let rsi = Rsi::new(config.period);
        Self {
            config,
            rsi,
            prev_rsi: None,
            bars_processed: 0,
            signals_generated: 0,
        }
    }

    /// Strength grows with distance from the 50 midline.
    fn classify_strength(rsi: f64) -> SignalStrength {
        match (rsi - 50.0).abs() {
            d if d >= 30.0 => SignalStrength::Strong,
            d if d >= 20.0 => SignalStrength::Moderate,
            _ => SignalStrength::Weak,
        }
    }

    /// Which level, if any, the RSI crossed between `prev` and `current`.
    fn evaluate(&self, prev: f64, current: f64) -> Option<(SignalType, String)> {
        let RsiThresholdConfig {
            oversold,
            overbought,
            allow_short,
            ..
        } = self.config;

        if crossed_above(prev, oversold, current, oversold) {
            Some((
                SignalType::Buy,
                format!("RSI ({current:.1}) crossed above oversold level ({oversold:.1})"),
            ))
        } else if allow_short && crossed_below(prev, overbought, current, overbought) {
            Some((
                SignalType::Sell,
                format!("RSI ({current:.1}) crossed below overbought level ({overbought:.1})"),
            ))
        } else if crossed_above(prev, overbought, current, overbought) {
            Some((
                SignalType::CloseLong,
                format!("RSI ({current:.1}) reached overbought exit level ({overbought:.1})"),
            ))
        } else if allow_short && crossed_below(prev, oversold, current, oversold) {
            Some((
                SignalType::CloseShort,
                format!("RSI ({current:.1}) reached oversold exit level ({oversold:.1})"),
            ))
        } else {
            None
        }
    }
}

impl Strategy for RsiThresholdStrategy {
    fn name(&self) -> &str {
        "RSI Threshold"
    }

    fn on_bar(&mut self, series: &BarSeries) -> Option<Signal> {
        self.bars_processed += 1;

        if series.len() < self.warmup_period() {
            return None;
        }

        let current_rsi = match self.rsi.try_last(&series.closes()) {
            Ok(value) => value,
            Err(err) => {
                trace!(%err, "rsi not ready");
                return None;
            }
        };
        let prev_rsi = self.prev_rsi.replace(current_rsi)?;
        let (signal_type, reason) = self.evaluate(prev_rsi, current_rsi)?;
        let bar = series.last()?;

        self.signals_generated += 1;
        Some(
            Signal::new(series.symbol.clone(), signal_type, bar.close, bar.timestamp)
                .with_strength(Self::classify_strength(current_rsi))
                .with_metadata(self.name(), &[("rsi", current_rsi)], reason),
        )
    }

    fn reset(&mut self) {
        self.prev_rsi = None;
        self.bars_processed = 0;
        self.signals_generated = 0;
    }

    fn state(&self) -> StrategyState {
        StrategyState {
            name: self.name().to_string(),
            is_warmed_up: self.bars_processed >= self.warmup_period(),
            bars_processed: self.bars_processed,
            signals_generated: self.signals_generated,
            indicators: [("rsi".to_string(), self.prev_rsi.unwrap_or(50.0))]
                .into_iter()
                .collect(),
            custom: serde_json::json!({
                "overbought": self.config.overbought,
                "oversold": self.config.oversold,
                "allow_short": self.config.allow_short,
            }),
        }
    }

    fn warmup_period(&self) -> usize {
        self.rsi.warmup()
    }

    fn symbols(&self) -> &[String] {
        &self.config.symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{closes_to_bars, run_bars, symbols};

    /// Ten falling closes, six rising, five falling. With period 5 the RSI
    /// goes 0, 20, 36 (long entry), up to 73.8 (long exit), back down
    /// through 59 (short entry) and 24.2 (short exit).
    fn swing() -> Vec<f64> {
        let mut prices: Vec<f64> = (0..10).map(|i| 100.0 - i as f64).collect();
        prices.extend((0..6).map(|i| 92.0 + i as f64));
        prices.extend((0..5).map(|i| 96.0 - i as f64));
        prices
    }

    fn config(allow_short: bool) -> RsiThresholdConfig {
        RsiThresholdConfig {
            symbols: symbols(),
            period: 5,
            allow_short,
            ..Default::default()
        }
    }

    #[test]
    fn test_config_validation() {
        let mut config = config(true);
        assert!(config.validate().is_ok());

        config.overbought = 30.0;
        config.oversold = 70.0;
        assert!(config.validate().is_err());

        let out_of_range = RsiThresholdConfig {
            overbought: 120.0,
            ..self::config(true)
        };
        assert!(out_of_range.validate().is_err());
    }

    #[test]
    fn test_full_swing_with_shorts() {
        let mut strategy = RsiThresholdStrategy::new(config(true));
        let signals = run_bars(&mut strategy, &closes_to_bars(&swing()));
        let seen: Vec<_> = signals.iter().map(|(i, s)| (*i, s.signal_type)).collect();

        assert_eq!(
            seen,
            vec![
                (11, SignalType::Buy),
                (15, SignalType::CloseLong),
                (16, SignalType::Sell),
                (20, SignalType::CloseShort),
            ]
        );
    }

    #[test]
    fn test_long_only_skips_short_side() {
        let mut strategy = RsiThresholdStrategy::new(config(false));
        let signals = run_bars(&mut strategy, &closes_to_bars(&swing()));
        let kinds: Vec<_> = signals.iter().map(|(_, s)| s.signal_type).collect();

        assert_eq!(kinds, vec![SignalType::Buy, SignalType::CloseLong]);
    }

    #[test]
    fn test_signal_strength() {
        assert_eq!(RsiThresholdStrategy::classify_strength(15.0), SignalStrength::Strong);
        assert_eq!(RsiThresholdStrategy::classify_strength(25.0), SignalStrength::Moderate);
        assert_eq!(RsiThresholdStrategy::classify_strength(50.0), SignalStrength::Weak);
        assert_eq!(RsiThresholdStrategy::classify_strength(85.0), SignalStrength::Strong);
    }

    #[test]
    fn test_reset() {
        let mut strategy = RsiThresholdStrategy::new(config(true));
        run_bars(&mut strategy, &closes_to_bars(&swing()));
        assert!(strategy.prev_rsi.is_some());

        strategy.reset();

        assert!(strategy.prev_rsi.is_none());
        assert_eq!(strategy.bars_processed, 0);
        assert_eq!(strategy.signals_generated, 0);
    }
}
