//! Strategy implementations.
//!
//! Each strategy turns indicator readings into edge-triggered signals and
//! leaves sizing, stops and order placement to the runner:
//! - Moving average crossover
//! - RSI threshold re-entry
//! - Bollinger band breakout
//! - MACD histogram colour at a signal bar
//! - Supertrend flip with volume confirmation
//! - Floor pivot bias (paired with martingale sizing)
//! - Candle streak reversal

mod bollinger_breakout;
mod ma_crossover;
mod macd_histogram;
mod pivot_martingale;
mod registry;
mod rsi_threshold;
mod streak_reversal;
mod supertrend_volume;

#[cfg(test)]
mod test_support;

pub use bollinger_breakout::{BollingerBreakoutConfig, BollingerBreakoutStrategy};
pub use ma_crossover::{MACrossoverConfig, MACrossoverStrategy};
pub use macd_histogram::{MacdHistogramConfig, MacdHistogramStrategy};
pub use pivot_martingale::{PivotMartingaleConfig, PivotMartingaleStrategy};
pub use registry::{StrategyInfo, StrategyRegistry};
pub use rsi_threshold::{RsiThresholdConfig, RsiThresholdStrategy};
pub use streak_reversal::{StreakReversalConfig, StreakReversalStrategy};
pub use supertrend_volume::{SupertrendVolumeConfig, SupertrendVolumeStrategy};

use stratlab_core::error::StrategyError;

pub(crate) fn require_symbols(symbols: &[String]) -> Result<(), StrategyError> {
    if symbols.is_empty() {
        return Err(StrategyError::InvalidConfig(
            "At least one symbol required".into(),
        ));
    }
    Ok(())
}
