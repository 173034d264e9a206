//! Trading signals emitted by strategies.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Side;

/// What a strategy wants done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    /// Open a long position, reversing a short if one is open
    Buy,
    /// Open a short position, reversing a long if one is open
    Sell,
    /// Flatten a long position
    CloseLong,
    /// Flatten a short position
    CloseShort,
    /// No action
    Hold,
}

impl SignalType {
    /// Entry side for opening signals.
    pub fn entry_side(&self) -> Option<Side> {
        match self {
            SignalType::Buy => Some(Side::Buy),
            SignalType::Sell => Some(Side::Sell),
            _ => None,
        }
    }

    /// Check if this signal opens a position.
    pub fn is_entry(&self) -> bool {
        self.entry_side().is_some()
    }

    /// Check if this signal only closes a position.
    pub fn is_exit(&self) -> bool {
        matches!(self, SignalType::CloseLong | SignalType::CloseShort)
    }
}

/// Signal strength classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SignalStrength {
    Weak,
    #[default]
    Moderate,
    Strong,
}

/// How an entry should be placed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "type", content = "price")]
pub enum EntryOrder {
    /// Enter at market on this bar
    #[default]
    Market,
    /// Rest a stop order at the given price (BuyStop / SellStop)
    Stop(f64),
    /// Rest a limit order at the given price (BuyLimit / SellLimit)
    Limit(f64),
}

/// Supporting information attached to a signal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalMetadata {
    /// Strategy that produced the signal
    pub strategy_name: String,
    /// Indicator values at signal time
    pub indicators: HashMap<String, f64>,
    /// Human-readable reason
    pub reason: String,
}

/// A trading signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub signal_type: SignalType,
    pub strength: SignalStrength,
    /// Reference price (usually the bar close)
    pub price: f64,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Entry order style; ignored for exit signals
    #[serde(default)]
    pub entry: EntryOrder,
    pub metadata: SignalMetadata,
}

impl Signal {
    /// Create a market signal with moderate strength and full confidence.
    pub fn new(
        symbol: impl Into<String>,
        signal_type: SignalType,
        price: f64,
        timestamp: i64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            signal_type,
            strength: SignalStrength::Moderate,
            price,
            timestamp,
            confidence: 1.0,
            entry: EntryOrder::Market,
            metadata: SignalMetadata::default(),
        }
    }

    /// Set the entry order style.
    pub fn with_entry(mut self, entry: EntryOrder) -> Self {
        self.entry = entry;
        self
    }

    /// Set the strength.
    pub fn with_strength(mut self, strength: SignalStrength) -> Self {
        self.strength = strength;
        self
    }

    /// Set the confidence, clamped to [0, 1].
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Attach metadata.
    pub fn with_metadata(
        mut self,
        strategy_name: &str,
        indicators: &[(&str, f64)],
        reason: impl Into<String>,
    ) -> Self {
        self.metadata = SignalMetadata {
            strategy_name: strategy_name.to_string(),
            indicators: indicators
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            reason: reason.into(),
        };
        self
    }
}
