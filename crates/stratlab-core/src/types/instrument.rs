//! Instrument metadata and broker price conventions.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Security metadata needed to turn pip distances into prices and to
/// round order volumes.
///
/// Every field except the symbol is optional: a missing value degrades to a
/// safe default instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Symbol
    pub symbol: String,
    /// Minimum price increment
    #[serde(default)]
    pub price_step: Option<Decimal>,
    /// Number of quoted decimals (derived from `price_step` when absent)
    #[serde(default)]
    pub decimals: Option<u32>,
    /// Minimum volume increment
    #[serde(default)]
    pub volume_step: Option<Decimal>,
    /// Minimum tradable volume
    #[serde(default)]
    pub min_volume: Option<Decimal>,
}

impl Instrument {
    /// Create an instrument with no metadata.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            price_step: None,
            decimals: None,
            volume_step: None,
            min_volume: None,
        }
    }

    /// Create an FX-style instrument quoted with `decimals` digits.
    pub fn forex(symbol: impl Into<String>, decimals: u32) -> Self {
        Self {
            price_step: Some(Decimal::new(1, decimals)),
            decimals: Some(decimals),
            ..Self::new(symbol)
        }
    }

    /// Set the price step.
    pub fn with_price_step(mut self, step: Decimal) -> Self {
        self.price_step = Some(step);
        self
    }

    /// Set volume constraints.
    pub fn with_volume(mut self, step: Decimal, min: Decimal) -> Self {
        self.volume_step = Some(step);
        self.min_volume = Some(min);
        self
    }

    /// Price step, falling back to 1 when missing or non-positive.
    pub fn price_step(&self) -> Decimal {
        match self.price_step {
            Some(step) if step > Decimal::ZERO => step,
            _ => Decimal::ONE,
        }
    }

    /// Quoted decimals, from metadata or from the scale of the price step.
    pub fn decimals(&self) -> u32 {
        self.decimals
            .unwrap_or_else(|| self.price_step().normalize().scale())
    }

    /// Size of one pip.
    ///
    /// 3- and 5-digit quotes carry a fractional pip, so the pip is ten
    /// price steps there.
    pub fn pip_size(&self) -> Decimal {
        let step = match self.price_step {
            Some(step) if step > Decimal::ZERO => step,
            _ => return Decimal::ONE,
        };

        match self.decimals() {
            3 | 5 => step * dec!(10),
            _ => step,
        }
    }

    /// Convert a distance in pips to a price distance.
    pub fn pips_to_price(&self, pips: Decimal) -> Decimal {
        pips * self.pip_size()
    }

    /// Snap a price to the nearest price step. Prices pass through unchanged
    /// when the instrument has no step.
    pub fn round_price(&self, price: Decimal) -> Decimal {
        match self.price_step {
            Some(step) if step > Decimal::ZERO => (price / step).round() * step,
            _ => price,
        }
    }

    /// Minimum tradable volume (one lot when unknown).
    pub fn min_volume(&self) -> Decimal {
        match self.min_volume {
            Some(min) if min > Decimal::ZERO => min,
            _ => Decimal::ONE,
        }
    }

    /// Round a volume down to the volume step and lift it to the minimum.
    pub fn normalize_volume(&self, volume: Decimal) -> Decimal {
        let min = self.min_volume();
        if volume <= Decimal::ZERO {
            return min;
        }

        let rounded = match self.volume_step {
            Some(step) if step > Decimal::ZERO => (volume / step).floor() * step,
            _ => volume,
        };

        rounded.max(min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pip_size_five_digit() {
        let eurusd = Instrument::forex("EURUSD", 5);
        assert_eq!(eurusd.pip_size(), dec!(0.0001));
        assert_eq!(eurusd.pips_to_price(dec!(50)), dec!(0.0050));
    }

    #[test]
    fn test_pip_size_three_digit() {
        let usdjpy = Instrument::forex("USDJPY", 3);
        assert_eq!(usdjpy.pip_size(), dec!(0.01));
    }

    #[test]
    fn test_pip_size_four_digit_is_step() {
        let eurusd = Instrument::forex("EURUSD", 4);
        assert_eq!(eurusd.pip_size(), dec!(0.0001));
    }

    #[test]
    fn test_pip_size_missing_metadata() {
        assert_eq!(Instrument::new("X").pip_size(), Decimal::ONE);
        let zero = Instrument::new("X").with_price_step(Decimal::ZERO);
        assert_eq!(zero.pip_size(), Decimal::ONE);
    }

    #[test]
    fn test_decimals_derived_from_step() {
        let inst = Instrument::new("GBPUSD").with_price_step(dec!(0.00001));
        assert_eq!(inst.decimals(), 5);
        assert_eq!(inst.pip_size(), dec!(0.0001));

        let stock = Instrument::new("AAPL").with_price_step(dec!(0.01));
        assert_eq!(stock.pip_size(), dec!(0.01));
    }

    #[test]
    fn test_round_price() {
        let eurusd = Instrument::forex("EURUSD", 5);
        assert_eq!(eurusd.round_price(dec!(1.200046)), dec!(1.20005));
        assert_eq!(Instrument::new("X").round_price(dec!(1.234567)), dec!(1.234567));
    }

    #[test]
    fn test_normalize_volume() {
        let inst = Instrument::new("EURUSD").with_volume(dec!(0.01), dec!(0.01));
        assert_eq!(inst.normalize_volume(dec!(0.137)), dec!(0.13));
        assert_eq!(inst.normalize_volume(dec!(0.001)), dec!(0.01));
        assert_eq!(inst.normalize_volume(Decimal::ZERO), dec!(0.01));

        // No metadata: minimum lot of one
        assert_eq!(Instrument::new("X").normalize_volume(dec!(-3)), Decimal::ONE);
    }
}
