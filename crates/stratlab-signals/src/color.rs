//! Five-colour MACD histogram classification.

use serde::{Deserialize, Serialize};

use crate::evaluator::{Trend, TrendFamily};

/// Colour of one histogram bar, from its sign and its slope against the
/// previous bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistogramColor {
    RisingAboveZero,
    FallingAboveZero,
    Zero,
    RisingBelowZero,
    FallingBelowZero,
}

impl HistogramColor {
    /// Classify `current` given the previous histogram value.
    ///
    /// Without a previous value, or with an unchanged one, the bar counts as
    /// rising.
    pub fn classify(previous: Option<f64>, current: f64) -> Self {
        let falling = previous.is_some_and(|prev| current < prev);

        if current > 0.0 {
            if falling {
                HistogramColor::FallingAboveZero
            } else {
                HistogramColor::RisingAboveZero
            }
        } else if current < 0.0 {
            if falling {
                HistogramColor::FallingBelowZero
            } else {
                HistogramColor::RisingBelowZero
            }
        } else {
            HistogramColor::Zero
        }
    }

    /// Numeric colour code, 0 to 4.
    pub fn code(&self) -> u8 {
        match self {
            HistogramColor::RisingAboveZero => 0,
            HistogramColor::FallingAboveZero => 1,
            HistogramColor::Zero => 2,
            HistogramColor::RisingBelowZero => 3,
            HistogramColor::FallingBelowZero => 4,
        }
    }
}

/// Families follow momentum: a rising bar is bullish on either side of zero.
impl TrendFamily for HistogramColor {
    fn family(&self) -> Trend {
        match self {
            HistogramColor::RisingAboveZero | HistogramColor::RisingBelowZero => Trend::Bullish,
            HistogramColor::FallingAboveZero | HistogramColor::FallingBelowZero => Trend::Bearish,
            HistogramColor::Zero => Trend::Neutral,
        }
    }
}
