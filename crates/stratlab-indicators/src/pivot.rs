//! Floor-trader pivot points.

use serde::{Deserialize, Serialize};
use stratlab_core::types::Bar;

/// Classic floor pivot levels derived from one reference bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PivotPoints {
    pub pivot: f64,
    pub r1: f64,
    pub r2: f64,
    pub r3: f64,
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
}

impl PivotPoints {
    /// Levels from a reference bar's high, low and close.
    pub fn from_hlc(high: f64, low: f64, close: f64) -> Self {
        let pivot = (high + low + close) / 3.0;
        let range = high - low;

        Self {
            pivot,
            r1: 2.0 * pivot - low,
            r2: pivot + range,
            r3: high + 2.0 * (pivot - low),
            s1: 2.0 * pivot - high,
            s2: pivot - range,
            s3: low - 2.0 * (high - pivot),
        }
    }

    /// Levels from a finished bar, usually the previous session.
    pub fn from_bar(bar: &Bar) -> Self {
        Self::from_hlc(bar.high, bar.low, bar.close)
    }

    /// Price strictly above the pivot.
    pub fn is_above(&self, price: f64) -> bool {
        price > self.pivot
    }

    /// Price strictly below the pivot.
    pub fn is_below(&self, price: f64) -> bool {
        price < self.pivot
    }
}
