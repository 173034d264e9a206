//! Bars and the rolling series strategies read from.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::Timeframe;

/// Convert an indicator-space price to an order-space price.
///
/// Non-finite inputs become zero.
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or_default()
}

/// One closed bar. Prices stay `f64` because every indicator works on
/// float slices; order arithmetic converts through [`to_decimal`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Open time in Unix milliseconds
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Open time. Out-of-range timestamps map to the Unix epoch.
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp).unwrap_or_default()
    }

    /// High, low and close as decimals, for order and bracket arithmetic.
    pub fn hlc_decimal(&self) -> (Decimal, Decimal, Decimal) {
        (
            to_decimal(self.high),
            to_decimal(self.low),
            to_decimal(self.close),
        )
    }
}

/// Closed bars of one symbol, oldest first.
///
/// A bounded series drops its oldest bar once `limit` bars are held.
#[derive(Debug, Clone)]
pub struct BarSeries {
    pub symbol: String,
    pub timeframe: Timeframe,
    bars: VecDeque<Bar>,
    limit: Option<usize>,
}

impl BarSeries {
    /// An unbounded series.
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            bars: VecDeque::new(),
            limit: None,
        }
    }

    /// A series holding at most `capacity` bars. 0 means unbounded.
    pub fn with_capacity(symbol: impl Into<String>, timeframe: Timeframe, capacity: usize) -> Self {
        let limit = (capacity > 0).then_some(capacity);
        Self {
            bars: VecDeque::with_capacity(capacity),
            limit,
            ..Self::new(symbol, timeframe)
        }
    }

    pub fn push(&mut self, bar: Bar) {
        if self.limit.is_some_and(|limit| self.bars.len() >= limit) {
            self.bars.pop_front();
        }
        self.bars.push_back(bar);
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// The newest bar.
    pub fn last(&self) -> Option<&Bar> {
        self.bars.back()
    }

    /// The bar `offset` places before the newest; `back(0)` is [`last`].
    ///
    /// [`last`]: BarSeries::last
    pub fn back(&self, offset: usize) -> Option<&Bar> {
        self.bars.iter().rev().nth(offset)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Bar> {
        self.bars.iter()
    }

    fn column(&self, field: fn(&Bar) -> f64) -> Vec<f64> {
        self.bars.iter().map(field).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.column(|b| b.close)
    }

    pub fn highs(&self) -> Vec<f64> {
        self.column(|b| b.high)
    }

    pub fn lows(&self) -> Vec<f64> {
        self.column(|b| b.low)
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.column(|b| b.volume)
    }
}
