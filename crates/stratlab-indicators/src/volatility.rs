//! Volatility measures: standard deviation, ATR and Bollinger Bands.

use serde::{Deserialize, Serialize};
use stratlab_core::traits::Indicator;

use crate::moving_average::Sma;
use crate::wilder;

/// Population standard deviation over a sliding window.
#[derive(Debug, Clone, Copy)]
pub struct StdDev {
    period: usize,
}

impl StdDev {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }
}

impl Indicator for StdDev {
    type Output = f64;

    fn warmup(&self) -> usize {
        self.period
    }

    fn compute(&self, data: &[f64]) -> Vec<f64> {
        let width = self.period as f64;
        data.windows(self.period)
            .map(|window| {
                let mean = window.iter().sum::<f64>() / width;
                let squares: f64 = window.iter().map(|x| (x - mean) * (x - mean)).sum();
                (squares / width).sqrt()
            })
            .collect()
    }
}

/// Average True Range with Wilder smoothing.
///
/// True range needs the previous close, so the first bar only seeds it and
/// reading `i` belongs to bar `i + period`.
#[derive(Debug, Clone, Copy)]
pub struct Atr {
    period: usize,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }

    pub fn warmup(&self) -> usize {
        self.period + 1
    }

    pub fn compute_hlc(&self, high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
        let true_ranges: Vec<f64> = high
            .iter()
            .zip(low)
            .skip(1)
            .zip(close)
            .map(|((&h, &l), &prev_close)| {
                (h - l).max((h - prev_close).abs()).max((l - prev_close).abs())
            })
            .collect();
        wilder(&true_ranges, self.period)
    }
}

/// One set of Bollinger Bands for the newest price in the window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerOutput {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// Band width relative to the middle band
    pub bandwidth: f64,
    /// Price position within the bands: 0 at the lower band, 1 at the upper
    pub percent_b: f64,
}

impl BollingerOutput {
    /// Stop entry price for an upside breakout, `offset` above the upper band.
    pub fn upper_entry(&self, offset: f64) -> f64 {
        self.upper + offset
    }

    /// Stop entry price for a downside breakout, `offset` below the lower band.
    pub fn lower_entry(&self, offset: f64) -> f64 {
        self.lower - offset
    }
}

/// SMA middle band with bands `k` standard deviations either side.
#[derive(Debug, Clone, Copy)]
pub struct BollingerBands {
    middle: Sma,
    deviation: StdDev,
    k: f64,
}

impl BollingerBands {
    pub fn new(period: usize, k: f64) -> Self {
        Self {
            middle: Sma::new(period),
            deviation: StdDev::new(period),
            k,
        }
    }
}

impl Indicator for BollingerBands {
    type Output = BollingerOutput;

    fn warmup(&self) -> usize {
        self.middle.warmup()
    }

    fn compute(&self, data: &[f64]) -> Vec<BollingerOutput> {
        let middles = self.middle.compute(data);
        let deviations = self.deviation.compute(data);
        let prices = data.iter().skip(self.warmup() - 1);

        middles
            .into_iter()
            .zip(deviations)
            .zip(prices)
            .map(|((middle, deviation), &price)| {
                let upper = middle + self.k * deviation;
                let lower = middle - self.k * deviation;
                let width = upper - lower;
                BollingerOutput {
                    upper,
                    middle,
                    lower,
                    bandwidth: if middle == 0.0 { 0.0 } else { width / middle },
                    percent_b: if width == 0.0 {
                        0.5
                    } else {
                        (price - lower) / width
                    },
                }
            })
            .collect()
    }
}
