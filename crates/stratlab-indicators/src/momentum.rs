//! Momentum oscillators.

use serde::{Deserialize, Serialize};
use stratlab_core::traits::Indicator;

use crate::moving_average::Ema;
use crate::{tail_pairs, wilder};

/// Relative Strength Index over Wilder-smoothed gains and losses.
///
/// Reads 100 whenever the smoothed loss is zero, flat input included.
#[derive(Debug, Clone, Copy)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }
}

impl Indicator for Rsi {
    type Output = f64;

    fn warmup(&self) -> usize {
        self.period + 1
    }

    fn compute(&self, data: &[f64]) -> Vec<f64> {
        let (gains, losses): (Vec<f64>, Vec<f64>) = data
            .windows(2)
            .map(|pair| {
                let change = pair[1] - pair[0];
                (change.max(0.0), (-change).max(0.0))
            })
            .unzip();

        wilder(&gains, self.period)
            .into_iter()
            .zip(wilder(&losses, self.period))
            .map(|(gain, loss)| {
                if loss == 0.0 {
                    100.0
                } else {
                    100.0 - 100.0 / (1.0 + gain / loss)
                }
            })
            .collect()
    }
}

/// One MACD reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdOutput {
    /// Fast EMA minus slow EMA
    pub macd: f64,
    /// EMA of the MACD line
    pub signal: f64,
    pub histogram: f64,
}

/// Moving Average Convergence Divergence.
#[derive(Debug, Clone, Copy)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
    warmup: usize,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        let (slow, signal) = (slow.max(1), signal.max(1));
        Self {
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            signal: Ema::new(signal),
            warmup: slow + signal - 1,
        }
    }

    /// Histogram series alone.
    pub fn histogram(&self, data: &[f64]) -> Vec<f64> {
        self.compute(data).iter().map(|o| o.histogram).collect()
    }
}

impl Indicator for Macd {
    type Output = MacdOutput;

    fn warmup(&self) -> usize {
        self.warmup
    }

    fn compute(&self, data: &[f64]) -> Vec<MacdOutput> {
        let fast = self.fast.compute(data);
        let slow = self.slow.compute(data);
        let line: Vec<f64> = tail_pairs(&fast, &slow).map(|(f, s)| f - s).collect();
        let signal = self.signal.compute(&line);

        tail_pairs(&line, &signal)
            .map(|(&macd, &signal)| MacdOutput {
                macd,
                signal,
                histogram: macd - signal,
            })
            .collect()
    }
}
