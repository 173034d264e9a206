//! Supertrend.

use serde::{Deserialize, Serialize};

use crate::volatility::Atr;

/// One Supertrend reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupertrendOutput {
    /// Support while trending up, resistance while trending down
    pub value: f64,
    pub upper: f64,
    pub lower: f64,
    pub trending_up: bool,
}

impl SupertrendOutput {
    pub fn flipped_from(&self, previous: &SupertrendOutput) -> bool {
        self.trending_up != previous.trending_up
    }

    fn new(upper: f64, lower: f64, trending_up: bool) -> Self {
        Self {
            value: if trending_up { lower } else { upper },
            upper,
            lower,
            trending_up,
        }
    }
}

/// ATR bands around the bar midpoint. The bands only move toward price while
/// the close stays on their side, and the direction flips when the close
/// crosses the active band.
#[derive(Debug, Clone, Copy)]
pub struct Supertrend {
    atr: Atr,
    multiplier: f64,
}

impl Supertrend {
    pub fn new(period: usize, multiplier: f64) -> Self {
        Self {
            atr: Atr::new(period),
            multiplier,
        }
    }

    pub fn warmup(&self) -> usize {
        self.atr.warmup()
    }

    /// Readings aligned to the end of the input.
    pub fn compute_hlc(&self, high: &[f64], low: &[f64], close: &[f64]) -> Vec<SupertrendOutput> {
        let atr = self.atr.compute_hlc(high, low, close);
        let first = self.warmup() - 1;
        let mut out: Vec<SupertrendOutput> = Vec::with_capacity(atr.len());

        for (bar, range) in (first..).zip(atr) {
            let midpoint = (high[bar] + low[bar]) / 2.0;
            let basic_upper = midpoint + self.multiplier * range;
            let basic_lower = midpoint - self.multiplier * range;

            let reading = match out.last() {
                None => SupertrendOutput::new(basic_upper, basic_lower, close[bar] >= midpoint),
                Some(prev) => {
                    let prev_close = close[bar - 1];
                    let upper = if prev_close <= prev.upper {
                        basic_upper.min(prev.upper)
                    } else {
                        basic_upper
                    };
                    let lower = if prev_close >= prev.lower {
                        basic_lower.max(prev.lower)
                    } else {
                        basic_lower
                    };
                    let trending_up = if prev.trending_up {
                        close[bar] >= lower
                    } else {
                        close[bar] > upper
                    };
                    SupertrendOutput::new(upper, lower, trending_up)
                }
            };
            out.push(reading);
        }
        out
    }
}
