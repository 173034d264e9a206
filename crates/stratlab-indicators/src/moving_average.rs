//! Moving averages.

use serde::{Deserialize, Serialize};
use stratlab_core::traits::Indicator;

/// Simple moving average, maintained as a running window sum.
#[derive(Debug, Clone, Copy)]
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }
}

impl Indicator for Sma {
    type Output = f64;

    fn warmup(&self) -> usize {
        self.period
    }

    fn compute(&self, data: &[f64]) -> Vec<f64> {
        let n = self.period;
        if data.len() < n {
            return Vec::new();
        }
        let width = n as f64;
        let mut sum: f64 = data[..n].iter().sum();
        let mut out = Vec::with_capacity(data.len() - n + 1);
        out.push(sum / width);
        for (incoming, outgoing) in data[n..].iter().zip(data) {
            sum += incoming - outgoing;
            out.push(sum / width);
        }
        out
    }
}

/// Exponential moving average seeded with the SMA of its first window.
#[derive(Debug, Clone, Copy)]
pub struct Ema {
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }

    /// Weight given to each new value.
    pub fn alpha(&self) -> f64 {
        2.0 / (self.period as f64 + 1.0)
    }
}

impl Indicator for Ema {
    type Output = f64;

    fn warmup(&self) -> usize {
        self.period
    }

    fn compute(&self, data: &[f64]) -> Vec<f64> {
        let n = self.period;
        if data.len() < n {
            return Vec::new();
        }
        let alpha = self.alpha();
        let seed = data[..n].iter().sum::<f64>() / n as f64;
        std::iter::once(seed)
            .chain(data[n..].iter().scan(seed, |ema, &x| {
                *ema += alpha * (x - *ema);
                Some(*ema)
            }))
            .collect()
    }
}

/// Linearly weighted moving average; the newest value carries weight `period`.
#[derive(Debug, Clone, Copy)]
pub struct Wma {
    period: usize,
}

impl Wma {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }
}

impl Indicator for Wma {
    type Output = f64;

    fn warmup(&self) -> usize {
        self.period
    }

    fn compute(&self, data: &[f64]) -> Vec<f64> {
        let n = self.period;
        let total_weight = (n * (n + 1)) as f64 / 2.0;
        data.windows(n)
            .map(|window| {
                window
                    .iter()
                    .enumerate()
                    .map(|(i, x)| x * (i + 1) as f64)
                    .sum::<f64>()
                    / total_weight
            })
            .collect()
    }
}

/// Moving average flavour selectable from strategy parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaKind {
    #[default]
    Sma,
    Ema,
    Wma,
}

impl MaKind {
    pub fn compute(self, data: &[f64], period: usize) -> Vec<f64> {
        match self {
            MaKind::Sma => Sma::new(period).compute(data),
            MaKind::Ema => Ema::new(period).compute(data),
            MaKind::Wma => Wma::new(period).compute(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_sma_window_slides() {
        let out = Sma::new(3).compute(&[2.0, 4.0, 6.0, 8.0, 13.0]);
        assert_eq!(out.len(), 3);
        assert!(close(out[0], 4.0));
        assert!(close(out[1], 6.0));
        assert!(close(out[2], 9.0));
    }

    #[test]
    fn test_short_input_has_no_output() {
        assert!(Sma::new(4).compute(&[1.0, 2.0, 3.0]).is_empty());
        assert!(Ema::new(4).last(&[1.0, 2.0, 3.0]).is_none());
        assert!(Wma::new(4).try_last(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_ema_seeds_then_smooths() {
        // seed = mean(1, 2, 3) = 2, alpha = 0.5
        let out = Ema::new(3).compute(&[1.0, 2.0, 3.0, 6.0, 0.0]);
        assert_eq!(out.len(), 3);
        assert!(close(out[0], 2.0));
        assert!(close(out[1], 4.0));
        assert!(close(out[2], 2.0));
    }

    #[test]
    fn test_wma_weights_newest_most() {
        // (1*1 + 2*2 + 3*9) / 6
        let out = Wma::new(3).compute(&[1.0, 2.0, 9.0]);
        assert!(close(out[0], 32.0 / 6.0));
    }

    #[test]
    fn test_zero_period_acts_as_identity() {
        let data = [1.5, 2.5, 3.5];
        assert_eq!(Sma::new(0).compute(&data), data.to_vec());
        assert_eq!(Ema::new(0).compute(&data), data.to_vec());
    }

    #[test]
    fn test_ma_kind_dispatch() {
        let data = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0];
        assert_eq!(MaKind::Sma.compute(&data, 2), Sma::new(2).compute(&data));
        assert_eq!(MaKind::Ema.compute(&data, 2), Ema::new(2).compute(&data));
        assert_eq!(MaKind::Wma.compute(&data, 2), Wma::new(2).compute(&data));
        let kind: MaKind = serde_json::from_str("\"wma\"").unwrap();
        assert_eq!(kind, MaKind::Wma);
    }
}
