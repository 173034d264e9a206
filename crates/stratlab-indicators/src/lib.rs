//! Technical indicators for bar-driven strategies.
//!
//! Every study returns its readings aligned to the end of the input, so the
//! last reading always describes the newest bar.

pub mod momentum;
pub mod moving_average;
pub mod pivot;
pub mod trend;
pub mod volatility;

pub use momentum::{Macd, MacdOutput, Rsi};
pub use moving_average::{Ema, MaKind, Sma, Wma};
pub use pivot::PivotPoints;
pub use trend::{Supertrend, SupertrendOutput};
pub use volatility::{Atr, BollingerBands, BollingerOutput, StdDev};

/// Wilder smoothing: SMA seed, then `avg = (avg * (n - 1) + x) / n`.
pub(crate) fn wilder(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    let n = period as f64;
    let seed = values[..period].iter().sum::<f64>() / n;
    std::iter::once(seed)
        .chain(values[period..].iter().scan(seed, move |avg, &x| {
            *avg = (*avg * (n - 1.0) + x) / n;
            Some(*avg)
        }))
        .collect()
}

/// Pair up two end-aligned series over their common tail.
pub(crate) fn tail_pairs<'a, A, B>(a: &'a [A], b: &'a [B]) -> impl Iterator<Item = (&'a A, &'a B)> {
    let n = a.len().min(b.len());
    a[a.len() - n..].iter().zip(&b[b.len() - n..])
}
