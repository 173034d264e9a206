//! The indicator contract shared by every technical study.

use crate::error::IndicatorError;

/// A batch technical study over a price slice.
///
/// `compute` returns one value per input element from index `warmup() - 1`
/// onwards, so the last output always belongs to the last input. Strategies
/// almost always want only that newest value, which is what [`last`] and
/// [`try_last`] return.
///
/// [`last`]: Indicator::last
/// [`try_last`]: Indicator::try_last
pub trait Indicator: Send + Sync {
    type Output;

    /// Inputs needed before the first output exists.
    fn warmup(&self) -> usize;

    /// Full output series, aligned to the end of `data`.
    fn compute(&self, data: &[f64]) -> Vec<Self::Output>;

    fn last(&self, data: &[f64]) -> Option<Self::Output> {
        self.compute(data).pop()
    }

    /// Newest value, or how far short of the warmup `data` falls.
    fn try_last(&self, data: &[f64]) -> Result<Self::Output, IndicatorError> {
        self.last(data).ok_or(IndicatorError::InsufficientData {
            required: self.warmup(),
            available: data.len(),
        })
    }
}
