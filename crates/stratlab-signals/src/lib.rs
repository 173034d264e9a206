//! Signal evaluation building blocks.
//!
//! Strategies turn indicator values into small discrete states (a trend, a
//! histogram colour), keep a bounded history of them and act when the state
//! a configurable number of closed bars ago differs in family from the one
//! before it.

pub mod color;
pub mod cross;
pub mod evaluator;
pub mod history;

pub use color::HistogramColor;
pub use cross::{crossed_above, crossed_below, Cross};
pub use evaluator::{SignalBarEvaluator, SignalBarReading, ThresholdClassifier, Trend, TrendFamily};
pub use history::SignalHistory;
