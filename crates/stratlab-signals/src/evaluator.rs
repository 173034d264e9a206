//! Signal-bar evaluation over discrete indicator states.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::history::SignalHistory;

/// Family a discrete indicator state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

/// Maps a discrete state (a colour code, a band position) onto its family.
///
/// Entries and exits fire on family transitions, so states that differ only
/// in shade never trigger a signal.
pub trait TrendFamily: Copy {
    fn family(&self) -> Trend;
}

impl TrendFamily for Trend {
    fn family(&self) -> Trend {
        *self
    }
}

/// Classifies a value against a fixed level: above is bullish, at or below
/// is bearish.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdClassifier {
    pub threshold: f64,
}

impl ThresholdClassifier {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn classify(&self, value: f64) -> Trend {
        if value > self.threshold {
            Trend::Bullish
        } else {
            Trend::Bearish
        }
    }
}

/// Families at the signal bar and the bar before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalBarReading {
    /// Family `signal_bar` closed bars ago
    pub current: Trend,
    /// Family `signal_bar + 1` closed bars ago
    pub previous: Trend,
}

impl SignalBarReading {
    pub fn turned_bullish(&self) -> bool {
        self.current == Trend::Bullish && self.previous != Trend::Bullish
    }

    pub fn turned_bearish(&self) -> bool {
        self.current == Trend::Bearish && self.previous != Trend::Bearish
    }

    pub fn changed(&self) -> bool {
        self.current != self.previous
    }
}

/// Compares the state `signal_bar` bars ago with the one before it.
///
/// With `signal_bar = 0` the newest closed bar is evaluated; larger values
/// delay the reaction by that many bars.
#[derive(Debug, Clone)]
pub struct SignalBarEvaluator<S> {
    signal_bar: usize,
    history: SignalHistory<S>,
}

impl<S: TrendFamily> SignalBarEvaluator<S> {
    pub fn new(signal_bar: usize) -> Self {
        Self {
            signal_bar,
            history: SignalHistory::new(signal_bar + 2),
        }
    }

    /// Record the state of the newest closed bar.
    ///
    /// Returns `None` until the history reaches back `signal_bar + 1` bars.
    pub fn update(&mut self, state: S) -> Option<SignalBarReading> {
        self.history.push(state);
        let reading = self.reading()?;
        if reading.changed() {
            trace!(
                signal_bar = self.signal_bar,
                from = ?reading.previous,
                to = ?reading.current,
                "signal bar family transition"
            );
        }
        Some(reading)
    }

    /// Reading from the current history without adding a state.
    pub fn reading(&self) -> Option<SignalBarReading> {
        let current = self.history.get(self.signal_bar)?.family();
        let previous = self.history.get(self.signal_bar + 1)?.family();
        Some(SignalBarReading { current, previous })
    }

    pub fn signal_bar(&self) -> usize {
        self.signal_bar
    }

    pub fn history(&self) -> &SignalHistory<S> {
        &self.history
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}
