//! Time-of-day trading windows.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RiskError;

/// Hours (UTC) during which new entries are allowed.
///
/// The window covers `[start_hour, end_hour)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl TradingWindow {
    /// Create a window. Call [`TradingWindow::validate`] before use.
    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    /// Reject inverted or out-of-range windows.
    pub fn validate(&self) -> Result<(), RiskError> {
        if self.start_hour >= self.end_hour || self.end_hour > 24 {
            return Err(RiskError::InvalidWindow {
                start: self.start_hour,
                end: self.end_hour,
            });
        }
        Ok(())
    }

    /// Check whether a timestamp falls inside the window.
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        let hour = time.hour();
        hour >= self.start_hour && hour < self.end_hour
    }

    /// Check a Unix millisecond timestamp.
    pub fn contains_millis(&self, timestamp: i64) -> bool {
        DateTime::from_timestamp_millis(timestamp)
            .map(|t| self.contains(t))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(TradingWindow::new(8, 17).validate().is_ok());
        assert!(TradingWindow::new(0, 24).validate().is_ok());
        assert!(TradingWindow::new(17, 8).validate().is_err());
        assert!(TradingWindow::new(9, 9).validate().is_err());
        assert!(TradingWindow::new(9, 25).validate().is_err());
    }

    #[test]
    fn test_contains() {
        let window = TradingWindow::new(8, 17);
        let hour = 3_600_000i64;

        assert!(!window.contains_millis(7 * hour));
        assert!(window.contains_millis(8 * hour));
        assert!(window.contains_millis(16 * hour + 59 * 60_000));
        assert!(!window.contains_millis(17 * hour));
    }
}
