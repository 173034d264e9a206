//! Line crossover detection.

use serde::{Deserialize, Serialize};

/// Direction of a crossover between two series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cross {
    /// First series moved from at-or-below to above the second
    Above,
    /// First series moved from at-or-above to below the second
    Below,
}

impl Cross {
    /// Classify the move from `(prev_a, prev_b)` to `(a, b)`.
    pub fn detect(prev_a: f64, prev_b: f64, a: f64, b: f64) -> Option<Cross> {
        if crossed_above(prev_a, prev_b, a, b) {
            Some(Cross::Above)
        } else if crossed_below(prev_a, prev_b, a, b) {
            Some(Cross::Below)
        } else {
            None
        }
    }
}

/// `a` crossed above `b` on this bar.
#[inline]
pub fn crossed_above(prev_a: f64, prev_b: f64, a: f64, b: f64) -> bool {
    prev_a <= prev_b && a > b
}

/// `a` crossed below `b` on this bar.
#[inline]
pub fn crossed_below(prev_a: f64, prev_b: f64, a: f64, b: f64) -> bool {
    prev_a >= prev_b && a < b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossovers() {
        assert!(crossed_above(1.0, 2.0, 3.0, 2.0));
        assert!(crossed_above(2.0, 2.0, 2.1, 2.0));
        assert!(!crossed_above(3.0, 2.0, 4.0, 2.0));

        assert!(crossed_below(3.0, 2.0, 1.0, 2.0));
        assert!(!crossed_below(1.0, 2.0, 0.5, 2.0));
    }

    #[test]
    fn test_detect() {
        assert_eq!(Cross::detect(1.0, 2.0, 3.0, 2.0), Some(Cross::Above));
        assert_eq!(Cross::detect(3.0, 2.0, 1.0, 2.0), Some(Cross::Below));
        assert_eq!(Cross::detect(2.0, 2.0, 2.0, 2.0), None);
    }
}
