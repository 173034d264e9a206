//! Order volume selection: fixed lots, martingale and pyramiding.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stratlab_core::error::RiskError;
use stratlab_core::types::Instrument;
use tracing::debug;

/// Volume sizing method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum VolumeMethod {
    /// Same volume for every entry
    Fixed { volume: Decimal },
    /// Multiply the volume after each losing trade, back to base after a win
    Martingale {
        base_volume: Decimal,
        multiplier: Decimal,
        max_steps: u32,
    },
    /// Add to a winning position with geometrically scaled volumes
    Pyramid {
        base_volume: Decimal,
        multiplier: Decimal,
        max_entries: u32,
    },
}

impl Default for VolumeMethod {
    fn default() -> Self {
        VolumeMethod::Fixed {
            volume: Decimal::ONE,
        }
    }
}

impl VolumeMethod {
    pub fn validate(&self) -> Result<(), RiskError> {
        let (volume, multiplier) = match self {
            VolumeMethod::Fixed { volume } => (*volume, Decimal::ONE),
            VolumeMethod::Martingale {
                base_volume,
                multiplier,
                ..
            } => (*base_volume, *multiplier),
            VolumeMethod::Pyramid {
                base_volume,
                multiplier,
                max_entries,
            } => {
                if *max_entries == 0 {
                    return Err(RiskError::InvalidConfig(
                        "max_entries must be at least 1".into(),
                    ));
                }
                (*base_volume, *multiplier)
            }
        };

        if volume <= Decimal::ZERO {
            return Err(RiskError::InvalidConfig(format!(
                "volume must be positive, got {volume}"
            )));
        }
        if multiplier <= Decimal::ZERO {
            return Err(RiskError::InvalidConfig(format!(
                "multiplier must be positive, got {multiplier}"
            )));
        }
        Ok(())
    }
}

fn scaled(base: Decimal, multiplier: Decimal, steps: u32) -> Decimal {
    (0..steps).fold(base, |volume, _| volume * multiplier)
}

/// Tracks trade outcomes and open entries to pick the next order volume.
#[derive(Debug, Clone)]
pub struct VolumeSizer {
    method: VolumeMethod,
    losing_streak: u32,
    open_entries: u32,
}

impl VolumeSizer {
    pub fn new(method: VolumeMethod) -> Self {
        Self {
            method,
            losing_streak: 0,
            open_entries: 0,
        }
    }

    pub fn method(&self) -> &VolumeMethod {
        &self.method
    }

    /// Volume for an entry from flat, normalised to the instrument.
    pub fn entry_volume(&self, instrument: &Instrument) -> Decimal {
        let raw = match &self.method {
            VolumeMethod::Fixed { volume } => *volume,
            VolumeMethod::Martingale {
                base_volume,
                multiplier,
                max_steps,
            } => scaled(*base_volume, *multiplier, self.losing_streak.min(*max_steps)),
            VolumeMethod::Pyramid { base_volume, .. } => *base_volume,
        };
        instrument.normalize_volume(raw)
    }

    /// Volume for adding to an open position in the same direction.
    ///
    /// Only pyramiding adds; `None` once `max_entries` is reached.
    pub fn add_on_volume(&self, instrument: &Instrument) -> Option<Decimal> {
        match &self.method {
            VolumeMethod::Pyramid {
                base_volume,
                multiplier,
                max_entries,
            } if self.open_entries > 0 && self.open_entries < *max_entries => Some(
                instrument.normalize_volume(scaled(*base_volume, *multiplier, self.open_entries)),
            ),
            _ => None,
        }
    }

    /// Count a filled entry or add-on.
    pub fn record_entry(&mut self) {
        self.open_entries += 1;
    }

    /// Register the result of a position that went flat.
    pub fn record_close(&mut self, realized_pnl: Decimal) {
        self.open_entries = 0;
        if realized_pnl < Decimal::ZERO {
            self.losing_streak += 1;
        } else {
            self.losing_streak = 0;
        }
        debug!(
            %realized_pnl,
            losing_streak = self.losing_streak,
            "volume sizer updated"
        );
    }

    pub fn losing_streak(&self) -> u32 {
        self.losing_streak
    }

    pub fn open_entries(&self) -> u32 {
        self.open_entries
    }

    pub fn reset(&mut self) {
        self.losing_streak = 0;
        self.open_entries = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn lots() -> Instrument {
        Instrument::forex("EURUSD", 5).with_volume(dec!(0.01), dec!(0.01))
    }

    #[test]
    fn test_fixed_volume() {
        let sizer = VolumeSizer::new(VolumeMethod::Fixed { volume: dec!(0.1) });
        assert_eq!(sizer.entry_volume(&lots()), dec!(0.1));
        assert_eq!(sizer.add_on_volume(&lots()), None);
    }

    #[test]
    fn test_martingale_doubles_after_losses_and_caps() {
        let mut sizer = VolumeSizer::new(VolumeMethod::Martingale {
            base_volume: dec!(0.1),
            multiplier: dec!(2),
            max_steps: 2,
        });
        let instrument = lots();

        assert_eq!(sizer.entry_volume(&instrument), dec!(0.1));
        sizer.record_close(dec!(-5));
        assert_eq!(sizer.entry_volume(&instrument), dec!(0.2));
        sizer.record_close(dec!(-5));
        assert_eq!(sizer.entry_volume(&instrument), dec!(0.4));
        sizer.record_close(dec!(-5));
        assert_eq!(sizer.entry_volume(&instrument), dec!(0.4));

        sizer.record_close(dec!(12));
        assert_eq!(sizer.losing_streak(), 0);
        assert_eq!(sizer.entry_volume(&instrument), dec!(0.1));
    }

    #[test]
    fn test_pyramid_add_ons() {
        let mut sizer = VolumeSizer::new(VolumeMethod::Pyramid {
            base_volume: dec!(0.1),
            multiplier: dec!(1.5),
            max_entries: 3,
        });
        let instrument = lots();

        assert_eq!(sizer.add_on_volume(&instrument), None);
        assert_eq!(sizer.entry_volume(&instrument), dec!(0.1));
        sizer.record_entry();

        // 0.15 exactly
        assert_eq!(sizer.add_on_volume(&instrument), Some(dec!(0.15)));
        sizer.record_entry();
        // 0.225 rounds down to the 0.01 step
        assert_eq!(sizer.add_on_volume(&instrument), Some(dec!(0.22)));
        sizer.record_entry();
        assert_eq!(sizer.add_on_volume(&instrument), None);

        sizer.record_close(dec!(3));
        assert_eq!(sizer.open_entries(), 0);
    }

    #[test]
    fn test_missing_volume_metadata_uses_one_lot() {
        let sizer = VolumeSizer::new(VolumeMethod::Fixed { volume: dec!(0.3) });
        assert_eq!(sizer.entry_volume(&Instrument::new("XYZ")), dec!(1));
    }

    #[test]
    fn test_validate() {
        assert!(VolumeMethod::default().validate().is_ok());
        assert!(VolumeMethod::Fixed { volume: dec!(0) }.validate().is_err());
        assert!(VolumeMethod::Martingale {
            base_volume: dec!(0.1),
            multiplier: dec!(-2),
            max_steps: 3,
        }
        .validate()
        .is_err());
        assert!(VolumeMethod::Pyramid {
            base_volume: dec!(0.1),
            multiplier: dec!(1),
            max_entries: 0,
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_method_from_json() {
        let method: VolumeMethod = serde_json::from_str(
            r#"{"method":"martingale","base_volume":"0.1","multiplier":"2","max_steps":4}"#,
        )
        .unwrap();
        assert!(matches!(method, VolumeMethod::Martingale { max_steps: 4, .. }));
    }
}
