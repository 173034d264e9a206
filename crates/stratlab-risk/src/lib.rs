//! Position risk management.
//!
//! Provides the per-position stop/take/trailing bracket and the volume sizer
//! used to pick entry and add-on volumes.

mod bracket;
mod volume;

pub use bracket::{
    BracketConfig, BracketExit, BracketRiskManager, ExitPriority, ExitTrigger, PositionBracket,
};
pub use volume::{VolumeMethod, VolumeSizer};
