//! Core traits for the strategy lab.

mod broker;
mod indicator;
mod strategy;

pub use broker::Broker;
pub use indicator::Indicator;
pub use strategy::{Strategy, StrategyConfig, StrategyState};
