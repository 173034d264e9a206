//! CLI command implementations.

pub mod backtest;
pub mod strategies;
pub mod validate;
