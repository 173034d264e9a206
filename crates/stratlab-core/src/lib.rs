//! Core types and traits for stratlab.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Bar, BarSeries)
//! - Instrument metadata and pip-size conventions
//! - Order and position management types
//! - Trading signals and time-of-day trading windows
//! - Core traits for strategies, indicators and brokers

pub mod types;
pub mod traits;
pub mod error;

pub use error::{TradingError, TradingResult};
pub use types::*;
pub use traits::*;
