//! Error types for stratlab.

use thiserror::Error;

/// Top-level error.
#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("Risk error: {0}")]
    Risk(#[from] RiskError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Strategy-specific errors.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {required} bars, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Strategy not found: {0}")]
    NotFound(String),

    #[error("Missing instrument for symbol {0}")]
    MissingInstrument(String),
}

/// Broker-specific errors.
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Position not found: {0}")]
    PositionNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),
}

/// Data source errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("No data available for the requested range")]
    NoDataAvailable,

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Indicator calculation errors.
#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Insufficient data: need {required} points, have {available}")]
    InsufficientData { required: usize, available: usize },
}

/// Risk configuration errors. Raised at start-up, never mid-run.
#[derive(Error, Debug, PartialEq)]
pub enum RiskError {
    #[error("Invalid risk configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid trading window: start hour {start} must be before end hour {end} (max 24)")]
    InvalidWindow { start: u32, end: u32 },
}

/// Result type alias for stratlab operations.
pub type TradingResult<T> = Result<T, TradingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let err: TradingError = RiskError::InvalidWindow { start: 10, end: 9 }.into();
        assert!(err.to_string().contains("start hour 10"));

        let err: TradingError = StrategyError::NotFound("nope".into()).into();
        assert!(matches!(err, TradingError::Strategy(StrategyError::NotFound(_))));
    }
}
