//! Core data types.

mod instrument;
mod ohlcv;
mod order;
mod position;
mod signal;
mod timeframe;
mod window;

pub use instrument::Instrument;
pub use ohlcv::{to_decimal, Bar, BarSeries};
pub use order::{Fill, Order, OrderRequest, OrderStatus, OrderType, Side};
pub use position::{Direction, Portfolio, Position};
pub use signal::{EntryOrder, Signal, SignalMetadata, SignalStrength, SignalType};
pub use timeframe::Timeframe;
pub use window::TradingWindow;
