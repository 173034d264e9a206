//! Broker trait definition.

use crate::error::BrokerError;
use crate::types::{Order, OrderRequest, Portfolio, Position};
use async_trait::async_trait;
use uuid::Uuid;

/// Order routing and account state as the backtest runner sees them.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn get_account(&self) -> Result<Portfolio, BrokerError>;

    /// Accept an order. Market orders wait for the caller to name a price;
    /// stop and limit orders rest until the market trades through them.
    async fn submit_order(&self, request: OrderRequest) -> Result<Order, BrokerError>;

    /// Withdraw a resting order. Unknown, filled and canceled orders are
    /// all reported as not found.
    async fn cancel_order(&self, order_id: Uuid) -> Result<(), BrokerError>;

    /// Orders that can still fill.
    async fn open_orders(&self) -> Result<Vec<Order>, BrokerError>;

    async fn get_position(&self, symbol: &str) -> Result<Option<Position>, BrokerError>;

    /// Submit a market order flattening the whole position in `symbol`.
    async fn close_position(&self, symbol: &str) -> Result<Order, BrokerError>;
}
