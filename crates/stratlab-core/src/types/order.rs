//! Orders and their fills.
//!
//! The simulated broker fills an order in one piece, so an order carries at
//! most one [`Fill`]. Resting orders keep their trigger price inside
//! [`OrderType`], which rules out a stop without a stop level.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// +1 for buys, -1 for sells.
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Buy => Decimal::ONE,
            Side::Sell => Decimal::NEGATIVE_ONE,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        })
    }
}

/// How an order meets the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "price", rename_all = "snake_case")]
pub enum OrderType {
    /// Fills at the price the broker is handed
    Market,
    /// Rests until price trades at this level or better
    Limit(Decimal),
    /// Rests until price trades through this level, then fills like a market order
    Stop(Decimal),
}

impl OrderType {
    /// Trigger level of a resting order.
    pub fn price(&self) -> Option<Decimal> {
        match self {
            OrderType::Market => None,
            OrderType::Limit(price) | OrderType::Stop(price) => Some(*price),
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => f.write_str("MARKET"),
            OrderType::Limit(price) => write!(f, "LIMIT @ {price}"),
            OrderType::Stop(price) => write!(f, "STOP @ {price}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Filled,
    Canceled,
}

/// What a caller asks the broker for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
}

impl OrderRequest {
    pub fn market(symbol: impl Into<String>, side: Side, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
        }
    }

    pub fn limit(symbol: impl Into<String>, side: Side, quantity: Decimal, price: Decimal) -> Self {
        Self {
            order_type: OrderType::Limit(price),
            ..Self::market(symbol, side, quantity)
        }
    }

    pub fn stop(symbol: impl Into<String>, side: Side, quantity: Decimal, price: Decimal) -> Self {
        Self {
            order_type: OrderType::Stop(price),
            ..Self::market(symbol, side, quantity)
        }
    }
}

/// Execution of a whole order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub price: Decimal,
    pub quantity: Decimal,
    pub commission: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// An order the broker has accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub status: OrderStatus,
    pub fill: Option<Fill>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Accept `request` at time `at`.
    pub fn new(request: OrderRequest, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: request.symbol,
            side: request.side,
            order_type: request.order_type,
            quantity: request.quantity,
            status: OrderStatus::Pending,
            fill: None,
            created_at: at,
            updated_at: at,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    pub fn fill_price(&self) -> Option<Decimal> {
        self.fill.map(|f| f.price)
    }

    pub fn filled_quantity(&self) -> Decimal {
        self.fill.map_or(Decimal::ZERO, |f| f.quantity)
    }

    fn settle(&mut self, status: OrderStatus, at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = at;
    }

    /// Record the execution and mark the order filled.
    pub fn complete(&mut self, fill: Fill) {
        self.fill = Some(fill);
        self.settle(OrderStatus::Filled, fill.timestamp);
    }

    pub fn cancel(&mut self, at: DateTime<Utc>) {
        self.settle(OrderStatus::Canceled, at);
    }
}
