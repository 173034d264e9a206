//! Net positions and the account that holds them.

use num_traits::Signed;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::Side;

/// Net direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Flat,
    Long,
    Short,
}

impl Direction {
    pub fn from_quantity(quantity: Decimal) -> Self {
        if quantity.is_zero() {
            Direction::Flat
        } else if quantity.is_sign_positive() {
            Direction::Long
        } else {
            Direction::Short
        }
    }

    /// Direction an entry on `side` opens.
    pub fn from_side(side: Side) -> Self {
        match side {
            Side::Buy => Direction::Long,
            Side::Sell => Direction::Short,
        }
    }

    /// Order side that unwinds this direction.
    pub fn closing_side(&self) -> Option<Side> {
        match self {
            Direction::Flat => None,
            Direction::Long => Some(Side::Sell),
            Direction::Short => Some(Side::Buy),
        }
    }

    pub fn is_flat(&self) -> bool {
        *self == Direction::Flat
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Flat => "flat",
            Direction::Long => "long",
            Direction::Short => "short",
        })
    }
}

/// Net holding in one symbol. `quantity` is signed: negative when short.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    pub avg_entry_price: Decimal,
    /// Last price the position was marked at
    pub mark_price: Decimal,
    pub realized_pnl: Decimal,
}

impl Position {
    pub fn flat(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            quantity: Decimal::ZERO,
            avg_entry_price: Decimal::ZERO,
            mark_price: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
        }
    }

    pub fn direction(&self) -> Direction {
        Direction::from_quantity(self.quantity)
    }

    pub fn market_value(&self) -> Decimal {
        self.quantity * self.mark_price
    }

    pub fn unrealized_pnl(&self) -> Decimal {
        self.quantity * (self.mark_price - self.avg_entry_price)
    }

    /// Book a fill and return the PnL it realized.
    ///
    /// Adding to a position averages the entry price. Reducing keeps it.
    /// A fill larger than the position closes it and opens the remainder
    /// the other way at `price`.
    pub fn apply_fill(&mut self, side: Side, quantity: Decimal, price: Decimal) -> Decimal {
        let held = self.quantity;
        let delta = side.sign() * quantity;
        let after = held + delta;

        let opposing = !held.is_zero() && held.signum() != delta.signum();
        let closed = if opposing {
            delta.abs().min(held.abs())
        } else {
            Decimal::ZERO
        };
        let realized = closed * (price - self.avg_entry_price) * held.signum();

        if !after.is_zero() {
            if Direction::from_quantity(after) != Direction::from_quantity(held) {
                self.avg_entry_price = price;
            } else if !opposing {
                self.avg_entry_price = (held * self.avg_entry_price + delta * price) / after;
            }
        }

        self.quantity = after;
        self.realized_pnl += realized;
        self.mark_price = price;
        realized
    }
}

/// Cash plus open positions of one account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Portfolio {
    pub cash: Decimal,
    /// Cash plus marked value of every position
    pub equity: Decimal,
    pub positions: HashMap<String, Position>,
    /// Realized PnL net of commissions
    pub total_realized_pnl: Decimal,
}

impl Portfolio {
    pub fn new(cash: Decimal) -> Self {
        Self {
            cash,
            equity: cash,
            ..Self::default()
        }
    }

    pub fn direction(&self, symbol: &str) -> Direction {
        self.positions
            .get(symbol)
            .map(Position::direction)
            .unwrap_or_default()
    }

    pub fn update_equity(&mut self) {
        self.equity = self.cash + self.positions.values().map(Position::market_value).sum::<Decimal>();
    }

    /// Mark `symbol` at `price` and refresh equity.
    pub fn mark(&mut self, symbol: &str, price: Decimal) {
        if let Some(position) = self.positions.get_mut(symbol) {
            position.mark_price = price;
        }
        self.update_equity();
    }
}
