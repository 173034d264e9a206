//! Paper trading broker for backtesting and simulation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use stratlab_core::error::BrokerError;
use stratlab_core::traits::Broker;
use stratlab_core::types::{
    to_decimal, Bar, Fill, Order, OrderRequest, OrderType, Portfolio, Position, Side,
};
use tracing::{debug, trace};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Ledger {
    portfolio: Portfolio,
    /// Orders that can still fill, tagged with their submission sequence.
    /// Filled and canceled orders are removed.
    open: HashMap<Uuid, (u64, Order)>,
    submitted: u64,
    /// Time of the last processed bar; fills are stamped with it
    clock: Option<DateTime<Utc>>,
}

impl Ledger {
    fn now(&self) -> DateTime<Utc> {
        self.clock.unwrap_or_else(Utc::now)
    }

    fn take(&mut self, order_id: Uuid) -> Result<Order, BrokerError> {
        self.open
            .remove(&order_id)
            .map(|(_, order)| order)
            .ok_or_else(|| BrokerError::OrderNotFound(order_id.to_string()))
    }
}

/// Paper trading broker for simulation.
///
/// Market orders fill through [`PaperBroker::execute_at_price`]; stop and
/// limit orders rest until [`PaperBroker::process_bar`] sees a bar that
/// trades through them. Short positions are allowed and cash is not checked.
pub struct PaperBroker {
    ledger: Mutex<Ledger>,
    slippage_pct: Decimal,
    commission_per_unit: Decimal,
}

/// Price at which a resting order fills on `bar`, if it triggers.
///
/// A bar that opens beyond the order level fills at the open.
fn trigger_price(order: &Order, bar: &Bar) -> Option<Decimal> {
    let open = to_decimal(bar.open);
    let (level, upward) = match (order.order_type, order.side) {
        (OrderType::Market, _) => return Some(open),
        (OrderType::Stop(level), Side::Buy) | (OrderType::Limit(level), Side::Sell) => (level, true),
        (OrderType::Stop(level), Side::Sell) | (OrderType::Limit(level), Side::Buy) => (level, false),
    };

    if upward {
        if open >= level {
            Some(open)
        } else {
            (to_decimal(bar.high) >= level).then_some(level)
        }
    } else if open <= level {
        Some(open)
    } else {
        (to_decimal(bar.low) <= level).then_some(level)
    }
}

impl PaperBroker {
    /// Create a new paper broker with initial capital.
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            ledger: Mutex::new(Ledger {
                portfolio: Portfolio::new(initial_capital),
                ..Default::default()
            }),
            slippage_pct: Decimal::ZERO,
            commission_per_unit: Decimal::ZERO,
        }
    }

    /// Set slippage percentage, applied against the trader on market and
    /// stop fills.
    pub fn with_slippage(mut self, slippage_pct: Decimal) -> Self {
        self.slippage_pct = slippage_pct;
        self
    }

    /// Set commission per unit of volume.
    pub fn with_commission(mut self, commission: Decimal) -> Self {
        self.commission_per_unit = commission;
        self
    }

    fn slipped(&self, order: &Order, price: Decimal) -> Decimal {
        if matches!(order.order_type, OrderType::Limit(_)) {
            return price;
        }
        let slip = self.slippage_pct / dec!(100);
        match order.side {
            Side::Buy => price * (Decimal::ONE + slip),
            Side::Sell => price * (Decimal::ONE - slip),
        }
    }

    /// Fill `order` completely at `price` before slippage and book it.
    fn fill(&self, ledger: &mut Ledger, mut order: Order, price: Decimal) -> Order {
        let price = self.slipped(&order, price);
        let quantity = order.quantity;
        let commission = self.commission_per_unit * quantity;
        order.complete(Fill {
            price,
            quantity,
            commission,
            timestamp: ledger.now(),
        });

        let portfolio = &mut ledger.portfolio;
        let value = price * quantity;
        match order.side {
            Side::Buy => portfolio.cash -= value + commission,
            Side::Sell => portfolio.cash += value - commission,
        }

        let position = portfolio
            .positions
            .entry(order.symbol.clone())
            .or_insert_with(|| Position::flat(&order.symbol));
        let realized = position.apply_fill(order.side, quantity, price);
        portfolio.total_realized_pnl += realized - commission;

        if position.direction().is_flat() {
            portfolio.positions.remove(&order.symbol);
        }
        portfolio.update_equity();

        debug!(
            order_id = %order.id,
            symbol = %order.symbol,
            side = %order.side,
            order_type = %order.order_type,
            %quantity,
            %price,
            %realized,
            "order filled"
        );
        order
    }

    /// Fill an open order at `market_price`.
    pub fn execute_at_price(&self, order_id: Uuid, market_price: Decimal) -> Result<Order, BrokerError> {
        let mut ledger = self.ledger.lock();
        let order = ledger.take(order_id)?;
        Ok(self.fill(&mut ledger, order, market_price))
    }

    /// Run resting orders for `symbol` against a finished bar.
    ///
    /// Returns the orders filled on this bar, in submission order.
    pub fn process_bar(&self, symbol: &str, bar: &Bar) -> Vec<Order> {
        let mut ledger = self.ledger.lock();
        ledger.clock = Some(bar.datetime());

        let mut triggered: Vec<(u64, Uuid, Decimal)> = ledger
            .open
            .values()
            .filter(|(_, order)| order.symbol == symbol)
            .filter_map(|(seq, order)| trigger_price(order, bar).map(|price| (*seq, order.id, price)))
            .collect();
        triggered.sort_unstable_by_key(|(seq, ..)| *seq);

        let mut filled = Vec::with_capacity(triggered.len());
        for (_, order_id, price) in triggered {
            trace!(%order_id, %price, "resting order triggered");
            if let Ok(order) = ledger.take(order_id) {
                filled.push(self.fill(&mut ledger, order, price));
            }
        }
        filled
    }

    /// Mark `symbol` at `price` and return the account equity.
    pub fn mark(&self, symbol: &str, price: Decimal) -> Decimal {
        let mut ledger = self.ledger.lock();
        ledger.portfolio.mark(symbol, price);
        ledger.portfolio.equity
    }

    /// Get a snapshot of the portfolio.
    pub fn portfolio_snapshot(&self) -> Portfolio {
        self.ledger.lock().portfolio.clone()
    }
}

#[async_trait]
impl Broker for PaperBroker {
    async fn get_account(&self) -> Result<Portfolio, BrokerError> {
        Ok(self.portfolio_snapshot())
    }

    async fn submit_order(&self, request: OrderRequest) -> Result<Order, BrokerError> {
        if request.quantity <= Decimal::ZERO {
            return Err(BrokerError::InvalidOrder(format!(
                "quantity must be positive, got {}",
                request.quantity
            )));
        }
        if let Some(level) = request.order_type.price() {
            if level <= Decimal::ZERO {
                return Err(BrokerError::InvalidOrder(format!(
                    "{} level must be positive",
                    request.order_type
                )));
            }
        }

        let mut ledger = self.ledger.lock();
        let order = Order::new(request, ledger.now());
        let seq = ledger.submitted;
        ledger.submitted += 1;
        ledger.open.insert(order.id, (seq, order.clone()));
        Ok(order)
    }

    async fn cancel_order(&self, order_id: Uuid) -> Result<(), BrokerError> {
        let mut ledger = self.ledger.lock();
        let now = ledger.now();
        let mut order = ledger.take(order_id)?;
        order.cancel(now);
        trace!(%order_id, "order canceled");
        Ok(())
    }

    async fn open_orders(&self) -> Result<Vec<Order>, BrokerError> {
        let ledger = self.ledger.lock();
        let mut open: Vec<&(u64, Order)> = ledger.open.values().collect();
        open.sort_unstable_by_key(|(seq, _)| *seq);
        Ok(open.into_iter().map(|(_, order)| order.clone()).collect())
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<Position>, BrokerError> {
        let ledger = self.ledger.lock();
        Ok(ledger.portfolio.positions.get(symbol).cloned())
    }

    async fn close_position(&self, symbol: &str) -> Result<Order, BrokerError> {
        let (side, quantity) = {
            let ledger = self.ledger.lock();
            ledger
                .portfolio
                .positions
                .get(symbol)
                .and_then(|p| Some((p.direction().closing_side()?, p.quantity.abs())))
                .ok_or_else(|| BrokerError::PositionNotFound(symbol.to_string()))?
        };

        self.submit_order(OrderRequest::market(symbol, side, quantity))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratlab_core::types::{Direction, OrderStatus};

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar::new(0, open, high, low, close, 100.0)
    }

    fn open_count(broker: &PaperBroker) -> usize {
        broker.ledger.lock().open.len()
    }

    #[tokio::test]
    async fn test_paper_broker_buy() {
        let broker = PaperBroker::new(dec!(100000));

        let request = OrderRequest::market("EURUSD", Side::Buy, dec!(1000));
        let order = broker.submit_order(request).await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.symbol, "EURUSD");

        let filled = broker.execute_at_price(order.id, dec!(1.2000)).unwrap();
        assert_eq!(filled.status, OrderStatus::Filled);
        assert_eq!(filled.fill_price(), Some(dec!(1.2000)));

        let portfolio = broker.get_account().await.unwrap();
        assert_eq!(portfolio.cash, dec!(98800));
        assert!(portfolio.positions.contains_key("EURUSD"));
    }

    #[tokio::test]
    async fn test_slippage_and_commission() {
        let broker = PaperBroker::new(dec!(10000))
            .with_slippage(dec!(0.1))
            .with_commission(dec!(0.01));

        let order = broker
            .submit_order(OrderRequest::market("EURUSD", Side::Buy, dec!(100)))
            .await
            .unwrap();
        let filled = broker.execute_at_price(order.id, dec!(100)).unwrap();

        assert_eq!(filled.fill_price(), Some(dec!(100.1)));
        assert_eq!(filled.fill.unwrap().commission, dec!(1));
        let portfolio = broker.get_account().await.unwrap();
        assert_eq!(portfolio.cash, dec!(10000) - dec!(10010) - dec!(1));
    }

    #[tokio::test]
    async fn test_short_and_cover() {
        let broker = PaperBroker::new(dec!(10000));

        let sell = broker
            .submit_order(OrderRequest::market("EURUSD", Side::Sell, dec!(1000)))
            .await
            .unwrap();
        broker.execute_at_price(sell.id, dec!(1.2000)).unwrap();

        let position = broker.get_position("EURUSD").await.unwrap().unwrap();
        assert_eq!(position.direction(), Direction::Short);

        let cover = broker.close_position("EURUSD").await.unwrap();
        assert_eq!(cover.side, Side::Buy);
        broker.execute_at_price(cover.id, dec!(1.1900)).unwrap();

        let portfolio = broker.get_account().await.unwrap();
        assert!(portfolio.positions.is_empty());
        assert_eq!(portfolio.cash, dec!(10010));
        assert_eq!(portfolio.total_realized_pnl, dec!(10));
    }

    #[tokio::test]
    async fn test_buy_stop_fills_at_stop_when_traded_through() {
        let broker = PaperBroker::new(dec!(10000));
        broker
            .submit_order(OrderRequest::stop("EURUSD", Side::Buy, dec!(1), dec!(1.2050)))
            .await
            .unwrap();

        assert!(broker.process_bar("EURUSD", &bar(1.2000, 1.2040, 1.1990, 1.2030)).is_empty());

        let filled = broker.process_bar("EURUSD", &bar(1.2030, 1.2080, 1.2020, 1.2070));
        assert_eq!(filled.len(), 1);
        assert_eq!(filled[0].fill_price(), Some(dec!(1.2050)));
        assert!(broker.open_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sell_stop_gap_fills_at_open() {
        let broker = PaperBroker::new(dec!(10000));
        broker
            .submit_order(OrderRequest::stop("EURUSD", Side::Sell, dec!(1), dec!(1.1950)))
            .await
            .unwrap();

        let filled = broker.process_bar("EURUSD", &bar(1.1930, 1.1940, 1.1900, 1.1920));
        assert_eq!(filled[0].fill_price(), Some(dec!(1.1930)));
    }

    #[tokio::test]
    async fn test_limit_orders() {
        let broker = PaperBroker::new(dec!(10000)).with_slippage(dec!(0.5));
        broker
            .submit_order(OrderRequest::limit("EURUSD", Side::Buy, dec!(1), dec!(1.1980)))
            .await
            .unwrap();

        let filled = broker.process_bar("EURUSD", &bar(1.2000, 1.2010, 1.1970, 1.1990));
        // No slippage on limit fills
        assert_eq!(filled[0].fill_price(), Some(dec!(1.1980)));
    }

    #[tokio::test]
    async fn test_same_bar_fills_keep_submission_order() {
        let broker = PaperBroker::new(dec!(10000));
        let mut submitted = Vec::new();
        for level in [dec!(1.2060), dec!(1.2010), dec!(1.2040)] {
            let order = broker
                .submit_order(OrderRequest::stop("EURUSD", Side::Buy, dec!(1), level))
                .await
                .unwrap();
            submitted.push(order.id);
        }

        let filled: Vec<Uuid> = broker
            .process_bar("EURUSD", &bar(1.2000, 1.2100, 1.1990, 1.2090))
            .iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(filled, submitted);
    }

    #[tokio::test]
    async fn test_orders_for_other_symbols_untouched() {
        let broker = PaperBroker::new(dec!(10000));
        broker
            .submit_order(OrderRequest::stop("GBPUSD", Side::Buy, dec!(1), dec!(1.3000)))
            .await
            .unwrap();

        assert!(broker.process_bar("EURUSD", &bar(1.4, 1.5, 1.3, 1.45)).is_empty());
        assert_eq!(broker.open_orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_orders() {
        let broker = PaperBroker::new(dec!(10000));
        let stop = broker
            .submit_order(OrderRequest::stop("EURUSD", Side::Buy, dec!(1), dec!(1.2050)))
            .await
            .unwrap();
        let limit = broker
            .submit_order(OrderRequest::limit("EURUSD", Side::Sell, dec!(1), dec!(1.2100)))
            .await
            .unwrap();

        broker.cancel_order(stop.id).await.unwrap();
        assert!(matches!(
            broker.cancel_order(stop.id).await,
            Err(BrokerError::OrderNotFound(_))
        ));

        let open = broker.open_orders().await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, limit.id);

        broker.cancel_order(limit.id).await.unwrap();
        assert!(broker.process_bar("EURUSD", &bar(1.2, 1.3, 1.1, 1.25)).is_empty());
    }

    #[tokio::test]
    async fn test_settled_orders_leave_the_book() {
        let broker = PaperBroker::new(dec!(10000));
        let stop = broker
            .submit_order(OrderRequest::stop("EURUSD", Side::Buy, dec!(1), dec!(1.2050)))
            .await
            .unwrap();
        let limit = broker
            .submit_order(OrderRequest::limit("EURUSD", Side::Sell, dec!(1), dec!(1.2500)))
            .await
            .unwrap();
        let market = broker
            .submit_order(OrderRequest::market("EURUSD", Side::Buy, dec!(1)))
            .await
            .unwrap();
        assert_eq!(open_count(&broker), 3);

        broker.execute_at_price(market.id, dec!(1.2000)).unwrap();
        assert_eq!(broker.process_bar("EURUSD", &bar(1.2030, 1.2080, 1.2020, 1.2070)).len(), 1);
        broker.cancel_order(limit.id).await.unwrap();
        assert_eq!(open_count(&broker), 0);

        // Filled and canceled orders are gone, not merely flagged.
        assert!(matches!(
            broker.execute_at_price(stop.id, dec!(1.3)),
            Err(BrokerError::OrderNotFound(_))
        ));
        assert!(broker.process_bar("EURUSD", &bar(1.20, 1.30, 1.10, 1.25)).is_empty());
        assert_eq!(broker.portfolio_snapshot().positions["EURUSD"].quantity, dec!(2));
    }

    #[tokio::test]
    async fn test_invalid_orders_rejected() {
        let broker = PaperBroker::new(dec!(10000));

        let zero = OrderRequest::market("EURUSD", Side::Buy, Decimal::ZERO);
        assert!(matches!(
            broker.submit_order(zero).await,
            Err(BrokerError::InvalidOrder(_))
        ));

        let unpriced = OrderRequest::stop("EURUSD", Side::Buy, dec!(1), Decimal::ZERO);
        assert!(matches!(
            broker.submit_order(unpriced).await,
            Err(BrokerError::InvalidOrder(_))
        ));
        assert_eq!(open_count(&broker), 0);
    }
}
