//! Strategy runner: one strategy instance trading one instrument.
//!
//! The runner owns everything a strategy needs to trade except the signal
//! logic itself: the bar history, the protective bracket, volume sizing,
//! the trading window and a paper account. Per finished bar it
//!
//! 1. fills resting entry orders the bar traded through,
//! 2. keeps the bracket in step with the position,
//! 3. asks the strategy for a signal,
//! 4. checks the bracket, and on an exit flattens and ignores the signal,
//! 5. otherwise acts on the signal.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stratlab_broker::PaperBroker;
use stratlab_core::error::{BrokerError, StrategyError, TradingError};
use stratlab_core::traits::{Broker, Strategy};
use stratlab_core::types::{
    to_decimal, Bar, BarSeries, Direction, EntryOrder, Instrument, Order, OrderRequest, Side,
    Signal, SignalType, TradingWindow,
};
use stratlab_risk::{BracketConfig, BracketRiskManager, PositionBracket, VolumeMethod, VolumeSizer};
use stratlab_strategies::StrategyRegistry;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::BacktestConfig;
use crate::report::RunReport;
use crate::statistics::{BacktestStats, FillReason, TradeRecord};

fn empty_params() -> serde_json::Value {
    serde_json::json!({})
}

/// One strategy instance bound to one instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Registry id of the strategy
    pub strategy: String,
    /// Strategy parameters; missing fields take their defaults
    #[serde(default = "empty_params")]
    pub params: serde_json::Value,
    pub instrument: Instrument,
    #[serde(default)]
    pub bracket: BracketConfig,
    #[serde(default)]
    pub volume: VolumeMethod,
    /// Hours in which new entries are allowed; exits are always allowed
    #[serde(default)]
    pub window: Option<TradingWindow>,
}

/// Drives a strategy bar by bar against its own paper account.
pub struct StrategyRunner {
    strategy: Box<dyn Strategy>,
    instrument: Instrument,
    bracket: BracketRiskManager,
    sizer: VolumeSizer,
    window: Option<TradingWindow>,
    series: BarSeries,
    broker: PaperBroker,
    stats: BacktestStats,
    periods_per_year: f64,
    /// Resting entry orders not yet filled or canceled
    pending_entries: Vec<(Uuid, Side)>,
    direction: Direction,
    /// Account realized PnL seen at the last fill
    realized_mark: Decimal,
    /// Realized PnL of the open round trip so far, commissions included
    trade_pnl: Decimal,
}

impl StrategyRunner {
    /// Build a runner, rejecting invalid risk settings up front.
    pub fn new(
        mut strategy: Box<dyn Strategy>,
        instrument: Instrument,
        bracket: BracketConfig,
        volume: VolumeMethod,
        window: Option<TradingWindow>,
        backtest: &BacktestConfig,
    ) -> Result<Self, TradingError> {
        bracket.validate()?;
        volume.validate()?;
        if let Some(window) = &window {
            window.validate()?;
        }
        if !strategy.symbols().iter().any(|s| *s == instrument.symbol) {
            return Err(StrategyError::MissingInstrument(instrument.symbol.clone()).into());
        }
        let capacity = backtest.history_capacity;
        if capacity != 0 && capacity < strategy.warmup_period() {
            return Err(TradingError::Config(format!(
                "history capacity {capacity} is shorter than the {} bar warm-up of {}",
                strategy.warmup_period(),
                strategy.name()
            )));
        }

        strategy.reset();
        let broker = PaperBroker::new(backtest.initial_capital)
            .with_slippage(backtest.slippage_pct)
            .with_commission(backtest.commission);

        Ok(Self {
            series: BarSeries::with_capacity(instrument.symbol.clone(), backtest.timeframe, capacity),
            bracket: BracketRiskManager::for_instrument(bracket, &instrument),
            sizer: VolumeSizer::new(volume),
            stats: BacktestStats::new(backtest.initial_capital),
            periods_per_year: backtest.timeframe.periods_per_year(),
            strategy,
            instrument,
            window,
            broker,
            pending_entries: Vec::new(),
            direction: Direction::Flat,
            realized_mark: Decimal::ZERO,
            trade_pnl: Decimal::ZERO,
        })
    }

    /// Build a runner from configuration, creating the strategy by id.
    pub fn from_config(
        config: &RunnerConfig,
        registry: &StrategyRegistry,
        backtest: &BacktestConfig,
    ) -> Result<Self, TradingError> {
        let strategy = registry.create(
            &config.strategy,
            config.params.clone(),
            vec![config.instrument.symbol.clone()],
        )?;
        Self::new(
            strategy,
            config.instrument.clone(),
            config.bracket.clone(),
            config.volume.clone(),
            config.window,
            backtest,
        )
    }

    pub fn symbol(&self) -> &str {
        &self.instrument.symbol
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Levels currently protecting the position.
    pub fn bracket(&self) -> &PositionBracket {
        self.bracket.bracket()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn sizer(&self) -> &VolumeSizer {
        &self.sizer
    }

    pub fn stats(&self) -> &BacktestStats {
        &self.stats
    }

    /// Process one finished bar of this runner's instrument.
    pub async fn on_bar(&mut self, bar: Bar) {
        if let Err(e) = self.step(&bar).await {
            warn!(
                strategy = self.strategy.name(),
                symbol = %self.instrument.symbol,
                error = %e,
                "order failed, continuing with next bar"
            );
        }

        let equity = self.broker.mark(&self.instrument.symbol, to_decimal(bar.close));
        self.stats.record_equity(bar.timestamp, equity);
    }

    async fn step(&mut self, bar: &Bar) -> Result<(), BrokerError> {
        self.series.push(*bar);
        let held_at_open = !self.direction.is_flat();

        for order in self.broker.process_bar(&self.instrument.symbol, bar) {
            self.pending_entries.retain(|(id, _)| *id != order.id);
            self.record_fill(&order, FillReason::Entry).await?;
        }

        let signal = self.strategy.on_bar(&self.series);
        if let Some(signal) = &signal {
            info!(
                strategy = self.strategy.name(),
                symbol = %signal.symbol,
                signal = ?signal.signal_type,
                price = signal.price,
                reason = %signal.metadata.reason,
                "signal"
            );
        }

        // A position opened on this bar is protected from the next bar on
        if held_at_open && self.bracket.is_active() {
            let (high, low, close) = bar.hlc_decimal();
            if let Some(exit) = self.bracket.on_bar(high, low, close) {
                let price = exit.fill_price(to_decimal(bar.open));
                info!(
                    strategy = self.strategy.name(),
                    symbol = %self.instrument.symbol,
                    trigger = %exit.trigger,
                    direction = %exit.direction,
                    level = %exit.level,
                    %price,
                    "protective exit"
                );
                self.cancel_pending(None).await?;
                self.close_at(price, exit.trigger.into()).await?;
                if let Some(signal) = signal.filter(|s| s.signal_type.is_entry()) {
                    debug!(signal = ?signal.signal_type, "entry suppressed by exit on the same bar");
                }
                return Ok(());
            }
        }

        match signal {
            Some(signal) => self.act(&signal, bar).await,
            None => Ok(()),
        }
    }

    async fn act(&mut self, signal: &Signal, bar: &Bar) -> Result<(), BrokerError> {
        let close = to_decimal(bar.close);
        match signal.signal_type {
            SignalType::Buy | SignalType::Sell => self.enter(signal, bar).await,
            SignalType::CloseLong => {
                self.cancel_pending(Some(Side::Buy)).await?;
                if self.direction == Direction::Long {
                    self.close_at(close, FillReason::SignalExit).await?;
                }
                Ok(())
            }
            SignalType::CloseShort => {
                self.cancel_pending(Some(Side::Sell)).await?;
                if self.direction == Direction::Short {
                    self.close_at(close, FillReason::SignalExit).await?;
                }
                Ok(())
            }
            SignalType::Hold => Ok(()),
        }
    }

    async fn enter(&mut self, signal: &Signal, bar: &Bar) -> Result<(), BrokerError> {
        let Some(side) = signal.signal_type.entry_side() else {
            return Ok(());
        };
        if let Some(window) = &self.window {
            if !window.contains_millis(bar.timestamp) {
                debug!(
                    symbol = %self.instrument.symbol,
                    timestamp = bar.timestamp,
                    "entry outside trading window"
                );
                return Ok(());
            }
        }

        let wanted = Direction::from_side(side);
        let close = to_decimal(bar.close);

        if self.direction == wanted {
            if let Some(volume) = self.sizer.add_on_volume(&self.instrument) {
                self.market(side, volume, close, FillReason::AddOn).await?;
            }
            return Ok(());
        }

        if !self.direction.is_flat() {
            self.close_at(close, FillReason::Reversal).await?;
        }
        self.cancel_pending(None).await?;

        let volume = self.sizer.entry_volume(&self.instrument);
        let symbol = self.instrument.symbol.clone();
        match signal.entry {
            EntryOrder::Market => self.market(side, volume, close, FillReason::Entry).await,
            EntryOrder::Stop(price) => {
                let price = self.instrument.round_price(to_decimal(price));
                self.rest(OrderRequest::stop(symbol, side, volume, price)).await
            }
            EntryOrder::Limit(price) => {
                let price = self.instrument.round_price(to_decimal(price));
                self.rest(OrderRequest::limit(symbol, side, volume, price)).await
            }
        }
    }

    async fn market(
        &mut self,
        side: Side,
        volume: Decimal,
        price: Decimal,
        reason: FillReason,
    ) -> Result<(), BrokerError> {
        let request = OrderRequest::market(self.instrument.symbol.clone(), side, volume);
        let order = self.broker.submit_order(request).await?;
        let filled = self.broker.execute_at_price(order.id, price)?;
        self.record_fill(&filled, reason).await
    }

    async fn rest(&mut self, request: OrderRequest) -> Result<(), BrokerError> {
        let order = self.broker.submit_order(request).await?;
        info!(
            strategy = self.strategy.name(),
            symbol = %order.symbol,
            side = %order.side,
            order_type = %order.order_type,
            quantity = %order.quantity,
            "entry order placed"
        );
        self.pending_entries.push((order.id, order.side));
        Ok(())
    }

    async fn close_at(&mut self, price: Decimal, reason: FillReason) -> Result<(), BrokerError> {
        if self.direction.is_flat() {
            return Ok(());
        }
        let order = self.broker.close_position(&self.instrument.symbol).await?;
        let filled = self.broker.execute_at_price(order.id, price)?;
        self.record_fill(&filled, reason).await
    }

    /// Cancel resting entries, all of them or only those on `side`.
    async fn cancel_pending(&mut self, side: Option<Side>) -> Result<(), BrokerError> {
        let (cancel, keep): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_entries)
            .into_iter()
            .partition(|(_, s)| side.map_or(true, |side| side == *s));
        self.pending_entries = keep;

        for (id, _) in cancel {
            self.broker.cancel_order(id).await?;
            debug!(order_id = %id, "pending entry canceled");
        }
        Ok(())
    }

    /// Bring bracket, sizer and trade log in line with the account after a fill.
    async fn record_fill(&mut self, order: &Order, reason: FillReason) -> Result<(), BrokerError> {
        let portfolio = self.broker.get_account().await?;
        let symbol = &self.instrument.symbol;
        let direction = portfolio.direction(symbol);

        self.trade_pnl += portfolio.total_realized_pnl - self.realized_mark;
        self.realized_mark = portfolio.total_realized_pnl;

        let previous = std::mem::replace(&mut self.direction, direction);
        let mut pnl = None;

        if !previous.is_flat() && previous != direction {
            let result = std::mem::take(&mut self.trade_pnl);
            self.bracket.reset();
            self.sizer.record_close(result);
            info!(
                strategy = self.strategy.name(),
                %symbol,
                %reason,
                pnl = %result,
                "position closed"
            );
            pnl = Some(result);
        }

        if !direction.is_flat() {
            if previous != direction {
                let entry = portfolio
                    .positions
                    .get(symbol)
                    .map(|p| p.avg_entry_price)
                    .or(order.fill_price())
                    .unwrap_or_default();
                self.bracket.on_entry_filled(direction, entry);
                self.sizer.record_entry();
                info!(
                    strategy = self.strategy.name(),
                    %symbol,
                    %direction,
                    price = %entry,
                    quantity = %order.filled_quantity(),
                    "position opened"
                );
            } else if Direction::from_side(order.side) == direction {
                self.sizer.record_entry();
                debug!(%symbol, quantity = %order.filled_quantity(), "position increased");
            }
        }

        self.stats.add_trade(TradeRecord {
            strategy: self.strategy.name().to_string(),
            symbol: symbol.clone(),
            side: order.side,
            quantity: order.filled_quantity(),
            price: order.fill_price().unwrap_or_default(),
            timestamp: order.updated_at,
            reason,
            pnl,
        });
        self.strategy.on_fill(order);
        Ok(())
    }

    async fn wind_down(&mut self, close: Decimal) -> Result<(), BrokerError> {
        self.cancel_pending(None).await?;
        self.close_at(close, FillReason::EndOfData).await
    }

    /// Flatten at the last close, cancel resting orders and produce the report.
    pub async fn finish(mut self) -> RunReport {
        if let Some(bar) = self.series.last().copied() {
            if let Err(e) = self.wind_down(to_decimal(bar.close)).await {
                warn!(symbol = %self.instrument.symbol, error = %e, "failed to close at end of data");
            }
        }

        let final_portfolio = self.broker.portfolio_snapshot();
        self.stats.finalize(&final_portfolio, self.periods_per_year);

        RunReport {
            strategy: self.strategy.name().to_string(),
            symbol: self.instrument.symbol.clone(),
            state: self.strategy.state(),
            stats: self.stats,
            final_portfolio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use stratlab_core::traits::StrategyState;
    use stratlab_risk::ExitPriority;

    const HOUR_MS: i64 = 3_600_000;
    const DAY_MS: i64 = 24 * HOUR_MS;

    /// Emits pre-set signals at fixed bar indices.
    struct Scripted {
        symbols: Vec<String>,
        script: HashMap<usize, (SignalType, EntryOrder)>,
        bars: usize,
        fills: usize,
    }

    impl Scripted {
        fn new(script: &[(usize, SignalType)]) -> Self {
            Self::with_entries(
                &script
                    .iter()
                    .map(|(i, t)| (*i, *t, EntryOrder::Market))
                    .collect::<Vec<_>>(),
            )
        }

        fn with_entries(script: &[(usize, SignalType, EntryOrder)]) -> Self {
            Self {
                symbols: vec!["EURUSD".to_string()],
                script: script.iter().map(|(i, t, e)| (*i, (*t, *e))).collect(),
                bars: 0,
                fills: 0,
            }
        }
    }

    impl Strategy for Scripted {
        fn name(&self) -> &str {
            "Scripted"
        }

        fn on_bar(&mut self, series: &BarSeries) -> Option<Signal> {
            let index = self.bars;
            self.bars += 1;
            let (signal_type, entry) = *self.script.get(&index)?;
            let bar = series.last()?;
            Some(
                Signal::new(series.symbol.clone(), signal_type, bar.close, bar.timestamp)
                    .with_entry(entry),
            )
        }

        fn on_fill(&mut self, _order: &Order) {
            self.fills += 1;
        }

        fn reset(&mut self) {
            self.bars = 0;
            self.fills = 0;
        }

        fn state(&self) -> StrategyState {
            StrategyState {
                name: self.name().to_string(),
                bars_processed: self.bars,
                custom: serde_json::json!({ "fills": self.fills }),
                ..Default::default()
            }
        }

        fn warmup_period(&self) -> usize {
            1
        }

        fn symbols(&self) -> &[String] {
            &self.symbols
        }
    }

    fn eurusd() -> Instrument {
        Instrument::forex("EURUSD", 5)
    }

    fn bar(i: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar::new(i * DAY_MS + 10 * HOUR_MS, open, high, low, close, 1000.0)
    }

    fn runner_with(
        strategy: Scripted,
        bracket: BracketConfig,
        volume: VolumeMethod,
        window: Option<TradingWindow>,
    ) -> StrategyRunner {
        StrategyRunner::new(
            Box::new(strategy),
            eurusd(),
            bracket,
            volume,
            window,
            &BacktestConfig::default(),
        )
        .unwrap()
    }

    fn runner(strategy: Scripted, bracket: BracketConfig) -> StrategyRunner {
        runner_with(strategy, bracket, VolumeMethod::default(), None)
    }

    fn fifty_by_hundred() -> BracketConfig {
        BracketConfig::fixed(dec!(50), dec!(100))
    }

    async fn feed(runner: &mut StrategyRunner, bars: &[Bar]) {
        for bar in bars {
            runner.on_bar(*bar).await;
        }
    }

    fn reasons(runner: &StrategyRunner) -> Vec<FillReason> {
        runner.stats().trades.iter().map(|t| t.reason).collect()
    }

    #[tokio::test]
    async fn test_long_entry_arms_bracket() {
        let mut runner = runner(Scripted::new(&[(0, SignalType::Buy)]), fifty_by_hundred());
        feed(&mut runner, &[bar(0, 1.1990, 1.2010, 1.1980, 1.2000)]).await;

        assert_eq!(runner.direction(), Direction::Long);
        assert_eq!(runner.bracket().entry_price, Some(dec!(1.2000)));
        assert_eq!(runner.bracket().stop_loss, Some(dec!(1.1950)));
        assert_eq!(runner.bracket().take_profit, Some(dec!(1.2100)));
    }

    #[tokio::test]
    async fn test_stop_loss_exit() {
        let mut runner = runner(Scripted::new(&[(0, SignalType::Buy)]), fifty_by_hundred());
        feed(
            &mut runner,
            &[
                bar(0, 1.1990, 1.2010, 1.1980, 1.2000),
                bar(1, 1.2000, 1.2020, 1.1980, 1.2005),
                bar(2, 1.2005, 1.2010, 1.1940, 1.1945),
            ],
        )
        .await;

        assert_eq!(runner.direction(), Direction::Flat);
        assert_eq!(reasons(&runner), vec![FillReason::Entry, FillReason::StopLoss]);

        let exit = &runner.stats().trades[1];
        assert_eq!(exit.side, Side::Sell);
        assert_eq!(exit.price, dec!(1.1950));
        assert_eq!(exit.pnl, Some(dec!(-0.0050)));
        assert_eq!(runner.bracket(), &PositionBracket::default());
        assert_eq!(runner.sizer().losing_streak(), 1);
    }

    #[tokio::test]
    async fn test_gapped_stop_fills_at_open() {
        let mut runner = runner(Scripted::new(&[(0, SignalType::Buy)]), fifty_by_hundred());
        feed(
            &mut runner,
            &[
                bar(0, 1.1990, 1.2010, 1.1980, 1.2000),
                bar(1, 1.1800, 1.1820, 1.1790, 1.1810),
            ],
        )
        .await;

        assert_eq!(reasons(&runner), vec![FillReason::Entry, FillReason::StopLoss]);
        let exit = &runner.stats().trades[1];
        assert_eq!(exit.price, dec!(1.1800));
        assert!(exit.price <= dec!(1.1820));
        assert_eq!(exit.pnl, Some(dec!(-0.0200)));
    }

    #[tokio::test]
    async fn test_take_profit_exit() {
        let mut runner = runner(Scripted::new(&[(0, SignalType::Buy)]), fifty_by_hundred());
        feed(
            &mut runner,
            &[
                bar(0, 1.1990, 1.2010, 1.1980, 1.2000),
                bar(1, 1.2050, 1.2110, 1.2040, 1.2100),
            ],
        )
        .await;

        let exit = &runner.stats().trades[1];
        assert_eq!(exit.reason, FillReason::TakeProfit);
        assert_eq!(exit.price, dec!(1.2100));
        assert_eq!(exit.pnl, Some(dec!(0.0100)));
    }

    #[tokio::test]
    async fn test_exit_priority_decides_when_both_touched() {
        let bars = [
            bar(0, 1.1990, 1.2010, 1.1980, 1.2000),
            bar(1, 1.2000, 1.2110, 1.1940, 1.2000),
        ];

        let mut stop_first = runner(Scripted::new(&[(0, SignalType::Buy)]), fifty_by_hundred());
        feed(&mut stop_first, &bars).await;
        assert_eq!(stop_first.stats().trades[1].reason, FillReason::StopLoss);

        let take_first = fifty_by_hundred().with_priority(ExitPriority::TakeFirst);
        let mut take_first = runner(Scripted::new(&[(0, SignalType::Buy)]), take_first);
        feed(&mut take_first, &bars).await;
        assert_eq!(take_first.stats().trades[1].reason, FillReason::TakeProfit);
    }

    #[tokio::test]
    async fn test_exit_suppresses_entry_on_same_bar() {
        let script = [(0, SignalType::Buy), (1, SignalType::Sell)];
        let mut runner = runner(Scripted::new(&script), fifty_by_hundred());
        feed(
            &mut runner,
            &[
                bar(0, 1.1990, 1.2010, 1.1980, 1.2000),
                bar(1, 1.2000, 1.2005, 1.1940, 1.1945),
            ],
        )
        .await;

        assert_eq!(runner.direction(), Direction::Flat);
        assert_eq!(reasons(&runner), vec![FillReason::Entry, FillReason::StopLoss]);
    }

    #[tokio::test]
    async fn test_reversal_closes_then_opens() {
        let script = [(0, SignalType::Buy), (1, SignalType::Sell)];
        let mut runner = runner(Scripted::new(&script), BracketConfig::default());
        feed(
            &mut runner,
            &[
                bar(0, 1.1990, 1.2010, 1.1980, 1.2000),
                bar(1, 1.2000, 1.2040, 1.1990, 1.2030),
            ],
        )
        .await;

        assert_eq!(runner.direction(), Direction::Short);
        assert_eq!(
            reasons(&runner),
            vec![FillReason::Entry, FillReason::Reversal, FillReason::Entry]
        );
        assert_eq!(runner.stats().trades[1].pnl, Some(dec!(0.0030)));
        assert_eq!(runner.bracket().direction, Direction::Short);
        assert_eq!(runner.bracket().entry_price, Some(dec!(1.2030)));
    }

    #[tokio::test]
    async fn test_duplicate_entries_ignored() {
        let script = [(0, SignalType::Buy), (1, SignalType::Buy), (2, SignalType::Buy)];
        let mut runner = runner(Scripted::new(&script), BracketConfig::default());
        feed(
            &mut runner,
            &[
                bar(0, 1.20, 1.21, 1.19, 1.20),
                bar(1, 1.20, 1.21, 1.19, 1.20),
                bar(2, 1.20, 1.21, 1.19, 1.20),
            ],
        )
        .await;

        assert_eq!(reasons(&runner), vec![FillReason::Entry]);
    }

    #[tokio::test]
    async fn test_exit_signals() {
        let script = [
            (0, SignalType::CloseLong),
            (1, SignalType::Buy),
            (2, SignalType::CloseShort),
            (3, SignalType::CloseLong),
        ];
        let mut runner = runner(Scripted::new(&script), BracketConfig::default());
        feed(
            &mut runner,
            &[
                bar(0, 1.20, 1.21, 1.19, 1.20),
                bar(1, 1.20, 1.21, 1.19, 1.20),
                bar(2, 1.20, 1.21, 1.19, 1.20),
                bar(3, 1.20, 1.22, 1.19, 1.21),
            ],
        )
        .await;

        assert_eq!(runner.direction(), Direction::Flat);
        assert_eq!(reasons(&runner), vec![FillReason::Entry, FillReason::SignalExit]);
        assert_eq!(runner.stats().trades[1].pnl, Some(dec!(0.01)));
    }

    #[tokio::test]
    async fn test_trading_window_blocks_entries_only() {
        let window = Some(TradingWindow::new(8, 17));
        let script = [(0, SignalType::Buy), (1, SignalType::Buy), (2, SignalType::CloseLong)];
        let mut runner = runner_with(
            Scripted::new(&script),
            BracketConfig::default(),
            VolumeMethod::default(),
            window,
        );

        let mut early = bar(0, 1.20, 1.21, 1.19, 1.20);
        early.timestamp = 3 * HOUR_MS;
        let mut late = bar(2, 1.20, 1.21, 1.19, 1.20);
        late.timestamp = 2 * DAY_MS + 20 * HOUR_MS;

        runner.on_bar(early).await;
        assert!(runner.stats().trades.is_empty());

        runner.on_bar(bar(1, 1.20, 1.21, 1.19, 1.20)).await;
        assert_eq!(runner.direction(), Direction::Long);

        runner.on_bar(late).await;
        assert_eq!(runner.direction(), Direction::Flat);
    }

    #[tokio::test]
    async fn test_martingale_scales_after_loss() {
        let volume = VolumeMethod::Martingale {
            base_volume: dec!(1),
            multiplier: dec!(2),
            max_steps: 3,
        };
        let script = [(0, SignalType::Buy), (2, SignalType::Buy)];
        let mut runner = runner_with(Scripted::new(&script), fifty_by_hundred(), volume, None);
        feed(
            &mut runner,
            &[
                bar(0, 1.1990, 1.2010, 1.1980, 1.2000),
                bar(1, 1.2000, 1.2005, 1.1940, 1.1945),
                bar(2, 1.1945, 1.1960, 1.1930, 1.1950),
            ],
        )
        .await;

        let trades = &runner.stats().trades;
        assert_eq!(trades[0].quantity, dec!(1));
        assert_eq!(trades[1].reason, FillReason::StopLoss);
        assert_eq!(trades[2].quantity, dec!(2));
    }

    #[tokio::test]
    async fn test_pyramid_adds_to_position() {
        let volume = VolumeMethod::Pyramid {
            base_volume: dec!(1),
            multiplier: dec!(2),
            max_entries: 2,
        };
        let script = [(0, SignalType::Buy), (1, SignalType::Buy), (2, SignalType::Buy)];
        let mut runner =
            runner_with(Scripted::new(&script), BracketConfig::default(), volume, None);
        feed(
            &mut runner,
            &[
                bar(0, 1.20, 1.21, 1.19, 1.20),
                bar(1, 1.20, 1.22, 1.19, 1.21),
                bar(2, 1.21, 1.23, 1.20, 1.22),
            ],
        )
        .await;

        assert_eq!(reasons(&runner), vec![FillReason::Entry, FillReason::AddOn]);
        assert_eq!(runner.stats().trades[1].quantity, dec!(2));
        assert_eq!(runner.sizer().open_entries(), 2);
        // The bracket stays on the first entry
        assert_eq!(runner.bracket().entry_price, Some(dec!(1.20)));
    }

    #[tokio::test]
    async fn test_pending_stop_entry() {
        let script = [(0, SignalType::Buy, EntryOrder::Stop(1.2050))];
        let mut runner = runner(Scripted::with_entries(&script), fifty_by_hundred());
        feed(
            &mut runner,
            &[
                bar(0, 1.1990, 1.2010, 1.1980, 1.2000),
                bar(1, 1.2000, 1.2040, 1.1990, 1.2030),
            ],
        )
        .await;
        assert!(runner.stats().trades.is_empty());

        // Triggers, then trades through the new stop on the same bar
        runner.on_bar(bar(2, 1.2030, 1.2060, 1.1990, 1.2010)).await;
        assert_eq!(runner.direction(), Direction::Long);
        assert_eq!(runner.bracket().entry_price, Some(dec!(1.2050)));
        assert_eq!(runner.bracket().stop_loss, Some(dec!(1.2000)));

        runner.on_bar(bar(3, 1.2010, 1.2020, 1.1990, 1.1995)).await;
        assert_eq!(runner.direction(), Direction::Flat);
        assert_eq!(runner.stats().trades[1].reason, FillReason::StopLoss);
    }

    #[tokio::test]
    async fn test_close_signal_cancels_pending_entry() {
        let script = [
            (0, SignalType::Buy, EntryOrder::Stop(1.2050)),
            (1, SignalType::CloseLong, EntryOrder::Market),
        ];
        let mut runner = runner(Scripted::with_entries(&script), BracketConfig::default());
        feed(
            &mut runner,
            &[
                bar(0, 1.1990, 1.2010, 1.1980, 1.2000),
                bar(1, 1.2000, 1.2010, 1.1990, 1.2000),
                bar(2, 1.2000, 1.2100, 1.1990, 1.2080),
            ],
        )
        .await;

        assert!(runner.stats().trades.is_empty());
        assert_eq!(runner.direction(), Direction::Flat);
    }

    #[tokio::test]
    async fn test_finish_closes_open_position() {
        let mut runner = runner(Scripted::new(&[(0, SignalType::Sell)]), BracketConfig::default());
        feed(
            &mut runner,
            &[
                bar(0, 1.20, 1.21, 1.19, 1.20),
                bar(1, 1.20, 1.20, 1.18, 1.19),
            ],
        )
        .await;

        let report = runner.finish().await;
        let last = report.stats.trades.last().unwrap();
        assert_eq!(last.reason, FillReason::EndOfData);
        assert_eq!(last.pnl, Some(dec!(0.01)));
        assert_eq!(report.stats.total_trades, 1);
        assert_eq!(report.stats.winning_trades, 1);
        assert!(report.final_portfolio.positions.is_empty());
        assert_eq!(report.state.custom["fills"], 2);
    }

    #[test]
    fn test_rejects_foreign_instrument() {
        let result = StrategyRunner::new(
            Box::new(Scripted::new(&[])),
            Instrument::forex("GBPUSD", 5),
            BracketConfig::default(),
            VolumeMethod::default(),
            None,
            &BacktestConfig::default(),
        );
        assert!(matches!(
            result,
            Err(TradingError::Strategy(StrategyError::MissingInstrument(_)))
        ));
    }

    #[test]
    fn test_rejects_invalid_risk_settings() {
        let trailing_without_step = BracketConfig::default().with_trailing(dec!(20), Decimal::ZERO);
        let result = StrategyRunner::new(
            Box::new(Scripted::new(&[])),
            eurusd(),
            trailing_without_step,
            VolumeMethod::default(),
            None,
            &BacktestConfig::default(),
        );
        assert!(matches!(result, Err(TradingError::Risk(_))));

        let result = StrategyRunner::new(
            Box::new(Scripted::new(&[])),
            eurusd(),
            BracketConfig::default(),
            VolumeMethod::default(),
            Some(TradingWindow::new(17, 8)),
            &BacktestConfig::default(),
        );
        assert!(matches!(result, Err(TradingError::Risk(_))));
    }

    #[test]
    fn test_runner_config_defaults() {
        let config: RunnerConfig = serde_json::from_value(serde_json::json!({
            "strategy": "rsi_threshold",
            "instrument": { "symbol": "EURUSD", "price_step": "0.00001", "decimals": 5 }
        }))
        .unwrap();

        assert_eq!(config.params, serde_json::json!({}));
        assert_eq!(config.bracket, BracketConfig::default());
        assert_eq!(config.volume, VolumeMethod::default());
        assert!(config.window.is_none());

        let runner = StrategyRunner::from_config(
            &config,
            &StrategyRegistry::new(),
            &BacktestConfig::default(),
        )
        .unwrap();
        assert_eq!(runner.strategy_name(), "RSI Threshold");
    }
}
