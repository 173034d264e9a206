//! Stop-loss, take-profit and trailing-stop bracket for one open position.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stratlab_core::error::RiskError;
use stratlab_core::types::{Direction, Instrument};
use tracing::debug;

/// Which level wins when a single bar touches both stop and take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitPriority {
    #[default]
    StopFirst,
    TakeFirst,
}

/// Bracket distances in pips.
///
/// A distance of zero (or less) disables that level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BracketConfig {
    pub stop_loss_pips: Decimal,
    pub take_profit_pips: Decimal,
    pub trailing_stop_pips: Decimal,
    pub trailing_step_pips: Decimal,
    pub exit_priority: ExitPriority,
    /// Reject a trailing stop configured without a positive step
    pub require_trailing_step: bool,
}

impl Default for BracketConfig {
    fn default() -> Self {
        Self {
            stop_loss_pips: Decimal::ZERO,
            take_profit_pips: Decimal::ZERO,
            trailing_stop_pips: Decimal::ZERO,
            trailing_step_pips: Decimal::ZERO,
            exit_priority: ExitPriority::StopFirst,
            require_trailing_step: true,
        }
    }
}

impl BracketConfig {
    /// Fixed stop and take, no trailing.
    pub fn fixed(stop_loss_pips: Decimal, take_profit_pips: Decimal) -> Self {
        Self {
            stop_loss_pips,
            take_profit_pips,
            ..Self::default()
        }
    }

    /// Add a trailing stop.
    pub fn with_trailing(mut self, trailing_stop_pips: Decimal, trailing_step_pips: Decimal) -> Self {
        self.trailing_stop_pips = trailing_stop_pips;
        self.trailing_step_pips = trailing_step_pips;
        self
    }

    pub fn with_priority(mut self, exit_priority: ExitPriority) -> Self {
        self.exit_priority = exit_priority;
        self
    }

    pub fn validate(&self) -> Result<(), RiskError> {
        let distances = [
            ("stop_loss_pips", self.stop_loss_pips),
            ("take_profit_pips", self.take_profit_pips),
            ("trailing_stop_pips", self.trailing_stop_pips),
            ("trailing_step_pips", self.trailing_step_pips),
        ];
        for (name, value) in distances {
            if value < Decimal::ZERO {
                return Err(RiskError::InvalidConfig(format!(
                    "{name} must not be negative, got {value}"
                )));
            }
        }

        if self.require_trailing_step
            && self.trailing_stop_pips > Decimal::ZERO
            && self.trailing_step_pips <= Decimal::ZERO
        {
            return Err(RiskError::InvalidConfig(
                "trailing_step_pips must be positive when a trailing stop is enabled".into(),
            ));
        }

        Ok(())
    }
}

/// Protective levels attached to the open position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionBracket {
    pub direction: Direction,
    pub entry_price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    /// Stop after the trailing logic has moved it; supersedes `stop_loss`
    pub trailing_stop: Option<Decimal>,
}

impl PositionBracket {
    /// Stop currently protecting the position.
    pub fn active_stop(&self) -> Option<Decimal> {
        self.trailing_stop.or(self.stop_loss)
    }

    pub fn is_flat(&self) -> bool {
        self.direction.is_flat()
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// What closed the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitTrigger {
    StopLoss,
    TakeProfit,
    TrailingStop,
}

impl std::fmt::Display for ExitTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitTrigger::StopLoss => write!(f, "stop-loss"),
            ExitTrigger::TakeProfit => write!(f, "take-profit"),
            ExitTrigger::TrailingStop => write!(f, "trailing stop"),
        }
    }
}

/// Instruction to flatten the position at `level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketExit {
    pub trigger: ExitTrigger,
    pub direction: Direction,
    pub level: Decimal,
}

impl BracketExit {
    /// Price the exit fills at on a bar that opened at `open`.
    ///
    /// A bar opening beyond the level fills at the open, which is worse than
    /// the level for stops and better for a take-profit.
    pub fn fill_price(&self, open: Decimal) -> Decimal {
        let level_below = match self.trigger {
            ExitTrigger::StopLoss | ExitTrigger::TrailingStop => self.direction == Direction::Long,
            ExitTrigger::TakeProfit => self.direction == Direction::Short,
        };
        match self.direction {
            Direction::Flat => self.level,
            _ if level_below => self.level.min(open),
            _ => self.level.max(open),
        }
    }
}

/// Maintains the bracket of one strategy instance across bars.
#[derive(Debug, Clone)]
pub struct BracketRiskManager {
    config: BracketConfig,
    stop_distance: Decimal,
    take_distance: Decimal,
    trailing_distance: Decimal,
    trailing_step: Decimal,
    bracket: PositionBracket,
}

impl BracketRiskManager {
    /// Create a manager converting pip distances with `pip_size`.
    pub fn new(config: BracketConfig, pip_size: Decimal) -> Self {
        Self {
            stop_distance: config.stop_loss_pips * pip_size,
            take_distance: config.take_profit_pips * pip_size,
            trailing_distance: config.trailing_stop_pips * pip_size,
            trailing_step: config.trailing_step_pips.max(Decimal::ZERO) * pip_size,
            config,
            bracket: PositionBracket::default(),
        }
    }

    /// Create a manager using the instrument's pip size.
    pub fn for_instrument(config: BracketConfig, instrument: &Instrument) -> Self {
        Self::new(config, instrument.pip_size())
    }

    /// Set the initial levels after an entry fill.
    pub fn on_entry_filled(&mut self, direction: Direction, entry_price: Decimal) {
        self.bracket.clear();
        if direction.is_flat() {
            return;
        }

        let sign = match direction {
            Direction::Long => Decimal::ONE,
            _ => -Decimal::ONE,
        };

        self.bracket.direction = direction;
        self.bracket.entry_price = Some(entry_price);
        if self.stop_distance > Decimal::ZERO {
            self.bracket.stop_loss = Some(entry_price - sign * self.stop_distance);
        }
        if self.take_distance > Decimal::ZERO {
            self.bracket.take_profit = Some(entry_price + sign * self.take_distance);
        }

        debug!(
            %direction,
            %entry_price,
            stop = ?self.bracket.stop_loss,
            take = ?self.bracket.take_profit,
            "bracket armed"
        );
    }

    /// Evaluate a finished bar.
    ///
    /// Exits are checked against the levels that were in force when the bar
    /// opened; the trailing stop only ratchets when the bar did not exit.
    pub fn on_bar(&mut self, high: Decimal, low: Decimal, close: Decimal) -> Option<BracketExit> {
        let direction = self.bracket.direction;
        let entry = self.bracket.entry_price?;
        if direction.is_flat() {
            return None;
        }

        if let Some(exit) = self.check_exit(high, low) {
            return Some(exit);
        }

        if self.trailing_distance > Decimal::ZERO {
            self.ratchet(entry, close);
        }
        None
    }

    fn check_exit(&self, high: Decimal, low: Decimal) -> Option<BracketExit> {
        let direction = self.bracket.direction;
        let stop = self.bracket.active_stop();
        let take = self.bracket.take_profit;

        let (stop_hit, take_hit) = match direction {
            Direction::Long => (
                stop.is_some_and(|s| low <= s),
                take.is_some_and(|t| high >= t),
            ),
            Direction::Short => (
                stop.is_some_and(|s| high >= s),
                take.is_some_and(|t| low <= t),
            ),
            Direction::Flat => return None,
        };

        let stop_exit = stop.filter(|_| stop_hit).map(|level| BracketExit {
            trigger: if self.bracket.trailing_stop.is_some() {
                ExitTrigger::TrailingStop
            } else {
                ExitTrigger::StopLoss
            },
            direction,
            level,
        });
        let take_exit = take.filter(|_| take_hit).map(|level| BracketExit {
            trigger: ExitTrigger::TakeProfit,
            direction,
            level,
        });

        match self.config.exit_priority {
            ExitPriority::StopFirst => stop_exit.or(take_exit),
            ExitPriority::TakeFirst => take_exit.or(stop_exit),
        }
    }

    fn ratchet(&mut self, entry: Decimal, close: Decimal) {
        let (excursion, candidate) = match self.bracket.direction {
            Direction::Long => (close - entry, close - self.trailing_distance),
            Direction::Short => (entry - close, close + self.trailing_distance),
            Direction::Flat => return,
        };

        if excursion <= self.trailing_distance + self.trailing_step {
            return;
        }

        let improves = match self.bracket.active_stop() {
            None => true,
            Some(stop) => {
                let gain = match self.bracket.direction {
                    Direction::Long => candidate - stop,
                    _ => stop - candidate,
                };
                gain > Decimal::ZERO && gain >= self.trailing_step
            }
        };

        if improves {
            debug!(
                previous = ?self.bracket.active_stop(),
                %candidate,
                "trailing stop moved"
            );
            self.bracket.trailing_stop = Some(candidate);
        }
    }

    /// Clear every level. Safe to call repeatedly.
    pub fn reset(&mut self) {
        self.bracket.clear();
    }

    pub fn bracket(&self) -> &PositionBracket {
        &self.bracket
    }

    pub fn is_active(&self) -> bool {
        !self.bracket.is_flat()
    }

    pub fn config(&self) -> &BracketConfig {
        &self.config
    }

    pub fn stop_distance(&self) -> Decimal {
        self.stop_distance
    }

    pub fn take_distance(&self) -> Decimal {
        self.take_distance
    }

    pub fn trailing_distance(&self) -> Decimal {
        self.trailing_distance
    }

    pub fn trailing_step(&self) -> Decimal {
        self.trailing_step
    }
}
