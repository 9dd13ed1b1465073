//! Trade records and the position lifecycle state machine

pub mod lifecycle;

pub use lifecycle::{decide, Action, DecisionContext};

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Buy,
    Sell,
}

/// Trade status; `Closed` is terminal per trade, the bot cycles back to
/// no-position afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
}

/// Why a trade was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Tp,
    Sl,
    ConditionChange,
    Manual,
    BotShutdown,
}

/// One simulated/paper trade. Created on entry, closed exactly once,
/// never deleted. At most one open trade exists per bot at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub bot_id: i64,
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub status: TradeStatus,
    pub quantity: f64,
    #[serde(default)]
    pub tp_price: Option<f64>,
    #[serde(default)]
    pub sl_price: Option<f64>,
    #[serde(default)]
    pub exit_price: Option<f64>,
    #[serde(default)]
    pub exit_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exit_reason: Option<ExitReason>,
    #[serde(default)]
    pub profit_loss: Option<f64>,
    #[serde(default)]
    pub profit_loss_percent: Option<f64>,
    /// Indicator values captured at entry, for later inspection.
    #[serde(default)]
    pub indicator_values: HashMap<String, f64>,
}

impl Trade {
    /// Open a new trade at the given price.
    pub fn open(
        bot_id: i64,
        direction: Direction,
        entry_price: f64,
        entry_time: DateTime<Utc>,
        tp_price: Option<f64>,
        sl_price: Option<f64>,
        indicator_values: HashMap<String, f64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            bot_id,
            direction,
            entry_price,
            entry_time,
            status: TradeStatus::Open,
            quantity: 1.0,
            tp_price,
            sl_price,
            exit_price: None,
            exit_time: None,
            exit_reason: None,
            profit_loss: None,
            profit_loss_percent: None,
            indicator_values,
        }
    }

    /// Close the trade and compute realized P&L.
    ///
    /// Long: `(exit - entry) * qty`; short: `(entry - exit) * qty`;
    /// percent is P&L over the entry value.
    pub fn close(&mut self, exit_price: f64, exit_time: DateTime<Utc>, reason: ExitReason) {
        let pnl = match self.direction {
            Direction::Buy => (exit_price - self.entry_price) * self.quantity,
            Direction::Sell => (self.entry_price - exit_price) * self.quantity,
        };
        let entry_value = self.entry_price * self.quantity;
        let pnl_percent = if entry_value == 0.0 {
            0.0
        } else {
            pnl / entry_value * 100.0
        };
        self.status = TradeStatus::Closed;
        self.exit_price = Some(exit_price);
        self.exit_time = Some(exit_time);
        self.exit_reason = Some(reason);
        self.profit_loss = Some(pnl);
        self.profit_loss_percent = Some(pnl_percent);
    }

    /// Force-close with zero P&L, used when a bot is shut down and no
    /// meaningful exit price is available.
    pub fn force_close(&mut self, exit_time: DateTime<Utc>) {
        self.status = TradeStatus::Closed;
        self.exit_price = Some(self.entry_price);
        self.exit_time = Some(exit_time);
        self.exit_reason = Some(ExitReason::BotShutdown);
        self.profit_loss = Some(0.0);
        self.profit_loss_percent = Some(0.0);
    }

    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }
}
