//! Pure decision logic for one evaluation cycle
//!
//! Given the current position (if any), one evaluated variable row and the
//! bot's compiled conditions, [`decide`] returns the single action for this
//! cycle. It performs no I/O and holds no state, so the live runtime and the
//! backtest engine share it verbatim.

use crate::config::{BotType, EntryPrecedence};
use crate::expr::{CompiledExpression, VarMap};
use crate::trade::{Direction, ExitReason, Trade};

/// Compiled conditions plus the exit policy of one bot.
pub struct DecisionContext {
    pub bot_type: BotType,
    pub entry_precedence: EntryPrecedence,
    pub buy: CompiledExpression,
    pub sell: CompiledExpression,
    pub tp: Option<CompiledExpression>,
    pub sl: Option<CompiledExpression>,
}

/// Outcome of one evaluation cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Open {
        direction: Direction,
        tp_price: Option<f64>,
        sl_price: Option<f64>,
    },
    Close {
        reason: ExitReason,
    },
    Hold,
}

/// Decide the action for one cycle.
///
/// With an open position, exits are checked in a fixed order: take-profit,
/// then stop-loss, then (standard bots only) whether the condition that
/// opened the position still holds. Without a position, the entry
/// conditions are checked in the configured precedence order.
pub fn decide(open: Option<&Trade>, row: &VarMap, ctx: &DecisionContext) -> Action {
    match open {
        Some(trade) => decide_exit(trade, row, ctx),
        None => decide_entry(row, ctx),
    }
}

fn decide_entry(row: &VarMap, ctx: &DecisionContext) -> Action {
    let Some(price) = row.get("close").copied() else {
        return Action::Hold;
    };
    let ordered = match ctx.entry_precedence {
        EntryPrecedence::BuyFirst => [(Direction::Buy, &ctx.buy), (Direction::Sell, &ctx.sell)],
        EntryPrecedence::SellFirst => [(Direction::Sell, &ctx.sell), (Direction::Buy, &ctx.buy)],
    };
    for (direction, condition) in ordered {
        if condition.evaluate_bool(row) {
            return Action::Open {
                direction,
                tp_price: resolve_target(ctx.tp.as_ref(), row, price, direction, true),
                sl_price: resolve_target(ctx.sl.as_ref(), row, price, direction, false),
            };
        }
    }
    Action::Hold
}

fn decide_exit(trade: &Trade, row: &VarMap, ctx: &DecisionContext) -> Action {
    let Some(price) = row.get("close").copied() else {
        return Action::Hold;
    };

    if let Some(tp) = trade.tp_price {
        let hit = match trade.direction {
            Direction::Buy => price >= tp,
            Direction::Sell => price <= tp,
        };
        if hit {
            return Action::Close {
                reason: ExitReason::Tp,
            };
        }
    }
    if let Some(sl) = trade.sl_price {
        let hit = match trade.direction {
            Direction::Buy => price <= sl,
            Direction::Sell => price >= sl,
        };
        if hit {
            return Action::Close {
                reason: ExitReason::Sl,
            };
        }
    }

    if ctx.bot_type == BotType::Standard {
        let opening = match trade.direction {
            Direction::Buy => &ctx.buy,
            Direction::Sell => &ctx.sell,
        };
        if !opening.evaluate_bool(row) {
            return Action::Close {
                reason: ExitReason::ConditionChange,
            };
        }
    }
    Action::Hold
}

/// Resolve a TP/SL expression into a target price.
///
/// A result with magnitude above 10 is taken as an absolute price; smaller
/// values are a percent offset from entry, applied in the profitable
/// direction for take-profit and the adverse one for stop-loss. Evaluation
/// failures leave the target unset.
fn resolve_target(
    expr: Option<&CompiledExpression>,
    row: &VarMap,
    entry_price: f64,
    direction: Direction,
    is_tp: bool,
) -> Option<f64> {
    let value = expr?.evaluate_number(row).ok()?;
    if value.abs() > 10.0 {
        return Some(value.abs());
    }
    let offset = entry_price * value.abs() / 100.0;
    let favorable = matches!(direction, Direction::Buy) == is_tp;
    Some(if favorable {
        entry_price + offset
    } else {
        entry_price - offset
    })
}
