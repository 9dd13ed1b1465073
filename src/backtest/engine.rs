//! Backtest simulation loop

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backtest::metrics::{max_drawdown, profit_factor, sharpe_ratio};
use crate::config::BotConfig;
use crate::data::{Candle, CandleSeries};
use crate::error::EngineError;
use crate::runtime::BotPlan;
use crate::trade::{decide, Action, Direction, ExitReason, Trade};

/// Equity after each closed trade; the curve starts at 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub time: DateTime<Utc>,
    pub equity: f64,
}

/// One completed position from the simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionEvent {
    pub direction: Direction,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    pub profit_percent: f64,
}

/// Aggregate outcome of one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Percent of trades with positive P&L.
    pub win_rate: f64,
    /// Sum of per-trade percent returns.
    pub total_profit_percent: f64,
    pub average_profit_percent: f64,
    /// Gross profit / gross loss; `None` means no losing trades.
    pub profit_factor: Option<f64>,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    /// Compounded equity at the end, starting from 100.
    pub final_equity: f64,
    pub equity_curve: Vec<EquityPoint>,
    pub positions: Vec<PositionEvent>,
}

impl BacktestResult {
    fn empty() -> Self {
        Self {
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: 0.0,
            total_profit_percent: 0.0,
            average_profit_percent: 0.0,
            profit_factor: Some(0.0),
            max_drawdown: 0.0,
            sharpe_ratio: 0.0,
            final_equity: 100.0,
            equity_curve: Vec::new(),
            positions: Vec::new(),
        }
    }
}

/// Replay a bot over a historical candle range.
///
/// Runs the exact decision logic the live runtime uses, bar by bar in
/// ascending time order. A position still open after the last bar is
/// closed at the final close price with a manual exit. Deterministic:
/// the same config and candles always produce the same result.
pub fn run_backtest(
    config: &BotConfig,
    candles: Vec<Candle>,
) -> Result<BacktestResult, EngineError> {
    let plan = BotPlan::new(config.clone())?;
    if candles.is_empty() {
        return Ok(BacktestResult::empty());
    }

    let mut series = CandleSeries::from(candles);
    series.sort_by_time();
    let table = plan.column_table(&series);

    let mut open: Option<Trade> = None;
    let mut closed: Vec<Trade> = Vec::new();
    let mut equity = 100.0;
    let mut equity_curve = vec![EquityPoint {
        time: series.get(0).map(|c| c.time).unwrap_or_else(Utc::now),
        equity,
    }];

    for index in 0..series.len() {
        let row = plan.variable_row_at(&series, &table, index);
        // candle exists for every index we iterate
        let Some(candle) = series.get(index) else {
            continue;
        };
        match decide(open.as_ref(), &row, &plan.ctx) {
            Action::Open {
                direction,
                tp_price,
                sl_price,
            } => {
                open = Some(Trade::open(
                    config.id,
                    direction,
                    candle.close,
                    candle.time,
                    tp_price,
                    sl_price,
                    plan.indicator_snapshot(&row),
                ));
            }
            Action::Close { reason } => {
                if let Some(mut trade) = open.take() {
                    trade.close(candle.close, candle.time, reason);
                    settle(&trade, &mut equity, &mut equity_curve);
                    closed.push(trade);
                }
            }
            Action::Hold => {}
        }
    }

    // end of range: flatten any remaining position at the last close
    if let Some(mut trade) = open.take() {
        if let Some(last) = series.last() {
            trade.close(last.close, last.time, ExitReason::Manual);
            settle(&trade, &mut equity, &mut equity_curve);
            closed.push(trade);
        }
    }

    Ok(summarize(&closed, equity, equity_curve))
}

fn settle(trade: &Trade, equity: &mut f64, curve: &mut Vec<EquityPoint>) {
    let pnl_percent = trade.profit_loss_percent.unwrap_or(0.0);
    *equity *= 1.0 + pnl_percent / 100.0;
    if let Some(time) = trade.exit_time {
        curve.push(EquityPoint {
            time,
            equity: *equity,
        });
    }
}

fn summarize(closed: &[Trade], equity: f64, curve: Vec<EquityPoint>) -> BacktestResult {
    let returns: Vec<f64> = closed
        .iter()
        .map(|t| t.profit_loss_percent.unwrap_or(0.0))
        .collect();
    let total = closed.len();
    let winning = returns.iter().filter(|r| **r > 0.0).count();
    let losing = returns.iter().filter(|r| **r < 0.0).count();
    let total_profit: f64 = returns.iter().sum();

    let positions = closed
        .iter()
        .map(|t| PositionEvent {
            direction: t.direction,
            entry_time: t.entry_time,
            entry_price: t.entry_price,
            exit_time: t.exit_time.unwrap_or(t.entry_time),
            exit_price: t.exit_price.unwrap_or(t.entry_price),
            exit_reason: t.exit_reason.unwrap_or(ExitReason::Manual),
            profit_percent: t.profit_loss_percent.unwrap_or(0.0),
        })
        .collect();

    let equity_values: Vec<f64> = curve.iter().map(|p| p.equity).collect();
    BacktestResult {
        total_trades: total,
        winning_trades: winning,
        losing_trades: losing,
        win_rate: if total == 0 {
            0.0
        } else {
            winning as f64 / total as f64 * 100.0
        },
        total_profit_percent: total_profit,
        average_profit_percent: if total == 0 {
            0.0
        } else {
            total_profit / total as f64
        },
        profit_factor: profit_factor(&returns),
        max_drawdown: max_drawdown(&equity_values),
        sharpe_ratio: sharpe_ratio(&returns),
        final_equity: equity,
        equity_curve: curve,
        positions,
    }
}
