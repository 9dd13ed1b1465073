//! Performance summary over recorded trades

use serde::{Deserialize, Serialize};

use crate::trade::Trade;

/// Aggregate statistics over a bot's closed trades.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_trades: usize,
    pub open_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub total_profit: f64,
    pub total_profit_percent: f64,
    pub best_trade_percent: f64,
    pub worst_trade_percent: f64,
}

/// Summarize a bot's trade history. Open trades are counted but carry no
/// P&L until they close.
pub fn summarize(trades: &[Trade]) -> PerformanceSummary {
    let mut summary = PerformanceSummary::default();
    summary.open_trades = trades.iter().filter(|t| t.is_open()).count();

    let closed: Vec<&Trade> = trades.iter().filter(|t| !t.is_open()).collect();
    summary.total_trades = closed.len();
    if closed.is_empty() {
        return summary;
    }

    // seeded so an all-losing history reports a negative best trade
    summary.best_trade_percent = f64::NEG_INFINITY;
    summary.worst_trade_percent = f64::INFINITY;
    for trade in &closed {
        let pnl = trade.profit_loss.unwrap_or(0.0);
        let pnl_percent = trade.profit_loss_percent.unwrap_or(0.0);
        if pnl > 0.0 {
            summary.winning_trades += 1;
        } else if pnl < 0.0 {
            summary.losing_trades += 1;
        }
        summary.total_profit += pnl;
        summary.total_profit_percent += pnl_percent;
        summary.best_trade_percent = summary.best_trade_percent.max(pnl_percent);
        summary.worst_trade_percent = summary.worst_trade_percent.min(pnl_percent);
    }
    summary.win_rate = summary.winning_trades as f64 / closed.len() as f64 * 100.0;
    summary
}
