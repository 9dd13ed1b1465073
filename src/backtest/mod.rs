//! Backtesting engine
//!
//! Replays a bot configuration over historical candles with the same
//! decision logic the live runtime uses, then summarizes the outcome.

pub mod engine;
pub mod metrics;

pub use engine::{run_backtest, BacktestResult, EquityPoint, PositionEvent};
pub use metrics::{max_drawdown, profit_factor, sharpe_ratio};
