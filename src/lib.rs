//! Papertrader: a condition-driven paper-trading and backtesting engine
//!
//! Users describe a strategy as short textual conditions over market data
//! and technical indicators. The engine runs that strategy continuously
//! (paper-trading) or against historical data (backtesting):
//!
//! - **Expression Evaluator**: compiles and safely evaluates user conditions
//! - **Technical Indicators**: SMA, EMA, RSI, MACD, BB, Stochastic, ATR,
//!   OBV, ADX, VWAP, MFI computed over OHLCV candles
//! - **Trade Lifecycle**: position open/close transitions and P&L
//! - **Bot Runtime**: one polling control loop per active bot
//! - **Bot Controller**: supervises all runtimes, restarts dead workers
//! - **Backtesting**: replays the same logic over a historical range
//!
//! # Example
//!
//! ```no_run
//! use papertrader::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let settings = EngineSettings::from_env()?;
//!     let market = Arc::new(CandleStore::new());
//!     let store = Arc::new(MemoryTradeStore::new());
//!     let notifier = Arc::new(LogNotifier);
//!     let controller = BotController::new(settings, market, store, notifier);
//!     let config = BotConfig::default();
//!     controller.start(config).await?;
//!     Ok(())
//! }
//! ```

pub mod backtest;
pub mod config;
pub mod controller;
pub mod data;
pub mod error;
pub mod expr;
pub mod indicators;
pub mod market;
pub mod notify;
pub mod performance;
pub mod persist;
pub mod runtime;
pub mod trade;

// Re-export commonly used types
pub mod prelude {
    pub use crate::backtest::*;
    pub use crate::config::*;
    pub use crate::controller::*;
    pub use crate::data::*;
    pub use crate::error::EngineError;
    pub use crate::expr::*;
    pub use crate::indicators::*;
    pub use crate::market::*;
    pub use crate::notify::*;
    pub use crate::performance::*;
    pub use crate::persist::*;
    pub use crate::runtime::*;
    pub use crate::trade::*;

    pub use anyhow::{Context, Result};
}

/// Result type alias
pub type Result<T> = anyhow::Result<T>;
