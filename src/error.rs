//! Engine error taxonomy

use thiserror::Error;

/// Errors produced by the trading engine core.
///
/// Evaluation failures inside a decision cycle never escape the bot runtime:
/// `UnresolvedVariable` fails closed to `false`, indicator problems surface
/// as undefined series entries, and `DataUnavailable` skips the cycle.
/// Controller operations (`start`/`stop`/`restart`) surface errors to the
/// caller and leave the registry unchanged.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed expression, rejected at compile time.
    #[error("syntax error in expression: {0}")]
    Syntax(String),

    /// A condition referenced a variable absent from the evaluation row.
    #[error("unresolved variable `{0}`")]
    UnresolvedVariable(String),

    /// Arithmetic failure while evaluating a compiled expression.
    #[error("evaluation error: {0}")]
    Eval(String),

    /// The market data source returned nothing after retries.
    #[error("market data unavailable for {symbol} {timeframe}")]
    DataUnavailable { symbol: String, timeframe: String },

    /// An indicator could not be computed for the given input.
    #[error("indicator `{indicator}` failed: {message}")]
    IndicatorCompute { indicator: String, message: String },

    /// The persistence store rejected a write.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The notifier failed to deliver; logged and swallowed by callers.
    #[error("notifier error: {0}")]
    Notifier(String),

    /// The bot configuration is incomplete or inconsistent.
    #[error("invalid bot config: {0}")]
    InvalidConfig(String),

    /// `start` was called while a runtime for this bot is registered.
    #[error("bot {bot_id} of user {user_id} is already running")]
    AlreadyRunning { user_id: i64, bot_id: i64 },

    /// A controller operation targeted a bot with no registered runtime.
    #[error("bot {bot_id} of user {user_id} is not running")]
    NotRunning { user_id: i64, bot_id: i64 },
}
