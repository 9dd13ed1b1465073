//! Trade and bot-state persistence
//!
//! Runtimes record every state change through [`TradeStore`] before any
//! notification is sent, so the store is always at least as current as
//! what the user sees. The in-memory implementation backs tests and the
//! standalone paper-trading mode.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::BotConfig;
use crate::error::EngineError;
use crate::trade::Trade;

/// Durable record of trades and bot running state.
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// Record a newly opened trade.
    async fn insert_trade(&self, trade: &Trade) -> Result<(), EngineError>;

    /// Record a close (or any mutation) of an existing trade.
    async fn update_trade(&self, trade: &Trade) -> Result<(), EngineError>;

    /// The open trade for a bot, if one exists.
    async fn open_trade(&self, bot_id: i64) -> Result<Option<Trade>, EngineError>;

    /// All trades ever recorded for a bot, oldest first.
    async fn trades_for_bot(&self, bot_id: i64) -> Result<Vec<Trade>, EngineError>;

    /// Persist whether the bot is currently running.
    async fn set_running(&self, bot_id: i64, running: bool) -> Result<(), EngineError>;

    /// Persist a (possibly updated) bot configuration.
    async fn save_config(&self, config: &BotConfig) -> Result<(), EngineError>;

    /// The persisted configuration for a bot, if any.
    async fn load_config(&self, bot_id: i64) -> Result<Option<BotConfig>, EngineError>;
}

/// In-memory [`TradeStore`].
#[derive(Debug, Default)]
pub struct MemoryTradeStore {
    trades: RwLock<Vec<Trade>>,
    running: RwLock<HashMap<i64, bool>>,
    configs: RwLock<HashMap<i64, BotConfig>>,
}

impl MemoryTradeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self, bot_id: i64) -> bool {
        let running = self.running.read().unwrap_or_else(|e| e.into_inner());
        running.get(&bot_id).copied().unwrap_or(false)
    }

    pub fn config(&self, bot_id: i64) -> Option<BotConfig> {
        let configs = self.configs.read().unwrap_or_else(|e| e.into_inner());
        configs.get(&bot_id).cloned()
    }
}

#[async_trait]
impl TradeStore for MemoryTradeStore {
    async fn insert_trade(&self, trade: &Trade) -> Result<(), EngineError> {
        let mut trades = self.trades.write().unwrap_or_else(|e| e.into_inner());
        trades.push(trade.clone());
        Ok(())
    }

    async fn update_trade(&self, trade: &Trade) -> Result<(), EngineError> {
        let mut trades = self.trades.write().unwrap_or_else(|e| e.into_inner());
        let slot = trades
            .iter_mut()
            .find(|t| t.id == trade.id)
            .ok_or_else(|| EngineError::Persistence(unknown_trade(trade.id)))?;
        *slot = trade.clone();
        Ok(())
    }

    async fn open_trade(&self, bot_id: i64) -> Result<Option<Trade>, EngineError> {
        let trades = self.trades.read().unwrap_or_else(|e| e.into_inner());
        Ok(trades
            .iter()
            .find(|t| t.bot_id == bot_id && t.is_open())
            .cloned())
    }

    async fn trades_for_bot(&self, bot_id: i64) -> Result<Vec<Trade>, EngineError> {
        let trades = self.trades.read().unwrap_or_else(|e| e.into_inner());
        Ok(trades
            .iter()
            .filter(|t| t.bot_id == bot_id)
            .cloned()
            .collect())
    }

    async fn set_running(&self, bot_id: i64, running: bool) -> Result<(), EngineError> {
        let mut map = self.running.write().unwrap_or_else(|e| e.into_inner());
        map.insert(bot_id, running);
        Ok(())
    }

    async fn save_config(&self, config: &BotConfig) -> Result<(), EngineError> {
        let mut configs = self.configs.write().unwrap_or_else(|e| e.into_inner());
        configs.insert(config.id, config.clone());
        Ok(())
    }

    async fn load_config(&self, bot_id: i64) -> Result<Option<BotConfig>, EngineError> {
        let configs = self.configs.read().unwrap_or_else(|e| e.into_inner());
        Ok(configs.get(&bot_id).cloned())
    }
}

fn unknown_trade(id: Uuid) -> String {
    format!("trade {} not found", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trade::{Direction, ExitReason};
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_open_trade_roundtrip() {
        let store = MemoryTradeStore::new();
        let t0 = Utc.timestamp_opt(0, 0).unwrap();
        let mut trade = Trade::open(7, Direction::Buy, 100.0, t0, None, None, HashMap::new());
        store.insert_trade(&trade).await.unwrap();

        let open = store.open_trade(7).await.unwrap().unwrap();
        assert_eq!(open.id, trade.id);

        trade.close(110.0, t0, ExitReason::Tp);
        store.update_trade(&trade).await.unwrap();
        assert!(store.open_trade(7).await.unwrap().is_none());
        assert_eq!(store.trades_for_bot(7).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_trade_fails() {
        let store = MemoryTradeStore::new();
        let t0 = Utc.timestamp_opt(0, 0).unwrap();
        let trade = Trade::open(7, Direction::Buy, 100.0, t0, None, None, HashMap::new());
        assert!(store.update_trade(&trade).await.is_err());
    }

    #[tokio::test]
    async fn test_config_roundtrip() {
        let store = MemoryTradeStore::new();
        assert!(store.load_config(1).await.unwrap().is_none());
        let config = BotConfig {
            id: 1,
            ..Default::default()
        };
        store.save_config(&config).await.unwrap();
        assert_eq!(store.load_config(1).await.unwrap().unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_running_flag() {
        let store = MemoryTradeStore::new();
        assert!(!store.is_running(1));
        store.set_running(1, true).await.unwrap();
        assert!(store.is_running(1));
    }
}
