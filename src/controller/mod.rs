//! Bot controller
//!
//! The controller owns the registry of running bots, keyed by
//! `(user_id, bot_id)` so identically-numbered bots of different users
//! never collide. Start/stop/restart/update are serialized through one
//! lock; a background monitor restarts workers whose tasks have died.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::config::{BotConfig, BotConfigPatch, EngineSettings};
use crate::error::EngineError;
use crate::market::MarketDataSource;
use crate::notify::{Notifier, TradeSignal};
use crate::persist::TradeStore;
use crate::runtime::{BotPlan, BotRuntime};

/// Handle to one running bot worker.
struct BotHandle {
    config: BotConfig,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Supervises all running bot workers.
pub struct BotController {
    settings: EngineSettings,
    market: Arc<dyn MarketDataSource>,
    store: Arc<dyn TradeStore>,
    notifier: Arc<dyn Notifier>,
    bots: Mutex<HashMap<(i64, i64), BotHandle>>,
}

impl BotController {
    pub fn new(
        settings: EngineSettings,
        market: Arc<dyn MarketDataSource>,
        store: Arc<dyn TradeStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            market,
            store,
            notifier,
            bots: Mutex::new(HashMap::new()),
        }
    }

    /// Start a bot. Fails when the same (user, bot) pair is already
    /// running, the configuration does not validate, or the market has no
    /// data for the configured pair yet.
    pub async fn start(&self, config: BotConfig) -> Result<(), EngineError> {
        let key = config.key();
        let mut bots = self.bots.lock().await;
        if let Some(handle) = bots.get(&key) {
            if !handle.task.is_finished() {
                return Err(EngineError::AlreadyRunning {
                    user_id: key.0,
                    bot_id: key.1,
                });
            }
            // stale entry from a crashed worker
            bots.remove(&key);
        }

        let probe = self
            .market
            .get_last_candle(&config.symbol, &config.timeframe)
            .await?;
        if probe.is_none() {
            return Err(EngineError::DataUnavailable {
                symbol: config.symbol.clone(),
                timeframe: config.timeframe.clone(),
            });
        }

        let handle = self.spawn_worker(config.clone())?;
        self.store.save_config(&config).await?;
        self.store.set_running(config.id, true).await?;
        bots.insert(key, handle);
        tracing::info!(user_id = key.0, bot_id = key.1, "bot started");
        Ok(())
    }

    /// Stop a bot, waiting a bounded time for its worker to exit.
    pub async fn stop(&self, user_id: i64, bot_id: i64) -> Result<(), EngineError> {
        let key = (user_id, bot_id);
        let mut bots = self.bots.lock().await;
        let handle = bots
            .remove(&key)
            .ok_or(EngineError::NotRunning { user_id, bot_id })?;
        drop(bots);

        let _ = handle.stop.send(true);
        if tokio::time::timeout(self.settings.stop_join_timeout, handle.task)
            .await
            .is_err()
        {
            // leaked loop: the worker is abandoned, so flatten its trade here
            tracing::warn!(user_id, bot_id, "worker did not exit in time");
            if let Some(mut trade) = self.store.open_trade(bot_id).await? {
                trade.force_close(chrono::Utc::now());
                self.store.update_trade(&trade).await?;
                let signal = TradeSignal {
                    bot_name: handle.config.name.clone(),
                    action: "CLOSE (bot shutdown)".to_string(),
                    symbol: handle.config.symbol.clone(),
                    price: trade.exit_price.unwrap_or(trade.entry_price),
                    details: trade.profit_loss_percent.map(|p| format!("P&L {:+.2}%", p)),
                    target: handle.config.notification_target.clone(),
                };
                if let Err(err) = self.notifier.send(&signal).await {
                    tracing::warn!(user_id, bot_id, %err, "notification failed");
                }
            }
        }
        self.store.set_running(bot_id, false).await?;
        tracing::info!(user_id, bot_id, "bot stopped");
        Ok(())
    }

    /// Stop, then start with the same configuration.
    pub async fn restart(&self, user_id: i64, bot_id: i64) -> Result<(), EngineError> {
        let config = {
            let bots = self.bots.lock().await;
            bots.get(&(user_id, bot_id))
                .map(|h| h.config.clone())
                .ok_or(EngineError::NotRunning { user_id, bot_id })?
        };
        self.stop(user_id, bot_id).await?;
        self.start(config).await
    }

    /// Apply a whitelisted patch to a bot's configuration and persist it.
    /// A running bot is restarted so the new conditions take effect; an
    /// idle bot just has its stored configuration updated. The patched
    /// config is persisted before any restart, and a rejected patch
    /// changes nothing.
    pub async fn update_config(
        &self,
        user_id: i64,
        bot_id: i64,
        patch: BotConfigPatch,
    ) -> Result<(), EngineError> {
        let running = {
            let bots = self.bots.lock().await;
            bots.get(&(user_id, bot_id)).map(|h| h.config.clone())
        };
        let mut config = match running.clone() {
            Some(config) => config,
            None => self
                .store
                .load_config(bot_id)
                .await?
                .filter(|c| c.user_id == user_id)
                .ok_or_else(|| {
                    EngineError::InvalidConfig(format!(
                        "no configuration for bot {} of user {}",
                        bot_id, user_id
                    ))
                })?,
        };
        patch.apply(&mut config);
        config.validate()?;
        self.store.save_config(&config).await?;

        if running.is_some() {
            self.stop(user_id, bot_id).await?;
            self.start(config).await?;
        }
        Ok(())
    }

    /// Whether a bot's worker is currently alive.
    pub async fn is_running(&self, user_id: i64, bot_id: i64) -> bool {
        let bots = self.bots.lock().await;
        bots.get(&(user_id, bot_id))
            .map(|h| !h.task.is_finished())
            .unwrap_or(false)
    }

    /// Keys of all registered bots.
    pub async fn running_bots(&self) -> Vec<(i64, i64)> {
        let bots = self.bots.lock().await;
        bots.keys().copied().collect()
    }

    /// Spawn the health monitor: scans the registry periodically and
    /// respawns workers whose tasks have finished without being stopped.
    pub fn spawn_monitor(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        let interval = std::time::Duration::from_secs(self.settings.monitor_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                controller.revive_dead_workers().await;
            }
        })
    }

    async fn revive_dead_workers(&self) {
        let mut bots = self.bots.lock().await;
        let dead: Vec<(i64, i64)> = bots
            .iter()
            .filter(|(_, h)| h.task.is_finished())
            .map(|(k, _)| *k)
            .collect();
        for key in dead {
            let Some(old) = bots.remove(&key) else {
                continue;
            };
            tracing::warn!(user_id = key.0, bot_id = key.1, "worker died, restarting");
            match self.spawn_worker(old.config) {
                Ok(handle) => {
                    bots.insert(key, handle);
                }
                Err(err) => {
                    tracing::error!(user_id = key.0, bot_id = key.1, %err, "restart failed");
                }
            }
        }
    }

    /// Stop every bot; used at process shutdown.
    pub async fn shutdown(&self) {
        let keys = self.running_bots().await;
        for (user_id, bot_id) in keys {
            if let Err(err) = self.stop(user_id, bot_id).await {
                tracing::warn!(user_id, bot_id, %err, "stop during shutdown failed");
            }
        }
    }

    fn spawn_worker(&self, config: BotConfig) -> Result<BotHandle, EngineError> {
        let plan = BotPlan::new(config.clone())?;
        let (stop_tx, stop_rx) = watch::channel(false);
        let runtime = BotRuntime::new(
            plan,
            self.settings.clone(),
            Arc::clone(&self.market),
            Arc::clone(&self.store),
            Arc::clone(&self.notifier),
            stop_rx,
        );
        let task = tokio::spawn(runtime.run());
        Ok(BotHandle {
            config,
            stop: stop_tx,
            task,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Candle;
    use crate::market::CandleStore;
    use crate::notify::testing::RecordingNotifier;
    use crate::notify::LogNotifier;
    use crate::persist::MemoryTradeStore;
    use crate::trade::{Direction, Trade};
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::time::Duration;

    fn fast_settings() -> EngineSettings {
        EngineSettings {
            poll_interval_secs: 1,
            candle_fetch_retries: 1,
            candle_retry_delay: Duration::from_millis(1),
            history_window: 50,
            monitor_interval_secs: 1,
            stop_join_timeout: Duration::from_secs(1),
        }
    }

    fn config(id: i64, user_id: i64) -> BotConfig {
        BotConfig {
            id,
            user_id,
            name: format!("bot-{}", id),
            symbol: "BTC/USDT".to_string(),
            timeframe: "1m".to_string(),
            buy_condition: "close > SMA_3".to_string(),
            sell_condition: "close < SMA_3".to_string(),
            ..Default::default()
        }
    }

    fn controller_with_data() -> (Arc<BotController>, Arc<MemoryTradeStore>) {
        let market = Arc::new(CandleStore::new());
        for i in 0..5 {
            market.push(
                "BTC/USDT",
                "1m",
                Candle::new(
                    Utc.timestamp_opt(i * 60, 0).unwrap(),
                    100.0,
                    100.0,
                    100.0,
                    100.0,
                    1.0,
                ),
            );
        }
        let store = Arc::new(MemoryTradeStore::new());
        let controller = Arc::new(BotController::new(
            fast_settings(),
            market,
            store.clone(),
            Arc::new(LogNotifier),
        ));
        (controller, store)
    }

    #[tokio::test]
    async fn test_double_start_fails() {
        let (controller, store) = controller_with_data();
        controller.start(config(1, 7)).await.unwrap();
        let err = controller.start(config(1, 7)).await.unwrap_err();
        assert!(matches!(err, EngineError::AlreadyRunning { .. }));
        assert!(store.is_running(1));
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_without_market_data_fails() {
        let controller = BotController::new(
            fast_settings(),
            Arc::new(CandleStore::new()),
            Arc::new(MemoryTradeStore::new()),
            Arc::new(LogNotifier),
        );
        let err = controller.start(config(1, 7)).await.unwrap_err();
        assert!(matches!(err, EngineError::DataUnavailable { .. }));
        assert!(!controller.is_running(7, 1).await);
    }

    #[tokio::test]
    async fn test_same_bot_id_different_users_coexist() {
        let (controller, _) = controller_with_data();
        controller.start(config(1, 7)).await.unwrap();
        controller.start(config(1, 8)).await.unwrap();
        assert!(controller.is_running(7, 1).await);
        assert!(controller.is_running(8, 1).await);
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_clears_running_state() {
        let (controller, store) = controller_with_data();
        controller.start(config(1, 7)).await.unwrap();
        controller.stop(7, 1).await.unwrap();
        assert!(!controller.is_running(7, 1).await);
        assert!(!store.is_running(1));

        let err = controller.stop(7, 1).await.unwrap_err();
        assert!(matches!(err, EngineError::NotRunning { .. }));
    }

    #[tokio::test]
    async fn test_update_config_persists_and_restarts() {
        let (controller, store) = controller_with_data();
        controller.start(config(1, 7)).await.unwrap();

        let patch = BotConfigPatch {
            buy_condition: Some("close > SMA_4".to_string()),
            ..Default::default()
        };
        controller.update_config(7, 1, patch).await.unwrap();
        assert!(controller.is_running(7, 1).await);
        let saved = store.config(1).unwrap();
        assert_eq!(saved.buy_condition, "close > SMA_4");
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_update_config_rejects_invalid_patch() {
        let (controller, _) = controller_with_data();
        controller.start(config(1, 7)).await.unwrap();

        let patch = BotConfigPatch {
            buy_condition: Some("close >".to_string()),
            ..Default::default()
        };
        assert!(controller.update_config(7, 1, patch).await.is_err());
        // the running bot is untouched by a rejected patch
        assert!(controller.is_running(7, 1).await);
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_update_config_on_idle_bot_persists() {
        let (controller, store) = controller_with_data();
        controller.start(config(1, 7)).await.unwrap();
        controller.stop(7, 1).await.unwrap();

        let patch = BotConfigPatch {
            buy_condition: Some("close > SMA_5".to_string()),
            ..Default::default()
        };
        controller.update_config(7, 1, patch).await.unwrap();
        // the patch is saved without the bot being restarted
        assert!(!controller.is_running(7, 1).await);
        assert_eq!(store.config(1).unwrap().buy_condition, "close > SMA_5");
    }

    #[tokio::test]
    async fn test_update_config_for_unknown_bot_fails() {
        let (controller, _) = controller_with_data();
        let patch = BotConfigPatch::default();
        assert!(controller.update_config(7, 1, patch).await.is_err());
    }

    #[tokio::test]
    async fn test_stop_timeout_flattens_and_notifies() {
        let market = Arc::new(CandleStore::new());
        for i in 0..5 {
            market.push(
                "BTC/USDT",
                "1m",
                Candle::new(
                    Utc.timestamp_opt(i * 60, 0).unwrap(),
                    100.0,
                    100.0,
                    100.0,
                    100.0,
                    1.0,
                ),
            );
        }
        let store = Arc::new(MemoryTradeStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let settings = EngineSettings {
            stop_join_timeout: Duration::ZERO,
            ..fast_settings()
        };
        let controller =
            BotController::new(settings, market, store.clone(), notifier.clone());
        controller.start(config(1, 7)).await.unwrap();

        // a position the abandoned worker can no longer flatten itself
        let trade = Trade::open(
            1,
            Direction::Buy,
            100.0,
            Utc.timestamp_opt(0, 0).unwrap(),
            None,
            None,
            HashMap::new(),
        );
        store.insert_trade(&trade).await.unwrap();

        controller.stop(7, 1).await.unwrap();
        assert!(store.open_trade(1).await.unwrap().is_none());
        let sent = notifier.sent.lock().unwrap();
        assert!(sent.iter().any(|s| s.action == "CLOSE (bot shutdown)"));
    }

    #[tokio::test]
    async fn test_monitor_revives_dead_worker() {
        let (controller, _) = controller_with_data();
        controller.start(config(1, 7)).await.unwrap();

        // kill the worker task behind the controller's back
        {
            let bots = controller.bots.lock().await;
            bots.get(&(7, 1)).unwrap().task.abort();
        }
        for _ in 0..50 {
            if !controller.is_running(7, 1).await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        controller.revive_dead_workers().await;
        assert!(controller.is_running(7, 1).await);
        controller.shutdown().await;
    }
}
