//! Per-bot runtime loop
//!
//! Each running bot is one tokio task executing [`BotRuntime::run`]: poll
//! the latest candle, rebuild the variable row, decide, persist, notify,
//! sleep. Cycle errors are logged and the loop keeps going; only a stop
//! signal ends it.

pub mod plan;

pub use plan::{BotPlan, ResolvedIndicator};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::config::EngineSettings;
use crate::data::Candle;
use crate::error::EngineError;
use crate::market::MarketDataSource;
use crate::notify::{Notifier, TradeSignal};
use crate::persist::TradeStore;
use crate::trade::{decide, Action, Direction, ExitReason, Trade};

pub struct BotRuntime {
    plan: BotPlan,
    settings: EngineSettings,
    market: Arc<dyn MarketDataSource>,
    store: Arc<dyn TradeStore>,
    notifier: Arc<dyn Notifier>,
    stop: watch::Receiver<bool>,
    /// Time of the newest candle already evaluated; cycles that see the
    /// same candle again are skipped.
    last_seen: Option<DateTime<Utc>>,
}

impl BotRuntime {
    pub fn new(
        plan: BotPlan,
        settings: EngineSettings,
        market: Arc<dyn MarketDataSource>,
        store: Arc<dyn TradeStore>,
        notifier: Arc<dyn Notifier>,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self {
            plan,
            settings,
            market,
            store,
            notifier,
            stop,
            last_seen: None,
        }
    }

    fn poll_interval(&self) -> Duration {
        let secs = if self.plan.config.poll_interval_secs > 0 {
            self.plan.config.poll_interval_secs
        } else {
            self.settings.poll_interval_secs
        };
        Duration::from_secs(secs.max(1))
    }

    fn history_limit(&self) -> usize {
        self.settings.history_window.max(self.plan.warmup())
    }

    /// Run until stopped. Individual cycle failures never end the loop.
    pub async fn run(mut self) {
        let bot_id = self.plan.config.id;
        let mut ticker = tokio::time::interval(self.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(bot_id, name = %self.plan.config.name, "bot runtime started");

        let mut stop = self.stop.clone();
        loop {
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.cycle().await {
                        tracing::warn!(bot_id, %err, "cycle failed");
                    }
                }
            }
        }

        if let Err(err) = self.close_on_shutdown().await {
            tracing::warn!(bot_id, %err, "shutdown cleanup failed");
        }
        tracing::info!(bot_id, "bot runtime stopped");
    }

    /// One evaluation cycle.
    async fn cycle(&mut self) -> Result<(), EngineError> {
        let config = &self.plan.config;
        let Some(candle) = self.fetch_candle().await? else {
            tracing::debug!(bot_id = config.id, "no market data yet, skipping cycle");
            return Ok(());
        };
        if self.last_seen == Some(candle.time) {
            return Ok(());
        }

        let step = crate::data::timeframe_duration(&config.timeframe)
            .unwrap_or_else(|| chrono::Duration::minutes(1));
        let start = candle.time - step * self.history_limit() as i32;
        let candles = self
            .market
            .get_history(&config.symbol, &config.timeframe, start, candle.time)
            .await?;
        let history = crate::data::CandleSeries::from(candles);
        let row = self.plan.variable_row(&history);
        let open = self.store.open_trade(config.id).await?;

        match decide(open.as_ref(), &row, &self.plan.ctx) {
            Action::Open {
                direction,
                tp_price,
                sl_price,
            } => {
                let trade = Trade::open(
                    config.id,
                    direction,
                    candle.close,
                    candle.time,
                    tp_price,
                    sl_price,
                    self.plan.indicator_snapshot(&row),
                );
                self.store.insert_trade(&trade).await?;
                self.notify_open(&trade).await;
            }
            Action::Close { reason } => {
                // decide() only returns Close when a trade is open
                if let Some(mut trade) = open {
                    trade.close(candle.close, candle.time, reason);
                    self.store.update_trade(&trade).await?;
                    self.notify_close(&trade).await;
                }
            }
            Action::Hold => {}
        }

        self.last_seen = Some(candle.time);
        Ok(())
    }

    /// Fetch the latest candle, retrying empty results and transient
    /// failures a bounded number of times. `Ok(None)` means the cycle
    /// should be skipped and retried next interval.
    async fn fetch_candle(&self) -> Result<Option<Candle>, EngineError> {
        let config = &self.plan.config;
        let mut attempt = 0;
        loop {
            match self
                .market
                .get_last_candle(&config.symbol, &config.timeframe)
                .await
            {
                Ok(Some(candle)) => return Ok(Some(candle)),
                Ok(None) => {
                    attempt += 1;
                    if attempt >= self.settings.candle_fetch_retries {
                        return Ok(None);
                    }
                }
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.settings.candle_fetch_retries {
                        return Err(err);
                    }
                }
            }
            tokio::time::sleep(self.settings.candle_retry_delay).await;
        }
    }

    /// Force-close any open trade when the bot stops.
    async fn close_on_shutdown(&self) -> Result<(), EngineError> {
        if let Some(mut trade) = self.store.open_trade(self.plan.config.id).await? {
            trade.force_close(Utc::now());
            self.store.update_trade(&trade).await?;
            self.notify_close(&trade).await;
        }
        Ok(())
    }

    async fn notify_open(&self, trade: &Trade) {
        let action = match trade.direction {
            Direction::Buy => "OPEN BUY",
            Direction::Sell => "OPEN SELL",
        };
        self.send_signal(action.to_string(), trade.entry_price, None)
            .await;
    }

    async fn notify_close(&self, trade: &Trade) {
        let reason = match trade.exit_reason {
            Some(ExitReason::Tp) => "tp",
            Some(ExitReason::Sl) => "sl",
            Some(ExitReason::ConditionChange) => "condition change",
            Some(ExitReason::Manual) => "manual",
            Some(ExitReason::BotShutdown) => "bot shutdown",
            None => "unknown",
        };
        let details = trade
            .profit_loss_percent
            .map(|p| format!("P&L {:+.2}%", p));
        self.send_signal(
            format!("CLOSE ({})", reason),
            trade.exit_price.unwrap_or(trade.entry_price),
            details,
        )
        .await;
    }

    /// Notification failures are logged and dropped; the trade record is
    /// already persisted by the time this runs.
    async fn send_signal(&self, action: String, price: f64, details: Option<String>) {
        let config = &self.plan.config;
        let signal = TradeSignal {
            bot_name: config.name.clone(),
            action,
            symbol: config.symbol.clone(),
            price,
            details,
            target: config.notification_target.clone(),
        };
        if let Err(err) = self.notifier.send(&signal).await {
            tracing::warn!(bot_id = config.id, %err, "notification failed");
        }
    }
}
