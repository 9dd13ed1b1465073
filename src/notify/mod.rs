//! Trade signal notifications
//!
//! Notifications are strictly best-effort: the runtime persists first, then
//! notifies, and a notifier failure never affects the trade decision.

use async_trait::async_trait;

use crate::error::EngineError;

/// One human-readable trade event.
#[derive(Debug, Clone)]
pub struct TradeSignal {
    pub bot_name: String,
    /// "OPEN BUY", "CLOSE (tp)", ...
    pub action: String,
    pub symbol: String,
    pub price: f64,
    /// Free-form detail line, e.g. realized P&L.
    pub details: Option<String>,
    /// Per-bot delivery target (chat id, webhook, ...), if configured.
    pub target: Option<String>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, signal: &TradeSignal) -> Result<(), EngineError>;
}

/// Notifier that writes signals to the log.
///
/// The default sink when no external channel is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, signal: &TradeSignal) -> Result<(), EngineError> {
        tracing::info!(
            bot = %signal.bot_name,
            action = %signal.action,
            symbol = %signal.symbol,
            price = signal.price,
            details = signal.details.as_deref().unwrap_or(""),
            "trade signal"
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records signals for assertions.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<TradeSignal>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, signal: &TradeSignal) -> Result<(), EngineError> {
            self.sent
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(signal.clone());
            Ok(())
        }
    }
}
