//! Market data access
//!
//! The runtime only ever asks two questions: "what is the latest candle"
//! and "give me recent history". Both live behind [`MarketDataSource`] so
//! exchanges, replay feeds and the in-memory test store are interchangeable.
//! Missing data is an empty result the caller retries, not an error; `Err`
//! is reserved for transport failures.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::data::Candle;
use crate::error::EngineError;

/// Read-only access to candle data for one symbol/timeframe pair.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Latest closed candle, `None` when no data exists yet.
    async fn get_last_candle(
        &self,
        symbol: &str,
        timeframe: &str,
    ) -> Result<Option<Candle>, EngineError>;

    /// Candles with `start <= time <= end`, ascending by time. Empty when
    /// the range (or the pair) has no data.
    async fn get_history(
        &self,
        symbol: &str,
        timeframe: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, EngineError>;
}

/// In-memory candle store keyed by `symbol:timeframe`.
///
/// Serves as the market source for tests and standalone paper-trading; a
/// feed task pushes candles in, runtimes read them out.
#[derive(Debug, Default)]
pub struct CandleStore {
    series: RwLock<HashMap<String, Vec<Candle>>>,
}

impl CandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(symbol: &str, timeframe: &str) -> String {
        format!("{}:{}", symbol, timeframe)
    }

    /// Append one candle, keeping the series sorted by time.
    pub fn push(&self, symbol: &str, timeframe: &str, candle: Candle) {
        let mut series = self.series.write().unwrap_or_else(|e| e.into_inner());
        let entry = series.entry(Self::key(symbol, timeframe)).or_default();
        entry.push(candle);
        if entry.len() > 1 && entry[entry.len() - 2].time > entry[entry.len() - 1].time {
            entry.sort_by_key(|c| c.time);
        }
    }

    /// Replace the whole series for a pair.
    pub fn load(&self, symbol: &str, timeframe: &str, mut candles: Vec<Candle>) {
        candles.sort_by_key(|c| c.time);
        let mut series = self.series.write().unwrap_or_else(|e| e.into_inner());
        series.insert(Self::key(symbol, timeframe), candles);
    }

    pub fn len(&self, symbol: &str, timeframe: &str) -> usize {
        let series = self.series.read().unwrap_or_else(|e| e.into_inner());
        series
            .get(&Self::key(symbol, timeframe))
            .map(|c| c.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl MarketDataSource for CandleStore {
    async fn get_last_candle(
        &self,
        symbol: &str,
        timeframe: &str,
    ) -> Result<Option<Candle>, EngineError> {
        let series = self.series.read().unwrap_or_else(|e| e.into_inner());
        Ok(series
            .get(&Self::key(symbol, timeframe))
            .and_then(|c| c.last())
            .copied())
    }

    async fn get_history(
        &self,
        symbol: &str,
        timeframe: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, EngineError> {
        let series = self.series.read().unwrap_or_else(|e| e.into_inner());
        Ok(series
            .get(&Self::key(symbol, timeframe))
            .map(|candles| {
                candles
                    .iter()
                    .filter(|c| c.time >= start && c.time <= end)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candle(i: i64, close: f64) -> Candle {
        Candle::new(
            Utc.timestamp_opt(i * 60, 0).unwrap(),
            close,
            close,
            close,
            close,
            1.0,
        )
    }

    fn minute(i: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(i * 60, 0).unwrap()
    }

    #[tokio::test]
    async fn test_last_candle_and_history() {
        let store = CandleStore::new();
        for i in 0..5 {
            store.push("BTC/USDT", "1m", candle(i, i as f64));
        }
        let last = store.get_last_candle("BTC/USDT", "1m").await.unwrap();
        assert_eq!(last.map(|c| c.close), Some(4.0));

        let history = store
            .get_history("BTC/USDT", "1m", minute(2), minute(4))
            .await
            .unwrap();
        let closes: Vec<f64> = history.iter().map(|c| c.close).collect();
        assert_eq!(closes, vec![2.0, 3.0, 4.0]);
    }

    #[tokio::test]
    async fn test_missing_pair_is_empty_not_error() {
        let store = CandleStore::new();
        assert_eq!(store.get_last_candle("ETH/USDT", "1h").await.unwrap(), None);
        let history = store
            .get_history("ETH/USDT", "1h", minute(0), minute(10))
            .await
            .unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_push_keeps_time_order() {
        let store = CandleStore::new();
        store.push("BTC/USDT", "1m", candle(2, 2.0));
        store.push("BTC/USDT", "1m", candle(0, 0.0));
        store.push("BTC/USDT", "1m", candle(1, 1.0));
        let history = store
            .get_history("BTC/USDT", "1m", minute(0), minute(10))
            .await
            .unwrap();
        let closes: Vec<f64> = history.iter().map(|c| c.close).collect();
        assert_eq!(closes, vec![0.0, 1.0, 2.0]);
    }
}
