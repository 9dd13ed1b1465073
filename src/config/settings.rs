//! Engine-wide settings loaded from the environment

use std::time::Duration;

use dotenv::dotenv;

/// Process-wide engine tunables.
///
/// Constructed once at startup and passed by reference to the controller;
/// every value has a default so an empty environment works out of the box.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Default seconds between polling cycles for bots that do not set one.
    pub poll_interval_secs: u64,
    /// Attempts to fetch the latest candle before skipping a cycle.
    pub candle_fetch_retries: u32,
    /// Delay between candle fetch attempts.
    pub candle_retry_delay: Duration,
    /// Trailing candles fetched per cycle for indicator warm-up.
    pub history_window: usize,
    /// Seconds between health scans of running bots.
    pub monitor_interval_secs: u64,
    /// Bound on waiting for a stopped worker to exit.
    pub stop_join_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            candle_fetch_retries: 3,
            candle_retry_delay: Duration::from_millis(500),
            history_window: 200,
            monitor_interval_secs: 60,
            stop_join_timeout: Duration::from_secs(10),
        }
    }
}

impl EngineSettings {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            poll_interval_secs: env_u64("ENGINE_POLL_INTERVAL_SECS", defaults.poll_interval_secs),
            candle_fetch_retries: env_u64(
                "ENGINE_CANDLE_FETCH_RETRIES",
                defaults.candle_fetch_retries as u64,
            ) as u32,
            candle_retry_delay: Duration::from_millis(env_u64(
                "ENGINE_CANDLE_RETRY_DELAY_MS",
                defaults.candle_retry_delay.as_millis() as u64,
            )),
            history_window: env_u64("ENGINE_HISTORY_WINDOW", defaults.history_window as u64)
                as usize,
            monitor_interval_secs: env_u64(
                "ENGINE_MONITOR_INTERVAL_SECS",
                defaults.monitor_interval_secs,
            ),
            stop_join_timeout: Duration::from_secs(env_u64(
                "ENGINE_STOP_JOIN_TIMEOUT_SECS",
                defaults.stop_join_timeout.as_secs(),
            )),
        })
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
