//! Bot configuration

pub mod settings;

pub use settings::EngineSettings;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::expr::{compile, normalize};
use crate::indicators::{self, ParamKind};

/// How a bot exits positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotType {
    /// Exits when the condition that opened the position turns false.
    #[default]
    Standard,
    /// Exits on explicit take-profit / stop-loss targets only.
    Advanced,
}

/// Which entry condition wins when buy and sell are true simultaneously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPrecedence {
    #[default]
    BuyFirst,
    SellFirst,
}

/// One configured indicator with its parameter overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorSetting {
    /// Registry name or abbreviation, e.g. "SMA"
    pub name: String,
    /// Parameter overrides merged over the schema defaults
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

/// Full configuration of one trading bot.
///
/// Owned by the persistence layer while the bot is idle; a running
/// runtime holds a read-only copy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    /// Traded pair, e.g. "BTC/USDT"
    pub symbol: String,
    /// Candle sampling interval, e.g. "1h"
    pub timeframe: String,
    #[serde(default)]
    pub bot_type: BotType,
    pub buy_condition: String,
    pub sell_condition: String,
    #[serde(default)]
    pub tp_condition: Option<String>,
    #[serde(default)]
    pub sl_condition: Option<String>,
    #[serde(default)]
    pub indicators: Vec<IndicatorSetting>,
    /// Seconds between polling cycles; 0 means the engine default.
    #[serde(default)]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub notification_target: Option<String>,
    #[serde(default)]
    pub entry_precedence: EntryPrecedence,
}

impl BotConfig {
    /// Registry key for the controller.
    pub fn key(&self) -> (i64, i64) {
        (self.user_id, self.id)
    }

    /// Validate the config for completeness before a runtime may start.
    ///
    /// Checks symbol/timeframe/conditions presence, compiles every
    /// condition, and verifies indicator names and parameter bounds
    /// against the registry schema.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.symbol.trim().is_empty() || self.timeframe.trim().is_empty() {
            return Err(EngineError::InvalidConfig(
                "symbol and timeframe must be set".to_string(),
            ));
        }
        if crate::data::timeframe_duration(&self.timeframe).is_none() {
            return Err(EngineError::InvalidConfig(format!(
                "unknown timeframe `{}`",
                self.timeframe
            )));
        }
        if self.buy_condition.trim().is_empty() || self.sell_condition.trim().is_empty() {
            return Err(EngineError::InvalidConfig(
                "buy and sell conditions must be set".to_string(),
            ));
        }
        compile(&normalize(&self.buy_condition))?;
        compile(&normalize(&self.sell_condition))?;

        if self.bot_type == BotType::Standard
            && (self.tp_condition.is_some() || self.sl_condition.is_some())
        {
            return Err(EngineError::InvalidConfig(
                "tp/sl conditions are only valid for advanced bots".to_string(),
            ));
        }
        if let Some(tp) = &self.tp_condition {
            compile(&normalize(tp))?;
        }
        if let Some(sl) = &self.sl_condition {
            compile(&normalize(sl))?;
        }

        for setting in &self.indicators {
            let spec = indicators::find(&setting.name).ok_or_else(|| {
                EngineError::InvalidConfig(format!("unknown indicator `{}`", setting.name))
            })?;
            for param in spec.parameters {
                if param.kind != ParamKind::Number {
                    continue;
                }
                let Some(value) = setting.parameters.get(param.name).and_then(|v| v.as_f64())
                else {
                    continue;
                };
                let below = param.min.map(|min| value < min).unwrap_or(false);
                let above = param.max.map(|max| value > max).unwrap_or(false);
                if below || above {
                    return Err(EngineError::InvalidConfig(format!(
                        "{} parameter `{}` out of bounds: {}",
                        spec.abbrev, param.name, value
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Whitelisted partial update of a bot configuration.
///
/// Every updatable field is a named optional; anything else cannot be
/// patched, so unknown keys are rejected at the deserialization boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfigPatch {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub timeframe: Option<String>,
    pub bot_type: Option<BotType>,
    pub buy_condition: Option<String>,
    pub sell_condition: Option<String>,
    pub tp_condition: Option<String>,
    pub sl_condition: Option<String>,
    pub indicators: Option<Vec<IndicatorSetting>>,
    pub poll_interval_secs: Option<u64>,
    pub notification_target: Option<String>,
    pub entry_precedence: Option<EntryPrecedence>,
}

impl BotConfigPatch {
    /// Apply the patch to a config, field by field.
    pub fn apply(self, config: &mut BotConfig) {
        let BotConfigPatch {
            name,
            symbol,
            timeframe,
            bot_type,
            buy_condition,
            sell_condition,
            tp_condition,
            sl_condition,
            indicators,
            poll_interval_secs,
            notification_target,
            entry_precedence,
        } = self;
        if let Some(v) = name {
            config.name = v;
        }
        if let Some(v) = symbol {
            config.symbol = v;
        }
        if let Some(v) = timeframe {
            config.timeframe = v;
        }
        if let Some(v) = bot_type {
            config.bot_type = v;
        }
        if let Some(v) = buy_condition {
            config.buy_condition = v;
        }
        if let Some(v) = sell_condition {
            config.sell_condition = v;
        }
        if let Some(v) = tp_condition {
            config.tp_condition = Some(v);
        }
        if let Some(v) = sl_condition {
            config.sl_condition = Some(v);
        }
        if let Some(v) = indicators {
            config.indicators = v;
        }
        if let Some(v) = poll_interval_secs {
            config.poll_interval_secs = v;
        }
        if let Some(v) = notification_target {
            config.notification_target = Some(v);
        }
        if let Some(v) = entry_precedence {
            config.entry_precedence = v;
        }
    }
}
