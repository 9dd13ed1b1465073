//! Per-bot evaluation plan
//!
//! A [`BotPlan`] is everything a runtime needs to evaluate one cycle,
//! prepared once at startup: normalized and compiled conditions, and the
//! resolved indicator set (configured instances plus any the conditions
//! reference implicitly).

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::BotConfig;
use crate::data::CandleSeries;
use crate::error::EngineError;
use crate::expr::{compile, normalize, VarMap};
use crate::indicators::{self, IndicatorSpec, Params};
use crate::trade::DecisionContext;

/// Variables every row carries regardless of indicators.
const BUILTIN_VARS: &[&str] = &[
    "open",
    "high",
    "low",
    "close",
    "volume",
    "previous_price",
];

/// One indicator instance with its effective parameters.
pub struct ResolvedIndicator {
    pub spec: &'static IndicatorSpec,
    pub params: Params,
}

/// Compiled, resolved form of one bot configuration.
pub struct BotPlan {
    pub config: BotConfig,
    pub ctx: DecisionContext,
    indicators: Vec<ResolvedIndicator>,
}

impl BotPlan {
    /// Compile the conditions and resolve the indicator set.
    pub fn new(config: BotConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let buy = compile(&normalize(&config.buy_condition))?;
        let sell = compile(&normalize(&config.sell_condition))?;
        let tp = config
            .tp_condition
            .as_deref()
            .map(|e| compile(&normalize(e)))
            .transpose()?;
        let sl = config
            .sl_condition
            .as_deref()
            .map(|e| compile(&normalize(e)))
            .transpose()?;

        let mut referenced: Vec<String> = Vec::new();
        for compiled in [Some(&buy), Some(&sell), tp.as_ref(), sl.as_ref()]
            .into_iter()
            .flatten()
        {
            for var in compiled.variables() {
                if !referenced.contains(var) {
                    referenced.push(var.clone());
                }
            }
        }
        let indicators = resolve_indicators(&config, &referenced)?;

        let ctx = DecisionContext {
            bot_type: config.bot_type,
            entry_precedence: config.entry_precedence,
            buy,
            sell,
            tp,
            sl,
        };
        Ok(Self {
            config,
            ctx,
            indicators,
        })
    }

    /// Candles needed before every resolved indicator has a defined value,
    /// including the extra candle for `previous_price`.
    pub fn warmup(&self) -> usize {
        self.indicators
            .iter()
            .map(|r| (r.spec.warmup)(&r.params))
            .max()
            .unwrap_or(1)
            .max(2)
    }

    pub fn indicators(&self) -> &[ResolvedIndicator] {
        &self.indicators
    }

    /// Evaluate every indicator over the series and build the variable row
    /// for the most recent candle. Still-warming-up values are simply
    /// absent; conditions referencing them fail closed.
    pub fn variable_row(&self, series: &CandleSeries) -> VarMap {
        let mut row = VarMap::new();
        let Some(last) = series.last() else {
            return row;
        };
        row.insert("open".to_string(), last.open);
        row.insert("high".to_string(), last.high);
        row.insert("low".to_string(), last.low);
        row.insert("close".to_string(), last.close);
        row.insert("volume".to_string(), last.volume);
        if series.len() >= 2 {
            if let Some(prev) = series.get(series.len() - 2) {
                row.insert("previous_price".to_string(), prev.close);
            }
        }

        for resolved in &self.indicators {
            let output = (resolved.spec.calculate)(series, &resolved.params);
            for (var, column) in resolved.spec.column_keys(&resolved.params) {
                let value = output
                    .get(column)
                    .and_then(|col| col.last())
                    .copied()
                    .flatten();
                if let Some(value) = value {
                    row.insert(var, value);
                }
            }
        }
        row
    }

    /// All indicator columns over the full series, keyed by variable name.
    /// Lets a replay build per-bar rows without recomputing indicators.
    pub fn column_table(
        &self,
        series: &CandleSeries,
    ) -> std::collections::HashMap<String, Vec<Option<f64>>> {
        let mut table = std::collections::HashMap::new();
        for resolved in &self.indicators {
            let output = (resolved.spec.calculate)(series, &resolved.params);
            for (var, column) in resolved.spec.column_keys(&resolved.params) {
                if let Some(values) = output.get(column) {
                    table.entry(var).or_insert_with(|| values.clone());
                }
            }
        }
        table
    }

    /// Variable row for one bar of a series, reading indicator values out
    /// of a precomputed [`Self::column_table`].
    pub fn variable_row_at(
        &self,
        series: &CandleSeries,
        table: &std::collections::HashMap<String, Vec<Option<f64>>>,
        index: usize,
    ) -> VarMap {
        let mut row = VarMap::new();
        let Some(candle) = series.get(index) else {
            return row;
        };
        row.insert("open".to_string(), candle.open);
        row.insert("high".to_string(), candle.high);
        row.insert("low".to_string(), candle.low);
        row.insert("close".to_string(), candle.close);
        row.insert("volume".to_string(), candle.volume);
        if index >= 1 {
            if let Some(prev) = series.get(index - 1) {
                row.insert("previous_price".to_string(), prev.close);
            }
        }
        for (var, column) in table {
            if let Some(value) = column.get(index).copied().flatten() {
                row.insert(var.clone(), value);
            }
        }
        row
    }

    /// The indicator portion of a row, captured onto opened trades.
    pub fn indicator_snapshot(&self, row: &VarMap) -> std::collections::HashMap<String, f64> {
        row.iter()
            .filter(|(name, _)| !BUILTIN_VARS.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), *value))
            .collect()
    }
}

/// Resolve the indicator instances a bot needs: the explicitly configured
/// ones, plus instances discovered from condition variables that no
/// configured instance covers (`SMA_50`, bare `rsi`, `macd_line`, ...).
fn resolve_indicators(
    config: &BotConfig,
    referenced: &[String],
) -> Result<Vec<ResolvedIndicator>, EngineError> {
    let mut resolved: Vec<ResolvedIndicator> = Vec::new();
    let mut covered: HashSet<String> = HashSet::new();

    for setting in &config.indicators {
        let spec = indicators::find(&setting.name).ok_or_else(|| {
            EngineError::InvalidConfig(format!("unknown indicator `{}`", setting.name))
        })?;
        let params = spec.params_with(&setting.parameters);
        for (var, _) in spec.column_keys(&params) {
            covered.insert(var);
        }
        resolved.push(ResolvedIndicator { spec, params });
    }

    for var in referenced {
        if BUILTIN_VARS.contains(&var.as_str()) || covered.contains(var) {
            continue;
        }
        let discovered = match parse_period_variable(var) {
            Some((abbrev, period)) => indicators::find(abbrev).map(|spec| {
                let overrides = match spec.period_param {
                    Some(name) => {
                        let mut map = serde_json::Map::new();
                        map.insert(name.to_string(), serde_json::json!(period));
                        map
                    }
                    None => serde_json::Map::new(),
                };
                ResolvedIndicator {
                    spec,
                    params: spec.params_with(&overrides),
                }
            }),
            None => indicators::find_by_alias(var).map(|spec| ResolvedIndicator {
                spec,
                params: spec.default_params(),
            }),
        };
        match discovered {
            Some(instance) => {
                for (var, _) in instance.spec.column_keys(&instance.params) {
                    covered.insert(var);
                }
                resolved.push(instance);
            }
            None => {
                // no producer exists; the condition fails closed at runtime
                tracing::warn!(variable = %var, "condition references an unknown variable");
            }
        }
    }
    Ok(resolved)
}

/// Split an `ABBR_period` variable into its parts.
fn parse_period_variable(var: &str) -> Option<(&str, u64)> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| Regex::new(r"^([A-Za-z]+)_(\d+)$").expect("valid regex"));
    let captures = re.captures(var)?;
    let abbrev = captures.get(1)?.as_str();
    let period: u64 = captures.get(2)?.as_str().parse().ok()?;
    Some((abbrev, period))
}
