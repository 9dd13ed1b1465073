//! Technical indicator library
//!
//! Indicators are pure calculation functions registered in an immutable
//! lookup table built once at startup. Each indicator exposes a parameter
//! schema and produces named output series aligned 1:1 with the input
//! candle sequence; leading entries are undefined during warm-up and short
//! input yields an all-undefined series instead of an error.

pub mod adx;
pub mod atr;
pub mod bb;
pub mod ema;
pub mod macd;
pub mod mfi;
pub mod obv;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod vwap;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::data::CandleSeries;

/// Named output series aligned with the input candle sequence.
pub type IndicatorOutput = HashMap<String, Vec<Option<f64>>>;

/// Parameter value kind accepted by an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Number,
    Select,
}

/// Schema entry for one indicator parameter (name, type, default, bounds).
#[derive(Debug, Clone, Copy)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub default_number: Option<f64>,
    pub default_text: Option<&'static str>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub options: &'static [&'static str],
}

impl ParameterSpec {
    /// Numeric parameter with bounds.
    pub const fn number(
        name: &'static str,
        description: &'static str,
        default: f64,
        min: f64,
        max: f64,
    ) -> Self {
        Self {
            name,
            kind: ParamKind::Number,
            description,
            default_number: Some(default),
            default_text: None,
            min: Some(min),
            max: Some(max),
            options: &[],
        }
    }

    /// Select parameter with a fixed option list.
    pub const fn select(
        name: &'static str,
        description: &'static str,
        default: &'static str,
        options: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            kind: ParamKind::Select,
            description,
            default_number: None,
            default_text: Some(default),
            min: None,
            max: None,
            options,
        }
    }
}

/// Runtime parameter values for one indicator instance.
///
/// Values come from the bot configuration as loose JSON; accessors fall
/// back to the schema default when a key is missing or mistyped.
#[derive(Debug, Clone, Default)]
pub struct Params(serde_json::Map<String, serde_json::Value>);

impl Params {
    pub fn new(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map)
    }

    pub fn from_pairs(pairs: &[(&str, serde_json::Value)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    pub fn usize(&self, name: &str, default: usize) -> usize {
        self.0
            .get(name)
            .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f as u64)))
            .map(|v| v as usize)
            .unwrap_or(default)
    }

    pub fn f64(&self, name: &str, default: f64) -> f64 {
        self.0.get(name).and_then(|v| v.as_f64()).unwrap_or(default)
    }

    pub fn text<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.0.get(name).and_then(|v| v.as_str()).unwrap_or(default)
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.get(name)
    }
}

/// One entry of the indicator registry: schema plus pure calculation.
/// All fields are `'static` borrows or fn pointers, so specs copy freely.
#[derive(Clone, Copy)]
pub struct IndicatorSpec {
    /// Full display name, e.g. "Simple Moving Average"
    pub name: &'static str,
    /// Canonical abbreviation used in conditions, e.g. "SMA"
    pub abbrev: &'static str,
    pub description: &'static str,
    pub parameters: &'static [ParameterSpec],
    /// Output names; single-output indicators use their lowercase abbrev.
    pub outputs: &'static [&'static str],
    /// The parameter that names this indicator in `ABBR_period` variables.
    pub period_param: Option<&'static str>,
    /// Pure calculation over a candle series.
    pub calculate: fn(&CandleSeries, &Params) -> IndicatorOutput,
    /// Candles required before the first output value is defined.
    pub warmup: fn(&Params) -> usize,
}

impl IndicatorSpec {
    /// Default parameter values as a JSON map, per the schema.
    pub fn default_params(&self) -> Params {
        self.params_with(&serde_json::Map::new())
    }

    /// Schema defaults with the given overrides merged on top.
    pub fn params_with(&self, overrides: &serde_json::Map<String, serde_json::Value>) -> Params {
        let mut map = serde_json::Map::new();
        for param in self.parameters {
            match param.kind {
                ParamKind::Number => {
                    if let Some(default) = param.default_number {
                        map.insert(param.name.to_string(), serde_json::json!(default));
                    }
                }
                ParamKind::Select => {
                    if let Some(default) = param.default_text {
                        map.insert(param.name.to_string(), serde_json::json!(default));
                    }
                }
            }
        }
        for (key, value) in overrides {
            map.insert(key.clone(), value.clone());
        }
        Params::new(map)
    }

    /// Variable names this instance contributes to the evaluation row,
    /// each mapped to the output column that backs it.
    ///
    /// Single-output indicators alias to their bare lowercase name (`sma`)
    /// and, when parameterized, the canonical `ABBR_period` form (`SMA_14`).
    /// Multi-output indicators expose per-output names (`macd_line`, ...).
    pub fn column_keys(&self, params: &Params) -> Vec<(String, &'static str)> {
        let mut keys = Vec::new();
        if self.outputs.len() == 1 {
            keys.push((self.abbrev.to_lowercase(), self.outputs[0]));
        } else {
            for output in self.outputs {
                keys.push((output.to_string(), *output));
            }
        }
        if let Some(period_param) = self.period_param {
            let default = self
                .parameters
                .iter()
                .find(|p| p.name == period_param)
                .and_then(|p| p.default_number)
                .unwrap_or(14.0);
            let period = params.f64(period_param, default) as usize;
            keys.push((format!("{}_{}", self.abbrev, period), self.outputs[0]));
        }
        keys
    }
}

/// Serializable indicator metadata for the management layer.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorInfo {
    pub name: String,
    pub abbrev: String,
    pub description: String,
    pub parameters: Vec<serde_json::Value>,
    pub outputs: Vec<String>,
}

/// The immutable indicator registry.
pub fn registry() -> &'static [IndicatorSpec] {
    static REGISTRY: &[IndicatorSpec] = &[
        sma::SMA,
        ema::EMA,
        rsi::RSI,
        macd::MACD,
        bb::BOLLINGER,
        stochastic::STOCHASTIC,
        atr::ATR,
        obv::OBV,
        adx::ADX,
        vwap::VWAP,
        mfi::MFI,
    ];
    REGISTRY
}

/// Look an indicator up by abbreviation or full name, case-insensitive.
pub fn find(name: &str) -> Option<&'static IndicatorSpec> {
    registry().iter().find(|spec| {
        spec.abbrev.eq_ignore_ascii_case(name) || spec.name.eq_ignore_ascii_case(name)
    })
}

/// Resolve a condition variable to the indicator that produces it:
/// bare lowercase alias for single-output indicators, output name for
/// multi-output ones.
pub fn find_by_alias(alias: &str) -> Option<&'static IndicatorSpec> {
    registry().iter().find(|spec| {
        if spec.outputs.len() == 1 {
            spec.abbrev.to_lowercase() == alias
        } else {
            spec.outputs.contains(&alias)
        }
    })
}

/// Metadata for every registered indicator (schema, defaults, outputs).
pub fn indicator_info() -> Vec<IndicatorInfo> {
    registry()
        .iter()
        .map(|spec| IndicatorInfo {
            name: spec.name.to_string(),
            abbrev: spec.abbrev.to_string(),
            description: spec.description.to_string(),
            parameters: spec
                .parameters
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "name": p.name,
                        "type": match p.kind { ParamKind::Number => "number", ParamKind::Select => "select" },
                        "description": p.description,
                        "default": p.default_number
                            .map(serde_json::Value::from)
                            .or_else(|| p.default_text.map(serde_json::Value::from)),
                        "min_value": p.min,
                        "max_value": p.max,
                        "options": p.options,
                    })
                })
                .collect(),
            outputs: spec.outputs.iter().map(|o| o.to_string()).collect(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Shared calculation helpers
// ---------------------------------------------------------------------------

/// Source column selection shared by price-based indicators.
pub(crate) fn source_values(series: &CandleSeries, params: &Params) -> Vec<f64> {
    match params.text("source", "close") {
        "open" => series.opens(),
        "high" => series.highs(),
        "low" => series.lows(),
        "volume" => series.volumes(),
        _ => series.closes(),
    }
}

pub(crate) fn none_series(len: usize) -> Vec<Option<f64>> {
    vec![None; len]
}

/// Rolling simple mean; undefined for the first `period - 1` entries.
pub(crate) fn sma_values(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    let mut window_sum = 0.0;
    for i in 0..values.len() {
        window_sum += values[i];
        if i >= period {
            window_sum -= values[i - period];
        }
        if period > 0 && i + 1 >= period {
            out.push(Some(window_sum / period as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// Exponential mean seeded by the simple mean of the first `period`
/// values; recurrence `v[i] = x[i]*k + v[i-1]*(1-k)`, `k = 2/(period+1)`.
pub(crate) fn ema_values(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if period == 0 {
        return none_series(values.len());
    }
    let k = 2.0 / (period as f64 + 1.0);
    let mut prev: Option<f64> = None;
    for i in 0..values.len() {
        let value = if i + 1 < period {
            None
        } else if i + 1 == period {
            Some(values[..period].iter().sum::<f64>() / period as f64)
        } else {
            prev.map(|p| values[i] * k + p * (1.0 - k))
        };
        if value.is_some() {
            prev = value;
        }
        out.push(value);
    }
    out
}

/// Rolling simple mean over an already-optional series, used for smoothing
/// oscillator outputs (%K smoothing, %D).
pub(crate) fn sma_of_optional(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        if period == 0 || i + 1 < period {
            out.push(None);
            continue;
        }
        let window = &values[i + 1 - period..=i];
        if window.iter().all(|v| v.is_some()) {
            let sum: f64 = window.iter().flatten().sum();
            out.push(Some(sum / period as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// True range series: `max(high-low, |high-prevClose|, |low-prevClose|)`.
pub(crate) fn true_ranges(series: &CandleSeries) -> Vec<f64> {
    let candles = series.candles();
    let mut out = Vec::with_capacity(candles.len());
    for i in 0..candles.len() {
        let c = &candles[i];
        let tr = if i == 0 {
            c.high - c.low
        } else {
            let prev_close = candles[i - 1].close;
            (c.high - c.low)
                .max((c.high - prev_close).abs())
                .max((c.low - prev_close).abs())
        };
        out.push(tr);
    }
    out
}

/// Wilder smoothing: seeded with the simple mean of the first `period`
/// values, then `s[i] = (s[i-1]*(period-1) + x[i]) / period`.
pub(crate) fn wilder_smooth(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if period == 0 {
        return none_series(values.len());
    }
    let mut prev: Option<f64> = None;
    for i in 0..values.len() {
        let value = if i + 1 < period {
            None
        } else if i + 1 == period {
            Some(values[..period].iter().sum::<f64>() / period as f64)
        } else {
            prev.map(|p| (p * (period as f64 - 1.0) + values[i]) / period as f64)
        };
        if value.is_some() {
            prev = value;
        }
        out.push(value);
    }
    out
}
