//! Stochastic Oscillator indicator

use crate::data::CandleSeries;
use crate::indicators::{
    none_series, sma_of_optional, IndicatorOutput, IndicatorSpec, ParameterSpec, Params,
};

pub static STOCHASTIC: IndicatorSpec = IndicatorSpec {
    name: "Stochastic Oscillator",
    abbrev: "STOCH",
    description: "Position of the close within the recent high/low range",
    parameters: &[
        ParameterSpec::number("k_period", "%K lookback period", 14.0, 1.0, 500.0),
        ParameterSpec::number("d_period", "%D signal period", 3.0, 1.0, 500.0),
        ParameterSpec::number("smooth", "Smoothing applied to %K", 1.0, 1.0, 100.0),
        ParameterSpec::number("overbought", "Overbought threshold", 80.0, 50.0, 100.0),
        ParameterSpec::number("oversold", "Oversold threshold", 20.0, 0.0, 50.0),
    ],
    outputs: &["stoch_k", "stoch_d"],
    period_param: Some("k_period"),
    calculate,
    warmup,
};

fn warmup(params: &Params) -> usize {
    let k = params.usize("k_period", 14);
    let d = params.usize("d_period", 3);
    let smooth = params.usize("smooth", 1);
    k + smooth.saturating_sub(1) + d.saturating_sub(1)
}

fn calculate(series: &CandleSeries, params: &Params) -> IndicatorOutput {
    let k_period = params.usize("k_period", 14);
    let d_period = params.usize("d_period", 3);
    let smooth = params.usize("smooth", 1);

    let highs = series.highs();
    let lows = series.lows();
    let closes = series.closes();
    let len = closes.len();

    let mut k_values = none_series(len);
    if k_period > 0 {
        for i in 0..len {
            if i + 1 < k_period {
                continue;
            }
            let window_high = highs[i + 1 - k_period..=i]
                .iter()
                .cloned()
                .fold(f64::MIN, f64::max);
            let window_low = lows[i + 1 - k_period..=i]
                .iter()
                .cloned()
                .fold(f64::MAX, f64::min);
            k_values[i] = if window_high == window_low {
                // flat range: middle value rather than division by zero
                Some(50.0)
            } else {
                Some(100.0 * (closes[i] - window_low) / (window_high - window_low))
            };
        }
    }

    if smooth > 1 {
        k_values = sma_of_optional(&k_values, smooth);
    }
    let d_values = sma_of_optional(&k_values, d_period);

    let mut out = IndicatorOutput::new();
    out.insert("stoch_k".to_string(), k_values);
    out.insert("stoch_d".to_string(), d_values);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Candle;
    use chrono::{TimeZone, Utc};

    fn candle(i: i64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(Utc.timestamp_opt(i * 60, 0).unwrap(), close, high, low, close, 0.0)
    }

    #[test]
    fn test_stochastic_range_position() {
        let series: CandleSeries = vec![
            candle(0, 10.0, 0.0, 5.0),
            candle(1, 10.0, 0.0, 7.5),
            candle(2, 10.0, 0.0, 10.0),
        ]
        .into();
        let params = Params::from_pairs(&[
            ("k_period", serde_json::json!(2)),
            ("d_period", serde_json::json!(2)),
        ]);
        let out = calculate(&series, &params);
        assert_eq!(out["stoch_k"][0], None);
        assert_eq!(out["stoch_k"][1], Some(75.0));
        assert_eq!(out["stoch_k"][2], Some(100.0));
        assert_eq!(out["stoch_d"][2], Some(87.5));
    }

    #[test]
    fn test_stochastic_flat_range_is_midpoint() {
        let series: CandleSeries = vec![candle(0, 5.0, 5.0, 5.0), candle(1, 5.0, 5.0, 5.0)].into();
        let params = Params::from_pairs(&[("k_period", serde_json::json!(2))]);
        let out = calculate(&series, &params);
        assert_eq!(out["stoch_k"][1], Some(50.0));
    }
}
