//! ADX (Average Directional Index) indicator

use crate::data::CandleSeries;
use crate::indicators::{
    none_series, true_ranges, wilder_smooth, IndicatorOutput, IndicatorSpec, ParameterSpec, Params,
};

pub static ADX: IndicatorSpec = IndicatorSpec {
    name: "Average Directional Index",
    abbrev: "ADX",
    description: "Trend strength derived from smoothed +DI/-DI movement",
    parameters: &[ParameterSpec::number(
        "period",
        "Number of periods for ADX calculation",
        14.0,
        1.0,
        500.0,
    )],
    outputs: &["adx", "di_plus", "di_minus"],
    period_param: Some("period"),
    calculate,
    warmup,
};

fn warmup(params: &Params) -> usize {
    2 * params.usize("period", 14)
}

fn calculate(series: &CandleSeries, params: &Params) -> IndicatorOutput {
    let period = params.usize("period", 14);
    let candles = series.candles();
    let len = candles.len();
    let mut out = IndicatorOutput::new();

    if period == 0 || len < 2 {
        out.insert("adx".to_string(), none_series(len));
        out.insert("di_plus".to_string(), none_series(len));
        out.insert("di_minus".to_string(), none_series(len));
        return out;
    }

    // Directional movement per candle; index 0 has no previous candle.
    let mut plus_dm = vec![0.0; len];
    let mut minus_dm = vec![0.0; len];
    for i in 1..len {
        let up_move = candles[i].high - candles[i - 1].high;
        let down_move = candles[i - 1].low - candles[i].low;
        if up_move > down_move && up_move > 0.0 {
            plus_dm[i] = up_move;
        }
        if down_move > up_move && down_move > 0.0 {
            minus_dm[i] = down_move;
        }
    }

    // The ATR smoothing family: Wilder on TR, +DM and -DM alike.
    let atr = wilder_smooth(&true_ranges(series), period);
    let plus_smooth = wilder_smooth(&plus_dm[1..], period);
    let minus_smooth = wilder_smooth(&minus_dm[1..], period);

    let mut di_plus = none_series(len);
    let mut di_minus = none_series(len);
    let mut dx = vec![None; len];
    for i in 1..len {
        let (Some(atr_v), Some(p), Some(m)) = (atr[i], plus_smooth[i - 1], minus_smooth[i - 1])
        else {
            continue;
        };
        let (p_di, m_di) = if atr_v == 0.0 {
            (0.0, 0.0)
        } else {
            (100.0 * p / atr_v, 100.0 * m / atr_v)
        };
        di_plus[i] = Some(p_di);
        di_minus[i] = Some(m_di);
        let di_sum = p_di + m_di;
        dx[i] = Some(if di_sum == 0.0 {
            0.0
        } else {
            100.0 * (p_di - m_di).abs() / di_sum
        });
    }

    // ADX is Wilder-smoothed DX, seeded once `period` DX values exist.
    let dx_defined: Vec<f64> = dx.iter().flatten().copied().collect();
    let adx_tail = wilder_smooth(&dx_defined, period);
    let first_dx = dx.iter().position(|v| v.is_some());
    let mut adx = none_series(len);
    if let Some(start) = first_dx {
        for (offset, value) in adx_tail.iter().enumerate() {
            if start + offset < len {
                adx[start + offset] = *value;
            }
        }
    }

    out.insert("adx".to_string(), adx);
    out.insert("di_plus".to_string(), di_plus);
    out.insert("di_minus".to_string(), di_minus);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Candle;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_adx_on_steady_uptrend() {
        // monotone rising highs/lows: -DM stays zero, +DI dominates
        let series: CandleSeries = (0..20)
            .map(|i| {
                let base = 100.0 + i as f64;
                Candle::new(
                    Utc.timestamp_opt(i * 60, 0).unwrap(),
                    base,
                    base + 1.0,
                    base - 1.0,
                    base + 0.5,
                    0.0,
                )
            })
            .collect::<Vec<_>>()
            .into();
        let params = Params::from_pairs(&[("period", serde_json::json!(3))]);
        let out = calculate(&series, &params);
        assert_eq!(out["adx"].len(), 20);
        let last_plus = out["di_plus"].last().unwrap().unwrap();
        let last_minus = out["di_minus"].last().unwrap().unwrap();
        assert!(last_plus > last_minus);
        let last_adx = out["adx"].last().unwrap().unwrap();
        assert!(last_adx > 50.0);
    }

    #[test]
    fn test_adx_short_input_is_all_undefined() {
        let series: CandleSeries = vec![Candle::new(
            Utc.timestamp_opt(0, 0).unwrap(),
            1.0,
            2.0,
            0.5,
            1.5,
            0.0,
        )]
        .into();
        let params = Params::from_pairs(&[("period", serde_json::json!(14))]);
        let out = calculate(&series, &params);
        assert_eq!(out["adx"], vec![None]);
        assert_eq!(out["di_plus"], vec![None]);
    }
}
