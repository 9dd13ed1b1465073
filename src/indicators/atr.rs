//! ATR (Average True Range) indicator

use crate::data::CandleSeries;
use crate::indicators::{
    true_ranges, wilder_smooth, IndicatorOutput, IndicatorSpec, ParameterSpec, Params,
};

pub static ATR: IndicatorSpec = IndicatorSpec {
    name: "Average True Range",
    abbrev: "ATR",
    description: "Wilder-smoothed mean of the true range, a volatility gauge",
    parameters: &[ParameterSpec::number(
        "period",
        "Number of periods for ATR calculation",
        14.0,
        1.0,
        500.0,
    )],
    outputs: &["atr"],
    period_param: Some("period"),
    calculate,
    warmup,
};

fn warmup(params: &Params) -> usize {
    params.usize("period", 14)
}

fn calculate(series: &CandleSeries, params: &Params) -> IndicatorOutput {
    let period = params.usize("period", 14);
    let trs = true_ranges(series);
    let mut out = IndicatorOutput::new();
    out.insert("atr".to_string(), wilder_smooth(&trs, period));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Candle;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_atr_uses_gap_against_previous_close() {
        let series: CandleSeries = vec![
            Candle::new(Utc.timestamp_opt(0, 0).unwrap(), 10.0, 12.0, 9.0, 10.0, 0.0),
            // gaps up: true range measured against previous close
            Candle::new(Utc.timestamp_opt(60, 0).unwrap(), 15.0, 16.0, 15.0, 15.5, 0.0),
        ]
        .into();
        let params = Params::from_pairs(&[("period", serde_json::json!(2))]);
        let out = calculate(&series, &params);
        // tr[0] = 12-9 = 3, tr[1] = max(1, |16-10|, |15-10|) = 6
        assert_eq!(out["atr"][0], None);
        assert_eq!(out["atr"][1], Some(4.5));
    }
}
