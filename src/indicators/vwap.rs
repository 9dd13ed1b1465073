//! VWAP (Volume Weighted Average Price) indicator

use crate::data::CandleSeries;
use crate::indicators::{IndicatorOutput, IndicatorSpec, ParameterSpec, Params};

pub static VWAP: IndicatorSpec = IndicatorSpec {
    name: "Volume Weighted Average Price",
    abbrev: "VWAP",
    description: "Cumulative typical price weighted by volume from the window start",
    parameters: &[ParameterSpec::select(
        "anchor",
        "Anchor point for the cumulative window",
        "session",
        &["session", "daily", "weekly", "monthly"],
    )],
    outputs: &["vwap"],
    period_param: None,
    calculate,
    warmup,
};

fn warmup(_params: &Params) -> usize {
    1
}

fn calculate(series: &CandleSeries, _params: &Params) -> IndicatorOutput {
    let mut values: Vec<Option<f64>> = Vec::with_capacity(series.len());
    let mut cum_tp_vol = 0.0;
    let mut cum_vol = 0.0;

    for candle in series.candles() {
        cum_tp_vol += candle.typical_price() * candle.volume;
        cum_vol += candle.volume;
        // undefined until any volume has traded
        values.push(if cum_vol == 0.0 {
            None
        } else {
            Some(cum_tp_vol / cum_vol)
        });
    }

    let mut out = IndicatorOutput::new();
    out.insert("vwap".to_string(), values);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Candle;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_vwap_weights_by_volume() {
        let series: CandleSeries = vec![
            Candle::new(Utc.timestamp_opt(0, 0).unwrap(), 10.0, 10.0, 10.0, 10.0, 100.0),
            Candle::new(Utc.timestamp_opt(60, 0).unwrap(), 20.0, 20.0, 20.0, 20.0, 300.0),
        ]
        .into();
        let out = calculate(&series, &Params::default());
        assert_eq!(out["vwap"][0], Some(10.0));
        // (10*100 + 20*300) / 400 = 17.5
        assert_eq!(out["vwap"][1], Some(17.5));
    }

    #[test]
    fn test_vwap_zero_volume_is_undefined() {
        let series: CandleSeries = vec![Candle::new(
            Utc.timestamp_opt(0, 0).unwrap(),
            10.0,
            10.0,
            10.0,
            10.0,
            0.0,
        )]
        .into();
        let out = calculate(&series, &Params::default());
        assert_eq!(out["vwap"][0], None);
    }
}
