//! OBV (On-Balance Volume) indicator

use crate::data::CandleSeries;
use crate::indicators::{source_values, IndicatorOutput, IndicatorSpec, ParameterSpec, Params};

pub static OBV: IndicatorSpec = IndicatorSpec {
    name: "On-Balance Volume",
    abbrev: "OBV",
    description: "Cumulative volume signed by the direction of price moves",
    parameters: &[ParameterSpec::select(
        "source",
        "Price source for calculation",
        "close",
        &["open", "high", "low", "close"],
    )],
    outputs: &["obv"],
    period_param: None,
    calculate,
    warmup,
};

fn warmup(_params: &Params) -> usize {
    1
}

fn calculate(series: &CandleSeries, params: &Params) -> IndicatorOutput {
    let prices = source_values(series, params);
    let volumes = series.volumes();
    let mut values: Vec<Option<f64>> = Vec::with_capacity(prices.len());

    // seeded by the first candle's volume
    if !prices.is_empty() {
        values.push(Some(volumes[0]));
        for i in 1..prices.len() {
            let prev = values[i - 1].unwrap_or(0.0);
            let next = if prices[i] > prices[i - 1] {
                prev + volumes[i]
            } else if prices[i] < prices[i - 1] {
                prev - volumes[i]
            } else {
                prev
            };
            values.push(Some(next));
        }
    }

    let mut out = IndicatorOutput::new();
    out.insert("obv".to_string(), values);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Candle;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_obv_accumulates_signed_volume() {
        let series: CandleSeries = vec![
            Candle::new(Utc.timestamp_opt(0, 0).unwrap(), 1.0, 1.0, 1.0, 10.0, 100.0),
            Candle::new(Utc.timestamp_opt(60, 0).unwrap(), 1.0, 1.0, 1.0, 11.0, 50.0),
            Candle::new(Utc.timestamp_opt(120, 0).unwrap(), 1.0, 1.0, 1.0, 10.5, 30.0),
            Candle::new(Utc.timestamp_opt(180, 0).unwrap(), 1.0, 1.0, 1.0, 10.5, 99.0),
        ]
        .into();
        let out = calculate(&series, &Params::default());
        assert_eq!(
            out["obv"],
            vec![Some(100.0), Some(150.0), Some(120.0), Some(120.0)]
        );
    }
}
