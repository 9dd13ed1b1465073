//! SMA (Simple Moving Average) indicator

use crate::data::CandleSeries;
use crate::indicators::{
    none_series, sma_values, source_values, IndicatorOutput, IndicatorSpec, ParameterSpec, Params,
};

pub static SMA: IndicatorSpec = IndicatorSpec {
    name: "Simple Moving Average",
    abbrev: "SMA",
    description: "Arithmetic mean of the source price over a trailing window",
    parameters: &[
        ParameterSpec::number("period", "Number of periods for the moving average", 14.0, 1.0, 500.0),
        ParameterSpec::select(
            "source",
            "Price source for calculation",
            "close",
            &["open", "high", "low", "close", "volume"],
        ),
    ],
    outputs: &["sma"],
    period_param: Some("period"),
    calculate,
    warmup,
};

fn warmup(params: &Params) -> usize {
    params.usize("period", 14)
}

fn calculate(series: &CandleSeries, params: &Params) -> IndicatorOutput {
    let period = params.usize("period", 14);
    let values = source_values(series, params);
    let mut out = IndicatorOutput::new();
    if period == 0 {
        out.insert("sma".to_string(), none_series(values.len()));
    } else {
        out.insert("sma".to_string(), sma_values(&values, period));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Candle;
    use chrono::{TimeZone, Utc};

    fn series_from_closes(closes: &[f64]) -> CandleSeries {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Candle::new(
                    Utc.timestamp_opt(i as i64 * 60, 0).unwrap(),
                    c,
                    c,
                    c,
                    c,
                    1000.0,
                )
            })
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_sma_warmup_and_values() {
        let series = series_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let params = Params::from_pairs(&[("period", serde_json::json!(3))]);
        let out = calculate(&series, &params);
        assert_eq!(
            out["sma"],
            vec![None, None, Some(2.0), Some(3.0), Some(4.0)]
        );
    }

    #[test]
    fn test_sma_short_input_is_all_undefined() {
        let series = series_from_closes(&[1.0, 2.0]);
        let params = Params::from_pairs(&[("period", serde_json::json!(5))]);
        let out = calculate(&series, &params);
        assert_eq!(out["sma"], vec![None, None]);
    }
}
