//! EMA (Exponential Moving Average) indicator

use crate::data::CandleSeries;
use crate::indicators::{
    ema_values, source_values, IndicatorOutput, IndicatorSpec, ParameterSpec, Params,
};

pub static EMA: IndicatorSpec = IndicatorSpec {
    name: "Exponential Moving Average",
    abbrev: "EMA",
    description: "Moving average that weights recent prices more heavily",
    parameters: &[
        ParameterSpec::number("period", "Number of periods for the moving average", 20.0, 1.0, 500.0),
        ParameterSpec::select(
            "source",
            "Price source for calculation",
            "close",
            &["open", "high", "low", "close", "volume"],
        ),
    ],
    outputs: &["ema"],
    period_param: Some("period"),
    calculate,
    warmup,
};

fn warmup(params: &Params) -> usize {
    params.usize("period", 20)
}

fn calculate(series: &CandleSeries, params: &Params) -> IndicatorOutput {
    let period = params.usize("period", 20);
    let values = source_values(series, params);
    let mut out = IndicatorOutput::new();
    out.insert("ema".to_string(), ema_values(&values, period));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Candle;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_ema_seeded_by_sma() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        let series: CandleSeries = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Candle::new(Utc.timestamp_opt(i as i64 * 60, 0).unwrap(), c, c, c, c, 0.0)
            })
            .collect::<Vec<_>>()
            .into();
        let params = Params::from_pairs(&[("period", serde_json::json!(3))]);
        let out = calculate(&series, &params);
        let ema = &out["ema"];
        assert_eq!(ema[0], None);
        assert_eq!(ema[1], None);
        // seed = SMA(3) of [1,2,3]
        assert_eq!(ema[2], Some(2.0));
        // k = 2/(3+1) = 0.5
        assert_eq!(ema[3], Some(4.0 * 0.5 + 2.0 * 0.5));
        assert_eq!(ema[4], Some(5.0 * 0.5 + 3.0 * 0.5));
    }
}
