//! MFI (Money Flow Index) indicator

use crate::data::CandleSeries;
use crate::indicators::{none_series, IndicatorOutput, IndicatorSpec, ParameterSpec, Params};

pub static MFI: IndicatorSpec = IndicatorSpec {
    name: "Money Flow Index",
    abbrev: "MFI",
    description: "Volume-weighted RSI over typical-price money flow",
    parameters: &[
        ParameterSpec::number("period", "Number of periods for MFI calculation", 14.0, 1.0, 500.0),
        ParameterSpec::number("overbought", "Overbought threshold", 80.0, 50.0, 100.0),
        ParameterSpec::number("oversold", "Oversold threshold", 20.0, 0.0, 50.0),
    ],
    outputs: &["mfi"],
    period_param: Some("period"),
    calculate,
    warmup,
};

fn warmup(params: &Params) -> usize {
    params.usize("period", 14) + 1
}

fn calculate(series: &CandleSeries, params: &Params) -> IndicatorOutput {
    let period = params.usize("period", 14);
    let candles = series.candles();
    let len = candles.len();
    let mut out = IndicatorOutput::new();

    if period == 0 || len <= period {
        out.insert("mfi".to_string(), none_series(len));
        return out;
    }

    let typical: Vec<f64> = candles.iter().map(|c| c.typical_price()).collect();
    let raw_flow: Vec<f64> = candles
        .iter()
        .zip(typical.iter())
        .map(|(c, tp)| tp * c.volume)
        .collect();

    let mut values = none_series(period);
    for i in period..len {
        let mut positive = 0.0;
        let mut negative = 0.0;
        for j in i + 1 - period..=i {
            if j == 0 {
                continue;
            }
            if typical[j] > typical[j - 1] {
                positive += raw_flow[j];
            } else if typical[j] < typical[j - 1] {
                negative += raw_flow[j];
            }
        }
        // all flow positive saturates the index at 100
        let mfi = if negative == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + positive / negative)
        };
        values.push(Some(mfi));
    }

    out.insert("mfi".to_string(), values);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Candle;
    use chrono::{TimeZone, Utc};

    fn candle(i: i64, price: f64, volume: f64) -> Candle {
        Candle::new(Utc.timestamp_opt(i * 60, 0).unwrap(), price, price, price, price, volume)
    }

    #[test]
    fn test_mfi_saturates_at_100_without_negative_flow() {
        let series: CandleSeries =
            vec![candle(0, 1.0, 10.0), candle(1, 2.0, 10.0), candle(2, 3.0, 10.0)].into();
        let params = Params::from_pairs(&[("period", serde_json::json!(2))]);
        let out = calculate(&series, &params);
        assert_eq!(out["mfi"], vec![None, None, Some(100.0)]);
    }

    #[test]
    fn test_mfi_balances_positive_and_negative_flow() {
        let series: CandleSeries = vec![
            candle(0, 10.0, 1.0),
            candle(1, 20.0, 1.0),
            candle(2, 10.0, 2.0),
        ]
        .into();
        let params = Params::from_pairs(&[("period", serde_json::json!(2))]);
        let out = calculate(&series, &params);
        // positive flow 20, negative flow 20 -> ratio 1 -> mfi 50
        assert_eq!(out["mfi"][2], Some(50.0));
    }
}
