//! RSI (Relative Strength Index) indicator

use crate::data::CandleSeries;
use crate::indicators::{
    none_series, source_values, IndicatorOutput, IndicatorSpec, ParameterSpec, Params,
};

pub static RSI: IndicatorSpec = IndicatorSpec {
    name: "Relative Strength Index",
    abbrev: "RSI",
    description: "Momentum oscillator measuring the speed of price changes",
    parameters: &[
        ParameterSpec::number("period", "Number of periods for RSI calculation", 14.0, 1.0, 500.0),
        ParameterSpec::select(
            "source",
            "Price source for calculation",
            "close",
            &["open", "high", "low", "close"],
        ),
        ParameterSpec::number("overbought", "Overbought threshold", 70.0, 50.0, 100.0),
        ParameterSpec::number("oversold", "Oversold threshold", 30.0, 0.0, 50.0),
    ],
    outputs: &["rsi"],
    period_param: Some("period"),
    calculate,
    warmup,
};

fn warmup(params: &Params) -> usize {
    params.usize("period", 14) + 1
}

fn calculate(series: &CandleSeries, params: &Params) -> IndicatorOutput {
    let period = params.usize("period", 14);
    let prices = source_values(series, params);
    let mut out = IndicatorOutput::new();

    if period == 0 || prices.len() <= period {
        out.insert("rsi".to_string(), none_series(prices.len()));
        return out;
    }

    let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

    // Wilder smoothing seeded from the first `period` deltas.
    let mut avg_gain = deltas[..period].iter().filter(|d| **d >= 0.0).sum::<f64>() / period as f64;
    let mut avg_loss = -deltas[..period].iter().filter(|d| **d < 0.0).sum::<f64>() / period as f64;

    let mut values = none_series(period);
    values.push(Some(rsi_from(avg_gain, avg_loss)));

    for delta in &deltas[period..] {
        let (gain, loss) = if *delta > 0.0 { (*delta, 0.0) } else { (0.0, -*delta) };
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
        values.push(Some(rsi_from(avg_gain, avg_loss)));
    }

    out.insert("rsi".to_string(), values);
    out
}

fn rsi_from(avg_gain: f64, avg_loss: f64) -> f64 {
    // rs falls back to 0 when there were no losses in the window
    let rs = if avg_loss == 0.0 { 0.0 } else { avg_gain / avg_loss };
    100.0 - 100.0 / (1.0 + rs)
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
                Candle::new(Utc.timestamp_opt(i as i64 * 60, 0).unwrap(), c, c, c, c, 0.0)
            })
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_rsi_warmup_length() {
        let series = series_from_closes(&[1.0, 2.0, 3.0]);
        let params = Params::from_pairs(&[("period", serde_json::json!(14))]);
        let out = calculate(&series, &params);
        assert_eq!(out["rsi"], vec![None, None, None]);
    }

    #[test]
    fn test_rsi_alternating_gains_and_losses() {
        let series = series_from_closes(&[10.0, 11.0, 10.0, 11.0, 10.0, 11.0]);
        let params = Params::from_pairs(&[("period", serde_json::json!(2))]);
        let out = calculate(&series, &params);
        let rsi = &out["rsi"];
        assert_eq!(rsi[0], None);
        assert_eq!(rsi[1], None);
        // gains and losses average out equal -> rs = 1 -> rsi = 50
        for value in rsi[2..].iter().flatten() {
            assert!(*value > 0.0 && *value < 100.0);
        }
    }

    #[test]
    fn test_rsi_all_gains_is_zero_sentinel() {
        // avg_loss = 0 resolves rs to the documented 0 sentinel, never panics
        let series = series_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let params = Params::from_pairs(&[("period", serde_json::json!(2))]);
        let out = calculate(&series, &params);
        assert_eq!(out["rsi"][2], Some(0.0));
    }
}
