//! MACD (Moving Average Convergence Divergence) indicator

use crate::data::CandleSeries;
use crate::indicators::{
    ema_values, none_series, source_values, IndicatorOutput, IndicatorSpec, ParameterSpec, Params,
};

pub static MACD: IndicatorSpec = IndicatorSpec {
    name: "Moving Average Convergence Divergence",
    abbrev: "MACD",
    description: "Difference of two EMAs with a signal line and histogram",
    parameters: &[
        ParameterSpec::number("fast_length", "Fast EMA period", 12.0, 1.0, 500.0),
        ParameterSpec::number("slow_length", "Slow EMA period", 26.0, 1.0, 500.0),
        ParameterSpec::number("signal_length", "Signal EMA period", 9.0, 1.0, 500.0),
        ParameterSpec::select(
            "source",
            "Price source for calculation",
            "close",
            &["open", "high", "low", "close"],
        ),
    ],
    outputs: &["macd_line", "signal_line", "histogram"],
    period_param: Some("fast_length"),
    calculate,
    warmup,
};

fn warmup(params: &Params) -> usize {
    params.usize("slow_length", 26) + params.usize("signal_length", 9) - 1
}

fn calculate(series: &CandleSeries, params: &Params) -> IndicatorOutput {
    let fast = params.usize("fast_length", 12);
    let slow = params.usize("slow_length", 26);
    let signal = params.usize("signal_length", 9);
    let prices = source_values(series, params);
    let len = prices.len();
    let mut out = IndicatorOutput::new();

    if fast == 0 || slow == 0 || signal == 0 {
        out.insert("macd_line".to_string(), none_series(len));
        out.insert("signal_line".to_string(), none_series(len));
        out.insert("histogram".to_string(), none_series(len));
        return out;
    }

    let fast_ema = ema_values(&prices, fast);
    let slow_ema = ema_values(&prices, slow);

    let macd_line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    // Signal line: EMA of the MACD line, seeded by a simple average over
    // the first `signal` defined MACD values.
    let k = 2.0 / (signal as f64 + 1.0);
    let first_signal_index = slow + signal - 2;
    let mut signal_line: Vec<Option<f64>> = Vec::with_capacity(len);
    for i in 0..len {
        let value = if i < first_signal_index {
            None
        } else if i == first_signal_index {
            let window: Vec<f64> = macd_line[slow.saturating_sub(1)..=i]
                .iter()
                .flatten()
                .copied()
                .collect();
            if window.is_empty() {
                None
            } else {
                Some(window.iter().sum::<f64>() / window.len() as f64)
            }
        } else {
            match (macd_line[i], signal_line[i - 1]) {
                (Some(m), Some(prev)) => Some(m * k + prev * (1.0 - k)),
                _ => None,
            }
        };
        signal_line.push(value);
    }

    let histogram: Vec<Option<f64>> = macd_line
        .iter()
        .zip(signal_line.iter())
        .map(|(m, s)| match (m, s) {
            (Some(m), Some(s)) => Some(m - s),
            _ => None,
        })
        .collect();

    out.insert("macd_line".to_string(), macd_line);
    out.insert("signal_line".to_string(), signal_line);
    out.insert("histogram".to_string(), histogram);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Candle;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_macd_alignment_and_warmup() {
        let closes: Vec<f64> = (1..=60).map(|i| i as f64).collect();
        let series: CandleSeries = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Candle::new(Utc.timestamp_opt(i as i64 * 60, 0).unwrap(), c, c, c, c, 0.0)
            })
            .collect::<Vec<_>>()
            .into();
        let params = Params::from_pairs(&[
            ("fast_length", serde_json::json!(12)),
            ("slow_length", serde_json::json!(26)),
            ("signal_length", serde_json::json!(9)),
        ]);
        let out = calculate(&series, &params);
        assert_eq!(out["macd_line"].len(), 60);
        assert_eq!(out["signal_line"].len(), 60);
        assert_eq!(out["histogram"].len(), 60);

        // macd defined from slow-1, signal from slow+signal-2
        assert!(out["macd_line"][24].is_none());
        assert!(out["macd_line"][25].is_some());
        assert!(out["signal_line"][32].is_none());
        assert!(out["signal_line"][33].is_some());
        assert!(out["histogram"][33].is_some());

        // on a linear ramp both EMAs converge, histogram stays finite
        let hist = out["histogram"][59].unwrap();
        assert!(hist.is_finite());
    }
}
