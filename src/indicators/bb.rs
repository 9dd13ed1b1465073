//! Bollinger Bands indicator

use crate::data::CandleSeries;
use crate::indicators::{
    none_series, source_values, IndicatorOutput, IndicatorSpec, ParameterSpec, Params,
};

pub static BOLLINGER: IndicatorSpec = IndicatorSpec {
    name: "Bollinger Bands",
    abbrev: "BB",
    description: "SMA envelope widened by a multiple of the rolling stddev",
    parameters: &[
        ParameterSpec::number("period", "Number of periods for the middle band", 20.0, 1.0, 500.0),
        ParameterSpec::number("std_dev", "Standard deviation multiplier", 2.0, 0.1, 10.0),
        ParameterSpec::select(
            "source",
            "Price source for calculation",
            "close",
            &["open", "high", "low", "close"],
        ),
    ],
    outputs: &["bb_upper", "bb_middle", "bb_lower", "bb_width"],
    period_param: Some("period"),
    calculate,
    warmup,
};

fn warmup(params: &Params) -> usize {
    params.usize("period", 20)
}

fn calculate(series: &CandleSeries, params: &Params) -> IndicatorOutput {
    let period = params.usize("period", 20);
    let mult = params.f64("std_dev", 2.0);
    let prices = source_values(series, params);
    let len = prices.len();

    let mut upper = none_series(len);
    let mut middle = none_series(len);
    let mut lower = none_series(len);
    let mut width = none_series(len);

    if period > 0 {
        for i in 0..len {
            if i + 1 < period {
                continue;
            }
            let window = &prices[i + 1 - period..=i];
            let mean = window.iter().sum::<f64>() / period as f64;
            let variance =
                window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
            let std = variance.sqrt();
            let up = mean + mult * std;
            let low = mean - mult * std;
            upper[i] = Some(up);
            middle[i] = Some(mean);
            lower[i] = Some(low);
            // width undefined when the middle band is zero
            if mean != 0.0 {
                width[i] = Some((up - low) / mean);
            }
        }
    }

    let mut out = IndicatorOutput::new();
    out.insert("bb_upper".to_string(), upper);
    out.insert("bb_middle".to_string(), middle);
    out.insert("bb_lower".to_string(), lower);
    out.insert("bb_width".to_string(), width);
    out
}
