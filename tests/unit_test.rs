//! Unit tests for papertrader modules

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use papertrader::data::{Candle, CandleSeries};
    use papertrader::expr::{compile, normalize, validate_expression, VarMap};
    use papertrader::indicators::{self, Params};

    fn series(closes: &[f64]) -> CandleSeries {
        let base = Utc.timestamp_opt(0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                Candle::new(base + Duration::minutes(i as i64), *c, *c, *c, *c, 1000.0)
            })
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_normalization_rewrites_long_form() {
        assert_eq!(
            normalize("SimpleMovingAverage(SMA)14 > current_price"),
            "SMA_14 > close"
        );
        assert_eq!(
            normalize("RelativeStrengthIndex(RSI)7 < 30 and current_price > 0"),
            "RSI_7 < 30 and close > 0"
        );
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let once = normalize("SimpleMovingAverage(SMA)14 > current_price");
        assert_eq!(normalize(&once), once);
        // already-canonical input passes through untouched
        assert_eq!(normalize("SMA_14 > close"), "SMA_14 > close");
    }

    #[test]
    fn test_expression_validation() {
        assert!(validate_expression("close > SMA_14 and RSI_14 < 70").valid);
        assert!(!validate_expression("close > > sma").valid);
        assert!(!validate_expression("close > (sma").valid);
        assert!(!validate_expression("").valid);
    }

    #[test]
    fn test_evaluation_fails_closed_on_missing_variable() {
        let compiled = compile("RSI_14 < 30").unwrap();
        let empty = VarMap::new();
        assert!(!compiled.evaluate_bool(&empty));
    }

    #[test]
    fn test_python_like_operator_semantics() {
        let compiled = compile("7 // 2 == 3 and 2 ** 3 ** 2 == 512").unwrap();
        assert!(compiled.evaluate_bool(&VarMap::new()));
    }

    #[test]
    fn test_sma_known_values() {
        let sma = indicators::find("SMA").unwrap();
        let params = Params::from_pairs(&[("period", serde_json::json!(3))]);
        let out = (sma.calculate)(&series(&[1.0, 2.0, 3.0, 4.0, 5.0]), &params);
        assert_eq!(
            out["sma"],
            vec![None, None, Some(2.0), Some(3.0), Some(4.0)]
        );
    }

    #[test]
    fn test_short_series_yields_undefined_not_error() {
        let params = Params::from_pairs(&[("period", serde_json::json!(14))]);
        for spec in indicators::registry() {
            let out = (spec.calculate)(&series(&[1.0, 2.0]), &params);
            for output in spec.outputs.iter() {
                let column = &out[*output];
                assert_eq!(column.len(), 2, "{} column length", spec.abbrev);
            }
        }
    }

    #[test]
    fn test_every_indicator_aligns_with_input() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.3).sin()).collect();
        let input = series(&closes);
        for spec in indicators::registry() {
            let out = (spec.calculate)(&input, &spec.default_params());
            for output in spec.outputs.iter() {
                assert_eq!(out[*output].len(), input.len(), "{}", spec.abbrev);
            }
        }
    }

    #[test]
    fn test_registry_has_expected_indicators() {
        for abbrev in [
            "SMA", "EMA", "RSI", "MACD", "BB", "STOCH", "ATR", "OBV", "ADX", "VWAP", "MFI",
        ] {
            assert!(indicators::find(abbrev).is_some(), "{} missing", abbrev);
        }
        assert_eq!(indicators::registry().len(), 11);
    }
}
