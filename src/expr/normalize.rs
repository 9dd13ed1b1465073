//! Normalization of author-facing condition syntax
//!
//! The condition editor lets users insert indicator references in a long
//! form like `SimpleMovingAverage(SMA)14`. The engine canonicalizes those
//! to `SMA_14` before compiling, and maps `current_price` onto the `close`
//! column of the evaluation row. Normalization is idempotent: text already
//! in canonical form passes through unchanged.

use std::sync::OnceLock;

use regex::Regex;

fn long_form_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[A-Za-z][A-Za-z0-9]*\(([A-Za-z]+)\)(\d+)").expect("valid regex")
    })
}

fn current_price_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bcurrent_price\b").expect("valid regex"))
}

/// Rewrite author syntax into canonical variable names.
///
/// `SimpleMovingAverage(SMA)14` becomes `SMA_14`; `current_price` becomes
/// `close`. Tokens already canonical (`SMA_14`, `macd_line`, `close`) are
/// not touched, so `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(expr: &str) -> String {
    let rewritten = long_form_re().replace_all(expr, "${1}_${2}");
    current_price_re().replace_all(&rewritten, "close").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_long_form() {
        assert_eq!(
            normalize("SimpleMovingAverage(SMA)14 > current_price"),
            "SMA_14 > close"
        );
        assert_eq!(
            normalize("ExponentialMovingAverage(EMA)20 < RelativeStrengthIndex(RSI)14"),
            "EMA_20 < RSI_14"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        assert_eq!(normalize("SMA_14 > close"), "SMA_14 > close");
        let once = normalize("SimpleMovingAverage(SMA)14 > current_price");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_normalize_leaves_canonical_tokens_alone() {
        assert_eq!(
            normalize("macd_line > signal_line and rsi < 70"),
            "macd_line > signal_line and rsi < 70"
        );
        // parenthesized arithmetic is not the long indicator form
        assert_eq!(normalize("close * (high)"), "close * (high)");
    }
}
