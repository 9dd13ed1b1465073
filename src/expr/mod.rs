//! Safe expression evaluator for user-authored trading conditions
//!
//! Conditions are short textual expressions over a variable namespace
//! (`open`, `high`, `low`, `close`, `volume`, `current_price`,
//! `previous_price` and indicator names). They are compiled once into an
//! expression tree and evaluated per candle with no side effects and no
//! arbitrary code execution.

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod normalize;
pub mod parser;

pub use ast::{BinaryOp, Expr, UnaryOp, Value};
pub use eval::VarMap;
pub use normalize::normalize;
pub use parser::{compile, CompiledExpression};

use serde::{Deserialize, Serialize};

/// Outcome of validating a user expression at the engine boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpressionCheck {
    pub valid: bool,
    pub error: Option<String>,
}

/// Validate a user expression without running it.
///
/// The expression is normalized and compiled; any syntax problem is
/// reported as a message instead of an error so the CRUD layer can show it
/// to the user directly.
pub fn validate_expression(expr: &str) -> ExpressionCheck {
    match compile(&normalize(expr)) {
        Ok(_) => ExpressionCheck {
            valid: true,
            error: None,
        },
        Err(err) => ExpressionCheck {
            valid: false,
            error: Some(err.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_expression() {
        assert!(validate_expression("close > sma and rsi < 70").valid);
        let check = validate_expression("close > (sma");
        assert!(!check.valid);
        assert!(check.error.is_some());
    }
}
