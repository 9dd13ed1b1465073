//! Tree-walking evaluation of compiled expressions

use std::collections::HashMap;

use crate::error::EngineError;
use crate::expr::ast::{BinaryOp, Expr, UnaryOp, Value};
use crate::expr::parser::CompiledExpression;

/// The variable namespace a condition is evaluated against: one row of
/// market data plus indicator values.
pub type VarMap = HashMap<String, f64>;

impl CompiledExpression {
    /// Evaluate the expression against a variable row.
    ///
    /// Deterministic and side-effect free. A variable missing from the row
    /// yields [`EngineError::UnresolvedVariable`]; division by zero yields
    /// [`EngineError::Eval`].
    pub fn evaluate(&self, vars: &VarMap) -> Result<Value, EngineError> {
        eval_node(self.root(), vars)
    }

    /// Evaluate as a boolean, failing closed.
    ///
    /// Any evaluation failure (most commonly an indicator still in warm-up,
    /// so its variable is absent from the row) is treated as `false` so a
    /// bot never acts on an incomplete row.
    pub fn evaluate_bool(&self, vars: &VarMap) -> bool {
        match self.evaluate(vars) {
            Ok(value) => value.is_truthy(),
            Err(err) => {
                tracing::debug!(expression = self.source(), %err, "condition failed closed");
                false
            }
        }
    }

    /// Evaluate expecting a numeric result (TP/SL target expressions).
    pub fn evaluate_number(&self, vars: &VarMap) -> Result<f64, EngineError> {
        match self.evaluate(vars)? {
            Value::Number(n) => Ok(n),
            Value::Bool(_) => Err(EngineError::Eval(format!(
                "`{}` produced a boolean where a number was expected",
                self.source()
            ))),
        }
    }
}

fn eval_node(expr: &Expr, vars: &VarMap) -> Result<Value, EngineError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Var(name) => vars
            .get(name)
            .map(|v| Value::Number(*v))
            .ok_or_else(|| EngineError::UnresolvedVariable(name.clone())),
        Expr::Unary { op, operand } => {
            let value = eval_node(operand, vars)?;
            Ok(match op {
                UnaryOp::Neg => Value::Number(-value.as_number()),
                UnaryOp::Not => Value::Bool(!value.is_truthy()),
            })
        }
        Expr::Binary { op, lhs, rhs } => match op {
            // and/or short-circuit left-to-right
            BinaryOp::And => {
                let left = eval_node(lhs, vars)?;
                if !left.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(eval_node(rhs, vars)?.is_truthy()))
            }
            BinaryOp::Or => {
                let left = eval_node(lhs, vars)?;
                if left.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(eval_node(rhs, vars)?.is_truthy()))
            }
            _ => {
                let left = eval_node(lhs, vars)?.as_number();
                let right = eval_node(rhs, vars)?.as_number();
                eval_numeric(*op, left, right)
            }
        },
    }
}

fn eval_numeric(op: BinaryOp, left: f64, right: f64) -> Result<Value, EngineError> {
    let divide_guard = |value: f64| {
        if value == 0.0 {
            Err(EngineError::Eval("division by zero".to_string()))
        } else {
            Ok(value)
        }
    };
    Ok(match op {
        BinaryOp::Add => Value::Number(left + right),
        BinaryOp::Sub => Value::Number(left - right),
        BinaryOp::Mul => Value::Number(left * right),
        BinaryOp::Div => Value::Number(left / divide_guard(right)?),
        BinaryOp::FloorDiv => Value::Number((left / divide_guard(right)?).floor()),
        BinaryOp::Rem => Value::Number(left % divide_guard(right)?),
        BinaryOp::Pow => Value::Number(left.powf(right)),
        BinaryOp::Lt => Value::Bool(left < right),
        BinaryOp::Le => Value::Bool(left <= right),
        BinaryOp::Gt => Value::Bool(left > right),
        BinaryOp::Ge => Value::Bool(left >= right),
        BinaryOp::Eq => Value::Bool(left == right),
        BinaryOp::Ne => Value::Bool(left != right),
        BinaryOp::And | BinaryOp::Or => unreachable!("handled before numeric coercion"),
    })
}
