//! Recursive-descent parser producing a [`CompiledExpression`]

use crate::error::EngineError;
use crate::expr::ast::{BinaryOp, Expr, UnaryOp};
use crate::expr::lexer::{tokenize, Token};

/// An expression compiled once and evaluated many times.
///
/// Compilation happens when a bot config is accepted or a runtime starts;
/// the tree is cached on the bot plan afterwards.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    root: Expr,
    source: String,
    variables: Vec<String>,
}

impl CompiledExpression {
    pub(crate) fn root(&self) -> &Expr {
        &self.root
    }

    /// The expression text this tree was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Variable names referenced anywhere in the expression, deduplicated.
    /// Used to auto-discover indicators the conditions rely on.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }
}

/// Compile an expression into a tree, rejecting anything that is not
/// literals, variables, arithmetic, comparisons or boolean logic.
pub fn compile(source: &str) -> Result<CompiledExpression, EngineError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(EngineError::Syntax("empty expression".to_string()));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let root = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(EngineError::Syntax(format!(
            "unexpected token after position {}",
            parser.pos
        )));
    }
    let mut variables = Vec::new();
    collect_variables(&root, &mut variables);
    Ok(CompiledExpression {
        root,
        source: source.to_string(),
        variables,
    })
}

fn collect_variables(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Number(_) => {}
        Expr::Var(name) => {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        Expr::Unary { operand, .. } => collect_variables(operand, out),
        Expr::Binary { lhs, rhs, .. } => {
            collect_variables(lhs, out);
            collect_variables(rhs, out);
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_or(&mut self) -> Result<Expr, EngineError> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, EngineError> {
        let mut lhs = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let rhs = self.parse_not()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, EngineError> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            let operand = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, EngineError> {
        let lhs = self.parse_additive()?;
        let op = match self.peek() {
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::Le) => BinaryOp::Le,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::Ge) => BinaryOp::Ge,
            Some(Token::EqEq) => BinaryOp::Eq,
            Some(Token::Ne) => BinaryOp::Ne,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_additive()?;
        Ok(binary(op, lhs, rhs))
    }

    fn parse_additive(&mut self) -> Result<Expr, EngineError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, EngineError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::DoubleSlash) => BinaryOp::FloorDiv,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, EngineError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                })
            }
            Some(Token::Plus) => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Expr, EngineError> {
        let base = self.parse_atom()?;
        if self.peek() == Some(&Token::DoubleStar) {
            self.advance();
            // Right-associative; the exponent may carry its own sign.
            let exponent = self.parse_unary()?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn parse_atom(&mut self) -> Result<Expr, EngineError> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Ident(name)) => Ok(Expr::Var(name)),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(EngineError::Syntax("unbalanced parentheses".to_string())),
                }
            }
            Some(other) => Err(EngineError::Syntax(format!(
                "unexpected token {:?}",
                other
            ))),
            None => Err(EngineError::Syntax(
                "expression ends with a dangling operator".to_string(),
            )),
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}
