//! Node values and the expression evaluator behind them.
//!
//! A [`NodeValue`] is either a plain constant or the text of an arithmetic expression
//! whose identifiers name parameters visible from the node holding the value. The
//! grammar is deliberately small:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := '-' unary | power
//! power   := primary ('^' unary)?
//! primary := number | identifier | '(' expr ')'
//! ```
//!
//! Identifiers may contain dots so that prefixed parameter names (`Select01.nSelected`)
//! can be referenced directly.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("Unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },
    #[error("Unexpected end of expression")]
    UnexpectedEnd,
    #[error("Unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("Invalid number '{0}'")]
    InvalidNumber(String),
    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),
}

/// A value supplied to a node keyword: a constant or an expression over parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    Constant(f64),
    Expression(String),
}

impl NodeValue {
    /// Creates a value from user text, storing plain numbers as constants.
    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        match text.parse::<f64>() {
            Ok(value) => NodeValue::Constant(value),
            Err(_) => NodeValue::Expression(text.to_string()),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            NodeValue::Constant(value) => format!("{:?}", value),
            NodeValue::Expression(text) => text.clone(),
        }
    }

    /// Checks that the value parses and that every identifier it uses can be resolved.
    pub fn validate(&self, is_known: impl Fn(&str) -> bool) -> Result<(), ExpressionError> {
        match self {
            NodeValue::Constant(_) => Ok(()),
            NodeValue::Expression(text) => {
                let expr = Expr::parse(text)?;
                match expr.variables().into_iter().find(|name| !is_known(name)) {
                    Some(unknown) => Err(ExpressionError::UnknownVariable(unknown.to_string())),
                    None => Ok(()),
                }
            }
        }
    }

    pub fn evaluate(&self, resolve: impl Fn(&str) -> Option<f64>) -> Result<f64, ExpressionError> {
        match self {
            NodeValue::Constant(value) => Ok(*value),
            NodeValue::Expression(text) => Expr::parse(text)?.evaluate(&resolve),
        }
    }
}

impl Default for NodeValue {
    fn default() -> Self {
        NodeValue::Constant(0.0)
    }
}

impl fmt::Display for NodeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

impl Expr {
    pub fn parse(text: &str) -> Result<Expr, ExpressionError> {
        let tokens = tokenize(text)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.expr()?;
        match parser.peek() {
            None => Ok(expr),
            Some(token) => Err(ExpressionError::UnexpectedToken(token.to_string())),
        }
    }

    /// Returns every identifier referenced, in order of first appearance.
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Variable(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name.as_str());
                }
            }
            Expr::Negate(inner) => inner.collect_variables(names),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_variables(names);
                rhs.collect_variables(names);
            }
        }
    }

    pub fn evaluate(&self, resolve: &impl Fn(&str) -> Option<f64>) -> Result<f64, ExpressionError> {
        match self {
            Expr::Number(value) => Ok(*value),
            Expr::Variable(name) => {
                resolve(name).ok_or_else(|| ExpressionError::UnknownVariable(name.clone()))
            }
            Expr::Negate(inner) => Ok(-inner.evaluate(resolve)?),
            Expr::Binary { op, lhs, rhs } => {
                let a = lhs.evaluate(resolve)?;
                let b = rhs.evaluate(resolve)?;
                Ok(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Subtract => a - b,
                    BinaryOp::Multiply => a * b,
                    BinaryOp::Divide => a / b,
                    BinaryOp::Power => a.powf(b),
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LeftParen,
    RightParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Ident(name) => f.write_str(name),
            Token::Op(c) => write!(f, "{}", c),
            Token::LeftParen => f.write_str("("),
            Token::RightParen => f.write_str(")"),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, ExpressionError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '+' | '-' | '*' | '/' | '^' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LeftParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RightParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Exponent, e.g. 1.0e-3
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ExpressionError::InvalidNumber(literal.clone()))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => {
                return Err(ExpressionError::UnexpectedCharacter {
                    character: other,
                    position: i,
                });
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat_op(&mut self, ops: &[char]) -> Option<char> {
        match self.peek() {
            Some(Token::Op(c)) if ops.contains(c) => {
                let c = *c;
                self.pos += 1;
                Some(c)
            }
            _ => None,
        }
    }

    fn expr(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.term()?;
        while let Some(op) = self.eat_op(&['+', '-']) {
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op: if op == '+' {
                    BinaryOp::Add
                } else {
                    BinaryOp::Subtract
                },
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.eat_op(&['*', '/']) {
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op: if op == '*' {
                    BinaryOp::Multiply
                } else {
                    BinaryOp::Divide
                },
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExpressionError> {
        if self.eat_op(&['-']).is_some() {
            return Ok(Expr::Negate(Box::new(self.unary()?)));
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.primary()?;
        if self.eat_op(&['^']).is_some() {
            // Right-associative, and allows a signed exponent
            let exponent = self.unary()?;
            return Ok(Expr::Binary {
                op: BinaryOp::Power,
                lhs: Box::new(base),
                rhs: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, ExpressionError> {
        match self.next() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Ident(name)) => Ok(Expr::Variable(name)),
            Some(Token::LeftParen) => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::RightParen) => Ok(inner),
                    Some(token) => Err(ExpressionError::UnexpectedToken(token.to_string())),
                    None => Err(ExpressionError::UnexpectedEnd),
                }
            }
            Some(token) => Err(ExpressionError::UnexpectedToken(token.to_string())),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_variables(_: &str) -> Option<f64> {
        None
    }

    #[test]
    fn evaluates_with_operator_precedence() {
        let expr = Expr::parse("1 + 2 * 3 - 4 / 2").unwrap();
        assert_eq!(expr.evaluate(&no_variables).unwrap(), 5.0);
    }

    #[test]
    fn power_is_right_associative_and_binds_tighter_than_negation() {
        assert_eq!(
            Expr::parse("2^3^2").unwrap().evaluate(&no_variables).unwrap(),
            512.0
        );
        assert_eq!(
            Expr::parse("-2^2").unwrap().evaluate(&no_variables).unwrap(),
            -4.0
        );
    }

    #[test]
    fn parentheses_and_exponent_literals_are_supported() {
        let expr = Expr::parse("(1.5e1 - 5) * 2").unwrap();
        assert_eq!(expr.evaluate(&no_variables).unwrap(), 20.0);
    }

    #[test]
    fn dotted_identifiers_resolve_through_the_callback() {
        let expr = Expr::parse("Select01.nSelected * factor").unwrap();
        assert_eq!(expr.variables(), vec!["Select01.nSelected", "factor"]);
        let value = expr
            .evaluate(&|name: &str| match name {
                "Select01.nSelected" => Some(4.0),
                "factor" => Some(0.5),
                _ => None,
            })
            .unwrap();
        assert_eq!(value, 2.0);
    }

    #[test]
    fn unknown_variables_are_reported() {
        let expr = Expr::parse("a + 1").unwrap();
        assert_eq!(
            expr.evaluate(&no_variables),
            Err(ExpressionError::UnknownVariable("a".into()))
        );
    }

    #[test]
    fn malformed_expressions_are_rejected() {
        assert_eq!(Expr::parse("1 +"), Err(ExpressionError::UnexpectedEnd));
        assert!(matches!(
            Expr::parse("(1 + 2"),
            Err(ExpressionError::UnexpectedEnd)
        ));
        assert!(matches!(
            Expr::parse("1 2"),
            Err(ExpressionError::UnexpectedToken(_))
        ));
        assert!(matches!(
            Expr::parse("1 $ 2"),
            Err(ExpressionError::UnexpectedCharacter { character: '$', .. })
        ));
    }

    #[test]
    fn node_value_from_text_distinguishes_constants() {
        assert_eq!(NodeValue::from_text(" 2.5 "), NodeValue::Constant(2.5));
        assert_eq!(
            NodeValue::from_text("x*2"),
            NodeValue::Expression("x*2".into())
        );
    }

    #[test]
    fn node_value_validate_checks_identifiers() {
        let value = NodeValue::Expression("x + y".into());
        assert!(value.validate(|name| name == "x" || name == "y").is_ok());
        assert_eq!(
            value.validate(|name| name == "x"),
            Err(ExpressionError::UnknownVariable("y".into()))
        );
        assert!(NodeValue::Constant(1.0).validate(|_| false).is_ok());
        assert!(NodeValue::Expression("x +".into()).validate(|_| true).is_err());
    }
}
