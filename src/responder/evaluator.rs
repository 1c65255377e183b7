//! Two-operand arithmetic.
//!
//! Grammar, whitespace allowed between tokens:
//!
//! ```text
//! expr     := digits op digits [ "=" | "?" ]
//! op       := "+" | "-" | "*" | "/"
//! digits   := [0-9]+
//! ```
//!
//! Nothing outside this grammar is accepted, so there is no path from user text to
//! anything but one of four float operations.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Sub),
            '*' => Some(Operator::Mul),
            '/' => Some(Operator::Div),
            _ => None,
        }
    }

    fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            Operator::Add => left + right,
            Operator::Sub => left - right,
            Operator::Mul => left * right,
            Operator::Div => left / right,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
        };
        write!(f, "{}", symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Expression {
    pub left: f64,
    pub operator: Operator,
    pub right: f64,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("not a two-operand expression: '{0}'")]
    Malformed(String),
    #[error("expression has no finite result")]
    NonFinite,
}

struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { chars: input.chars().peekable() }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn digits(&mut self) -> Option<f64> {
        let mut run = String::new();
        while let Some(c) = self.chars.peek().copied() {
            if !c.is_ascii_digit() {
                break;
            }
            run.push(c);
            self.chars.next();
        }
        if run.is_empty() {
            return None;
        }
        run.parse::<f64>().ok()
    }

    fn operator(&mut self) -> Option<Operator> {
        let op = self.chars.peek().copied().and_then(Operator::from_char)?;
        self.chars.next();
        Some(op)
    }

    fn finish(&mut self) -> bool {
        self.skip_whitespace();
        if matches!(self.chars.peek(), Some('=') | Some('?')) {
            self.chars.next();
            self.skip_whitespace();
        }
        self.chars.peek().is_none()
    }
}

pub fn parse(input: &str) -> Result<Expression, EvalError> {
    let malformed = || EvalError::Malformed(input.to_string());
    let mut cursor = Cursor::new(input);

    cursor.skip_whitespace();
    let left = cursor.digits().ok_or_else(malformed)?;
    cursor.skip_whitespace();
    let operator = cursor.operator().ok_or_else(malformed)?;
    cursor.skip_whitespace();
    let right = cursor.digits().ok_or_else(malformed)?;

    if !cursor.finish() {
        return Err(malformed());
    }

    Ok(Expression { left, operator, right })
}

pub fn evaluate(input: &str) -> Result<f64, EvalError> {
    let expr = parse(input)?;
    let value = expr.operator.apply(expr.left, expr.right);
    if !value.is_finite() {
        return Err(EvalError::NonFinite);
    }
    Ok(value)
}

/// `4` rather than `4.0`; fractional values keep their default rendering.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_two_operands() {
        assert_eq!(evaluate("2+2"), Ok(4.0));
        assert_eq!(format_number(evaluate("2+2").unwrap()), "4");
    }

    #[test]
    fn tolerates_spacing_and_trailing_marker() {
        assert_eq!(evaluate("  12 * 3 = "), Ok(36.0));
        assert_eq!(evaluate("9-10?"), Ok(-1.0));
    }

    #[test]
    fn division_by_zero_is_not_finite() {
        assert_eq!(evaluate("10/0"), Err(EvalError::NonFinite));
        assert_eq!(evaluate("0/0"), Err(EvalError::NonFinite));
    }

    #[test]
    fn fractional_results_keep_decimals() {
        assert_eq!(format_number(evaluate("7/2").unwrap()), "3.5");
    }

    #[test]
    fn rejects_anything_beyond_one_operator() {
        for input in ["1+2+3", "2**3", "-2+2", "2+", "abc", "", "2 + x", "сколько 3*4", "1.5+2"] {
            assert!(
                matches!(evaluate(input), Err(EvalError::Malformed(_))),
                "accepted {:?}",
                input
            );
        }
    }

    #[test]
    fn parse_exposes_operands() {
        let expr = parse("3*4").unwrap();
        assert_eq!(expr.left, 3.0);
        assert_eq!(expr.operator, Operator::Mul);
        assert_eq!(expr.operator.to_string(), "*");
        assert_eq!(expr.right, 4.0);
    }
}
