//! Arithmetic expression tool.
//!
//! Expressions are evaluated by a purpose-built recursive-descent parser:
//! numeric literals, the operators `+ - * / % **`, parentheses, the
//! constants `pi` and `e`, and a fixed set of math functions. There is no
//! general-purpose evaluator behind this, so an expression can never reach
//! code execution.

use std::fmt;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use super::Tool;

/// Evaluate a math expression.
pub struct Calculator;

#[async_trait]
impl Tool for Calculator {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate a math expression like '2 + 2' or 'sqrt(16) * 3'. Supports basic arithmetic and the functions sqrt, sin, cos, tan, log, abs, round, pow plus the constants pi and e."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The math expression to evaluate"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let expression = args["expression"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("'expression' must be a string"))?;

        // Evaluation errors are part of the tool's output contract, not
        // failures: the model sees the message and can correct itself.
        match eval(expression) {
            Ok(value) => Ok(value.to_string()),
            Err(e) => Ok(format!("Error evaluating expression: {}", e)),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
enum ExprError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("name '{0}' is not defined")]
    UnknownName(String),

    #[error("'{0}' cannot be used as a value")]
    NotAValue(String),

    #[error("{0}() takes {1} argument(s), got {2}")]
    WrongArity(&'static str, &'static str, usize),

    #[error("division by zero")]
    DivisionByZero,

    #[error("modulo by zero")]
    ModuloByZero,
}

/// A numeric value with Python-like int/float distinction, so integer
/// arithmetic prints without a decimal point and float results keep one.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Num::Int(i) => write!(f, "{}", i),
            Num::Float(x) => {
                if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
        }
    }
}

fn add(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::Int(a), Num::Int(b)) => a
            .checked_add(b)
            .map(Num::Int)
            .unwrap_or(Num::Float(a as f64 + b as f64)),
        _ => Num::Float(a.as_f64() + b.as_f64()),
    }
}

fn sub(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::Int(a), Num::Int(b)) => a
            .checked_sub(b)
            .map(Num::Int)
            .unwrap_or(Num::Float(a as f64 - b as f64)),
        _ => Num::Float(a.as_f64() - b.as_f64()),
    }
}

fn mul(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::Int(a), Num::Int(b)) => a
            .checked_mul(b)
            .map(Num::Int)
            .unwrap_or(Num::Float(a as f64 * b as f64)),
        _ => Num::Float(a.as_f64() * b.as_f64()),
    }
}

/// True division. Always produces a float, like Python's `/`.
fn div(a: Num, b: Num) -> Result<Num, ExprError> {
    if b.as_f64() == 0.0 {
        return Err(ExprError::DivisionByZero);
    }
    Ok(Num::Float(a.as_f64() / b.as_f64()))
}

/// Remainder with the sign of the divisor, matching Python's `%`.
fn rem(a: Num, b: Num) -> Result<Num, ExprError> {
    match (a, b) {
        (Num::Int(a), Num::Int(b)) => {
            if b == 0 {
                return Err(ExprError::ModuloByZero);
            }
            Ok(Num::Int(((a % b) + b) % b))
        }
        _ => {
            let (a, b) = (a.as_f64(), b.as_f64());
            if b == 0.0 {
                return Err(ExprError::ModuloByZero);
            }
            Ok(Num::Float(a - b * (a / b).floor()))
        }
    }
}

fn pow(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::Int(base), Num::Int(exp)) if (0..=u32::MAX as i64).contains(&exp) => base
            .checked_pow(exp as u32)
            .map(Num::Int)
            .unwrap_or(Num::Float((base as f64).powf(exp as f64))),
        _ => Num::Float(a.as_f64().powf(b.as_f64())),
    }
}

fn neg(a: Num) -> Num {
    match a {
        Num::Int(i) => i.checked_neg().map(Num::Int).unwrap_or(Num::Float(-(i as f64))),
        Num::Float(f) => Num::Float(-f),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Num),
    Ident(String),
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::StarStar => write!(f, "**"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
        }
    }
}

fn lex(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                if chars.peek() == Some(&'*') {
                    chars.next();
                    tokens.push(Token::StarStar);
                } else {
                    tokens.push(Token::Star);
                }
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '%' => {
                chars.next();
                tokens.push(Token::Percent);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut literal = String::new();
                let mut is_float = false;
                while let Some(&c) = chars.peek() {
                    match c {
                        '0'..='9' => literal.push(c),
                        '.' => {
                            is_float = true;
                            literal.push(c);
                        }
                        'e' | 'E' => {
                            is_float = true;
                            literal.push(c);
                            chars.next();
                            match chars.peek() {
                                Some(&sign) if sign == '+' || sign == '-' => literal.push(sign),
                                _ => continue,
                            }
                        }
                        _ => break,
                    }
                    chars.next();
                }
                let num = if is_float {
                    Num::Float(
                        literal
                            .parse::<f64>()
                            .map_err(|_| ExprError::UnexpectedToken(literal.clone()))?,
                    )
                } else {
                    match literal.parse::<i64>() {
                        Ok(i) => Num::Int(i),
                        Err(_) => Num::Float(
                            literal
                                .parse::<f64>()
                                .map_err(|_| ExprError::UnexpectedToken(literal.clone()))?,
                        ),
                    }
                };
                tokens.push(Token::Number(num));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(ExprError::UnexpectedChar(other)),
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

    fn next(&mut self) -> Result<Token, ExprError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExprError> {
        let token = self.next()?;
        if token == expected {
            Ok(())
        } else {
            Err(ExprError::UnexpectedToken(token.to_string()))
        }
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Num, ExprError> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            let op = op.clone();
            self.pos += 1;
            let rhs = self.term()?;
            value = match op {
                Token::Plus => add(value, rhs),
                _ => sub(value, rhs),
            };
        }
        Ok(value)
    }

    // term := unary (('*' | '/' | '%') unary)*
    fn term(&mut self) -> Result<Num, ExprError> {
        let mut value = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::Percent)) = self.peek() {
            let op = op.clone();
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                Token::Star => mul(value, rhs),
                Token::Slash => div(value, rhs)?,
                _ => rem(value, rhs)?,
            };
        }
        Ok(value)
    }

    // unary := ('-' | '+') unary | power
    fn unary(&mut self) -> Result<Num, ExprError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(neg(self.unary()?))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    // power := primary ('**' unary)?   (right-associative, binds tighter
    // than unary minus on its left)
    fn power(&mut self) -> Result<Num, ExprError> {
        let base = self.primary()?;
        if self.peek() == Some(&Token::StarStar) {
            self.pos += 1;
            let exp = self.unary()?;
            return Ok(pow(base, exp));
        }
        Ok(base)
    }

    // primary := Number | Ident ('(' args ')')? | '(' expr ')'
    fn primary(&mut self) -> Result<Num, ExprError> {
        match self.next()? {
            Token::Number(n) => Ok(n),
            Token::LParen => {
                let value = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(value)
            }
            Token::Ident(name) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let args = self.call_args()?;
                    apply_function(&name, &args)
                } else {
                    match name.as_str() {
                        "pi" => Ok(Num::Float(std::f64::consts::PI)),
                        "e" => Ok(Num::Float(std::f64::consts::E)),
                        "sqrt" | "sin" | "cos" | "tan" | "log" | "abs" | "round" | "pow" => {
                            Err(ExprError::NotAValue(name))
                        }
                        _ => Err(ExprError::UnknownName(name)),
                    }
                }
            }
            other => Err(ExprError::UnexpectedToken(other.to_string())),
        }
    }

    fn call_args(&mut self) -> Result<Vec<Num>, ExprError> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            match self.next()? {
                Token::Comma => continue,
                Token::RParen => return Ok(args),
                other => return Err(ExprError::UnexpectedToken(other.to_string())),
            }
        }
    }
}

fn apply_function(name: &str, args: &[Num]) -> Result<Num, ExprError> {
    let unary = |name: &'static str| -> Result<f64, ExprError> {
        match args {
            [x] => Ok(x.as_f64()),
            _ => Err(ExprError::WrongArity(name, "1", args.len())),
        }
    };

    match name {
        "sqrt" => Ok(Num::Float(unary("sqrt")?.sqrt())),
        "sin" => Ok(Num::Float(unary("sin")?.sin())),
        "cos" => Ok(Num::Float(unary("cos")?.cos())),
        "tan" => Ok(Num::Float(unary("tan")?.tan())),
        "log" => match args {
            [x] => Ok(Num::Float(x.as_f64().ln())),
            [x, base] => Ok(Num::Float(x.as_f64().ln() / base.as_f64().ln())),
            _ => Err(ExprError::WrongArity("log", "1 or 2", args.len())),
        },
        "abs" => match args {
            [Num::Int(i)] => Ok(i
                .checked_abs()
                .map(Num::Int)
                .unwrap_or(Num::Float((*i as f64).abs()))),
            [Num::Float(f)] => Ok(Num::Float(f.abs())),
            _ => Err(ExprError::WrongArity("abs", "1", args.len())),
        },
        "round" => match args {
            [Num::Int(i)] => Ok(Num::Int(*i)),
            [Num::Float(f)] => Ok(Num::Int(f.round_ties_even() as i64)),
            [x, Num::Int(digits)] => {
                let factor = 10f64.powi(*digits as i32);
                Ok(Num::Float((x.as_f64() * factor).round_ties_even() / factor))
            }
            _ => Err(ExprError::WrongArity("round", "1 or 2", args.len())),
        },
        "pow" => match args {
            [a, b] => Ok(pow(*a, *b)),
            _ => Err(ExprError::WrongArity("pow", "2", args.len())),
        },
        other => Err(ExprError::UnknownName(other.to_string())),
    }
}

fn eval(input: &str) -> Result<Num, ExprError> {
    let tokens = lex(input)?;
    if tokens.is_empty() {
        return Err(ExprError::UnexpectedEnd);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr()?;
    if let Some(extra) = parser.peek() {
        return Err(ExprError::UnexpectedToken(extra.to_string()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn run(expression: &str) -> String {
        Calculator
            .execute(json!({ "expression": expression }))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn integer_arithmetic_stays_integral() {
        assert_eq!(run("2 + 2").await, "4");
        assert_eq!(run("(2 + 3) * 4").await, "20");
        assert_eq!(run("2 ** 10").await, "1024");
        assert_eq!(run("pow(2, 8)").await, "256");
        assert_eq!(run("7 % 3").await, "1");
        assert_eq!(run("-3 + 1").await, "-2");
        assert_eq!(run("abs(-5)").await, "5");
    }

    #[tokio::test]
    async fn float_results_keep_a_decimal_point() {
        assert_eq!(run("sqrt(16) * 3").await, "12.0");
        assert_eq!(run("10 / 4").await, "2.5");
        assert_eq!(run("10 / 5").await, "2.0");
        assert_eq!(run("log(e)").await, "1.0");
        assert_eq!(run("1.5 + 1.5").await, "3.0");
    }

    #[tokio::test]
    async fn constants_and_functions() {
        assert_eq!(run("pi").await, "3.141592653589793");
        assert_eq!(run("cos(0)").await, "1.0");
        assert_eq!(run("round(3.7)").await, "4");
        assert_eq!(run("log(1)").await, "0.0");

        // Base conversion goes through ln(x)/ln(base); allow float slop.
        let out = run("log(8, 2)").await;
        let value: f64 = out.parse().unwrap();
        assert!((value - 3.0).abs() < 1e-9, "{}", out);
    }

    #[tokio::test]
    async fn negative_exponent_produces_float() {
        assert_eq!(run("2 ** -1").await, "0.5");
    }

    #[tokio::test]
    async fn unary_minus_binds_looser_than_power() {
        assert_eq!(run("-2 ** 2").await, "-4");
    }

    #[tokio::test]
    async fn division_by_zero_is_reported() {
        let out = run("1 / 0").await;
        assert_eq!(out, "Error evaluating expression: division by zero");
    }

    #[tokio::test]
    async fn unknown_names_are_rejected() {
        let out = run("foo(1)").await;
        assert_eq!(
            out,
            "Error evaluating expression: name 'foo' is not defined"
        );
        let out = run("x + 1").await;
        assert_eq!(out, "Error evaluating expression: name 'x' is not defined");
    }

    #[tokio::test]
    async fn code_injection_attempts_only_yield_errors() {
        let out = run("__import__('os')").await;
        assert!(out.starts_with("Error evaluating expression:"), "{}", out);

        let out = run("().__class__").await;
        assert!(out.starts_with("Error evaluating expression:"), "{}", out);
    }

    #[tokio::test]
    async fn syntax_errors_are_reported() {
        assert!(run("2 +").await.starts_with("Error evaluating expression:"));
        assert!(run("(1 + 2").await.starts_with("Error evaluating expression:"));
        assert!(run("").await.starts_with("Error evaluating expression:"));
        assert!(run("1 2").await.starts_with("Error evaluating expression:"));
    }

    #[test]
    fn python_style_modulo_follows_divisor_sign() {
        assert_eq!(eval("-7 % 3").unwrap(), Num::Int(2));
        assert_eq!(eval("7 % -3").unwrap(), Num::Int(-2));
    }
}
