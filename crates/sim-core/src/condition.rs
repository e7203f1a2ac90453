//! Restricted condition language for data-driven triggers.
//!
//! The grammar is closed: numeric literals, `true`/`false`, a fixed set of
//! state identifiers, arithmetic `+ - * /`, comparisons
//! `< <= > >= == !=`, boolean `and`/`or` and parentheses. There are no
//! calls, no attribute access and no side effects.
//!
//! ```text
//! expr  := and ("or" and)*
//! and   := cmp ("and" cmp)*
//! cmp   := sum (CMP sum)?
//! sum   := term (("+" | "-") term)*
//! term  := unary (("*" | "/") unary)*
//! unary := "-" unary | atom
//! atom  := NUMBER | "true" | "false" | IDENT | "(" expr ")"
//! ```
//!
//! Evaluation fails closed: any parse or evaluation error yields `false`
//! and a `warn!` log line.

use crate::state::GameState;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;
use tracing::warn;

const MAX_SOURCE_LEN: usize = 512;
const MAX_DEPTH: usize = 32;

/// Reasons a condition cannot be compiled or evaluated.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConditionError {
    /// Source is blank.
    #[error("empty condition")]
    Empty,
    /// Source exceeds the length limit.
    #[error("condition longer than {MAX_SOURCE_LEN} characters")]
    TooLong,
    /// Nesting exceeds the depth limit.
    #[error("condition nested deeper than {MAX_DEPTH} levels")]
    TooDeep,
    /// Character outside the grammar.
    #[error("unexpected character {0:?} at {1}")]
    UnexpectedChar(char, usize),
    /// Numeric literal could not be parsed.
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
    /// Identifier outside the whitelist.
    #[error("unknown identifier {0:?}")]
    UnknownIdentifier(String),
    /// `a.b` style traversal.
    #[error("attribute access is not allowed: {0}")]
    AttributeAccess(String),
    /// `f(x)` style call.
    #[error("function calls are not allowed: {0}")]
    FunctionCall(String),
    /// Token in the wrong place.
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    /// Input ended mid-expression.
    #[error("unexpected end of condition")]
    UnexpectedEnd,
    /// Operand types do not fit the operator.
    #[error("type mismatch: {0}")]
    TypeMismatch(&'static str),
    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// Arithmetic produced NaN or infinity.
    #[error("non-finite arithmetic result")]
    NonFinite,
}

/// State fields a condition may read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Var {
    Turn,
    Money,
    Compute,
    Safety,
    Capabilities,
    Reputation,
    ComputeRate,
    StaffMaintenanceCost,
    TotalEmployees,
    UpgradeCount,
    ProjectCount,
}

impl Var {
    fn lookup(name: &str) -> Option<Var> {
        Some(match name {
            "turn" => Var::Turn,
            "money" => Var::Money,
            "compute" => Var::Compute,
            "safety" => Var::Safety,
            "capabilities" => Var::Capabilities,
            "reputation" => Var::Reputation,
            "compute_rate" => Var::ComputeRate,
            "staff_maintenance_cost" => Var::StaffMaintenanceCost,
            "total_employees" => Var::TotalEmployees,
            "upgrade_count" => Var::UpgradeCount,
            "project_count" => Var::ProjectCount,
            _ => return None,
        })
    }

    fn read(self, s: &GameState) -> f64 {
        let as_f64 = |d: Decimal| d.to_f64().unwrap_or_default();
        match self {
            Var::Turn => f64::from(s.turn),
            Var::Money => as_f64(s.money),
            Var::Compute => as_f64(s.compute),
            Var::Safety => as_f64(s.safety),
            Var::Capabilities => as_f64(s.capabilities),
            Var::Reputation => as_f64(s.reputation),
            Var::ComputeRate => as_f64(s.compute_rate),
            Var::StaffMaintenanceCost => as_f64(s.staff_maintenance_cost),
            Var::TotalEmployees => s.total_employees() as f64,
            Var::UpgradeCount => s.upgrades.len() as f64,
            Var::ProjectCount => s.active_projects.len() as f64,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    True,
    False,
    And,
    Or,
    Cmp(CmpOp),
    Arith(ArithOp),
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Num(n) => write!(f, "{n}"),
            Token::Ident(s) => f.write_str(s),
            Token::True => f.write_str("true"),
            Token::False => f.write_str("false"),
            Token::And => f.write_str("and"),
            Token::Or => f.write_str("or"),
            Token::Cmp(op) => f.write_str(match op {
                CmpOp::Lt => "<",
                CmpOp::Le => "<=",
                CmpOp::Gt => ">",
                CmpOp::Ge => ">=",
                CmpOp::Eq => "==",
                CmpOp::Ne => "!=",
            }),
            Token::Arith(op) => f.write_str(match op {
                ArithOp::Add => "+",
                ArithOp::Sub => "-",
                ArithOp::Mul => "*",
                ArithOp::Div => "/",
            }),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

fn tokenize(src: &str) -> Result<Vec<Token>, ConditionError> {
    let chars: Vec<char> = src.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                out.push(Token::LParen);
                i += 1;
            }
            ')' => {
                out.push(Token::RParen);
                i += 1;
            }
            '+' => {
                out.push(Token::Arith(ArithOp::Add));
                i += 1;
            }
            '-' => {
                out.push(Token::Arith(ArithOp::Sub));
                i += 1;
            }
            '*' => {
                out.push(Token::Arith(ArithOp::Mul));
                i += 1;
            }
            '/' => {
                out.push(Token::Arith(ArithOp::Div));
                i += 1;
            }
            '<' | '>' | '=' | '!' => {
                let eq = chars.get(i + 1) == Some(&'=');
                let op = match (c, eq) {
                    ('<', true) => CmpOp::Le,
                    ('<', false) => CmpOp::Lt,
                    ('>', true) => CmpOp::Ge,
                    ('>', false) => CmpOp::Gt,
                    ('=', true) => CmpOp::Eq,
                    ('!', true) => CmpOp::Ne,
                    _ => return Err(ConditionError::UnexpectedChar(c, i)),
                };
                out.push(Token::Cmp(op));
                i += if eq { 2 } else { 1 };
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == '_')
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().filter(|c| **c != '_').collect();
                let value: f64 = text
                    .parse()
                    .map_err(|_| ConditionError::InvalidNumber(text.clone()))?;
                out.push(Token::Num(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if chars.get(i) == Some(&'.') {
                    return Err(ConditionError::AttributeAccess(word));
                }
                out.push(match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "true" => Token::True,
                    "false" => Token::False,
                    _ => Token::Ident(word),
                });
            }
            other => return Err(ConditionError::UnexpectedChar(other, i)),
        }
    }
    Ok(out)
}

#[derive(Clone, Debug, PartialEq)]
enum Expr {
    Num(f64),
    Bool(bool),
    Var(Var),
    Neg(Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn enter(&mut self) -> Result<(), ConditionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ConditionError::TooDeep);
        }
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_cmp()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.parse_cmp()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> Result<Expr, ConditionError> {
        let lhs = self.parse_sum()?;
        if let Some(Token::Cmp(op)) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.parse_sum()?;
            if let Some(Token::Cmp(_)) = self.peek() {
                return Err(ConditionError::UnexpectedToken(
                    "chained comparison".to_string(),
                ));
            }
            return Ok(Expr::Cmp(op, Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn parse_sum(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_term()?;
        while let Some(Token::Arith(op @ (ArithOp::Add | ArithOp::Sub))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.parse_term()?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_unary()?;
        while let Some(Token::Arith(op @ (ArithOp::Mul | ArithOp::Div))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ConditionError> {
        if self.peek() == Some(&Token::Arith(ArithOp::Sub)) {
            self.pos += 1;
            self.enter()?;
            let inner = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Expr, ConditionError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::True) => Ok(Expr::Bool(true)),
            Some(Token::False) => Ok(Expr::Bool(false)),
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    return Err(ConditionError::FunctionCall(name));
                }
                Var::lookup(&name)
                    .map(Expr::Var)
                    .ok_or(ConditionError::UnknownIdentifier(name))
            }
            Some(Token::LParen) => {
                self.enter()?;
                let inner = self.parse_or()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(t) => Err(ConditionError::UnexpectedToken(t.to_string())),
                    None => Err(ConditionError::UnexpectedEnd),
                }
            }
            Some(t) => Err(ConditionError::UnexpectedToken(t.to_string())),
            None => Err(ConditionError::UnexpectedEnd),
        }
    }
}

fn parse(src: &str) -> Result<Expr, ConditionError> {
    if src.trim().is_empty() {
        return Err(ConditionError::Empty);
    }
    if src.len() > MAX_SOURCE_LEN {
        return Err(ConditionError::TooLong);
    }
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_or()?;
    if let Some(t) = parser.peek() {
        return Err(ConditionError::UnexpectedToken(t.to_string()));
    }
    Ok(expr)
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Value {
    Num(f64),
    Bool(bool),
}

fn eval(expr: &Expr, state: &GameState) -> Result<Value, ConditionError> {
    let v = match expr {
        Expr::Num(n) => Value::Num(*n),
        Expr::Bool(b) => Value::Bool(*b),
        Expr::Var(v) => Value::Num(v.read(state)),
        Expr::Neg(inner) => Value::Num(-num(eval(inner, state)?)?),
        Expr::Arith(op, l, r) => {
            let a = num(eval(l, state)?)?;
            let b = num(eval(r, state)?)?;
            let out = match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::Div => {
                    if b == 0.0 {
                        return Err(ConditionError::DivisionByZero);
                    }
                    a / b
                }
            };
            if !out.is_finite() {
                return Err(ConditionError::NonFinite);
            }
            Value::Num(out)
        }
        Expr::Cmp(op, l, r) => {
            let a = eval(l, state)?;
            let b = eval(r, state)?;
            Value::Bool(match (a, b) {
                (Value::Num(x), Value::Num(y)) => match op {
                    CmpOp::Lt => x < y,
                    CmpOp::Le => x <= y,
                    CmpOp::Gt => x > y,
                    CmpOp::Ge => x >= y,
                    CmpOp::Eq => x == y,
                    CmpOp::Ne => x != y,
                },
                (Value::Bool(x), Value::Bool(y)) => match op {
                    CmpOp::Eq => x == y,
                    CmpOp::Ne => x != y,
                    _ => return Err(ConditionError::TypeMismatch("ordering on booleans")),
                },
                _ => return Err(ConditionError::TypeMismatch("comparison of mixed types")),
            })
        }
        Expr::And(l, r) => Value::Bool(boolean(eval(l, state)?)? && boolean(eval(r, state)?)?),
        Expr::Or(l, r) => Value::Bool(boolean(eval(l, state)?)? || boolean(eval(r, state)?)?),
    };
    Ok(v)
}

fn num(v: Value) -> Result<f64, ConditionError> {
    match v {
        Value::Num(n) => Ok(n),
        Value::Bool(_) => Err(ConditionError::TypeMismatch("expected a number")),
    }
}

fn boolean(v: Value) -> Result<bool, ConditionError> {
    match v {
        Value::Bool(b) => Ok(b),
        Value::Num(_) => Err(ConditionError::TypeMismatch("expected a boolean")),
    }
}

/// A compiled condition.
///
/// Compilation never fails outright: a condition that does not parse is
/// kept in its failed form and always evaluates to `false`.
#[derive(Clone, Debug)]
pub struct Condition {
    source: String,
    compiled: Result<Expr, ConditionError>,
}

impl Condition {
    /// Compile `source`, logging once when it is malformed.
    pub fn compile(source: &str) -> Self {
        let compiled = parse(source);
        if let Err(e) = &compiled {
            warn!(condition = source, error = %e, "malformed condition; it will never hold");
        }
        Self {
            source: source.to_string(),
            compiled,
        }
    }

    /// Compile `source`, returning the parse error instead of keeping it.
    pub fn parse(source: &str) -> Result<Self, ConditionError> {
        let compiled = parse(source)?;
        Ok(Self {
            source: source.to_string(),
            compiled: Ok(compiled),
        })
    }

    /// Original source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parse error, if the condition is malformed.
    pub fn error(&self) -> Option<&ConditionError> {
        self.compiled.as_ref().err()
    }

    /// Evaluate against `state`, surfacing errors.
    pub fn try_evaluate(&self, state: &GameState) -> Result<bool, ConditionError> {
        let expr = self.compiled.as_ref().map_err(Clone::clone)?;
        boolean(eval(expr, state)?)
    }

    /// Evaluate against `state`; any error yields `false`.
    pub fn evaluate(&self, state: &GameState) -> bool {
        match self.try_evaluate(state) {
            Ok(b) => b,
            Err(e) => {
                warn!(condition = %self.source, error = %e, "condition failed closed");
                false
            }
        }
    }
}

impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn state() -> GameState {
        let mut s = GameState {
            turn: 12,
            money: Decimal::from(40_000),
            compute: Decimal::from(20),
            safety: Decimal::from(15),
            ..GameState::default()
        };
        s.employees.insert("safety_researchers".into(), 3);
        s
    }

    fn holds(src: &str) -> bool {
        Condition::compile(src).evaluate(&state())
    }

    #[test]
    fn comparisons_and_arithmetic() {
        assert!(holds("money < 50000"));
        assert!(holds("money <= 40_000"));
        assert!(holds("turn >= 12 and safety > 10"));
        assert!(holds("compute * 2 == 40"));
        assert!(holds("(money - 30000) / 1000 != 5"));
        assert!(holds("-safety < 0"));
        assert!(holds("total_employees == 3"));
        assert!(!holds("money > 50000 or turn < 5"));
    }

    #[test]
    fn precedence_binds_and_tighter_than_or() {
        // true or (false and false)
        assert!(holds("turn == 12 or money > 90000 and turn == 0"));
        assert!(!holds("(turn == 12 or money > 90000) and turn == 0"));
        assert!(holds("1 + 2 * 3 == 7"));
    }

    #[test]
    fn disallowed_constructs_fail_closed() {
        for src in [
            "__import__('os')",
            "state.money > 0",
            "len(employees) > 0",
            "doom > 0",
            "money >",
            "money > 0 )",
            "1 < 2 < 3",
            "money = 5",
            "",
            "money > 0; turn",
        ] {
            let c = Condition::compile(src);
            assert!(c.error().is_some(), "{src:?} should not compile");
            assert!(!c.evaluate(&state()));
        }
    }

    #[test]
    fn specific_errors_are_reported() {
        assert!(matches!(
            Condition::parse("state.money > 0"),
            Err(ConditionError::AttributeAccess(_))
        ));
        assert!(matches!(
            Condition::parse("abs(money) > 0"),
            Err(ConditionError::FunctionCall(_))
        ));
        assert!(matches!(
            Condition::parse("doom > 0"),
            Err(ConditionError::UnknownIdentifier(_))
        ));
    }

    #[test]
    fn runtime_errors_fail_closed() {
        let c = Condition::parse("money / (turn - 12) > 0").unwrap();
        assert_eq!(c.try_evaluate(&state()), Err(ConditionError::DivisionByZero));
        assert!(!c.evaluate(&state()));

        let c = Condition::parse("money + 1").unwrap();
        assert!(matches!(
            c.try_evaluate(&state()),
            Err(ConditionError::TypeMismatch(_))
        ));

        let c = Condition::parse("true and 1").unwrap();
        assert!(!c.evaluate(&state()));
    }

    #[test]
    fn nesting_is_bounded() {
        let deep = format!("{}1{} > 0", "(".repeat(40), ")".repeat(40));
        assert_eq!(Condition::parse(&deep), Err(ConditionError::TooDeep));
    }

    proptest! {
        #[test]
        fn arbitrary_input_never_panics(src in ".{0,64}") {
            let _ = Condition::compile(&src).evaluate(&state());
        }

        #[test]
        fn money_threshold_matches_direct_compare(limit in -1_000_000i64..1_000_000) {
            // Negative literals parse through unary minus.
            let c = Condition::parse(&format!("money >= {limit}")).unwrap();
            prop_assert_eq!(c.evaluate(&state()), state().money >= Decimal::from(limit));
        }
    }
}
