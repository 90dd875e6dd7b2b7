//! # Tokenizer
//!
//! Lowers an `Expr` into the flat prefix `TokenList` the evaluator walks. Every operator is
//! followed by exactly `arity` operand spans; an aggregate is followed by its lower bound, upper
//! bound, body and finally a `Binder` naming the index variable.
use crate::series::bracketer::parse_normalized;
use crate::series::series_engine::{AggregateKind, Expr, Function};
use crate::series::series_errors::ParseError;
use crate::series::series_settings::DEFAULT_MAX_DEPTH;
use num_complex::Complex64;
use std::fmt;
use std::ops::Index;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Function(Function),
    Log,
    Sum,
    Product,
    Integral,
}

impl Operator {
    /// Number of operand spans following the operator. Aggregates count their binder.
    pub fn arity(&self) -> usize {
        match self {
            Operator::Function(_) => 1,
            Operator::Add
            | Operator::Sub
            | Operator::Mul
            | Operator::Div
            | Operator::Pow
            | Operator::Log => 2,
            Operator::Sum | Operator::Product | Operator::Integral => 4,
        }
    }

    pub fn aggregate(kind: AggregateKind) -> Operator {
        match kind {
            AggregateKind::Sum => Operator::Sum,
            AggregateKind::Product => Operator::Product,
            AggregateKind::Integral => Operator::Integral,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operator::Add => write!(f, "+"),
            Operator::Sub => write!(f, "-"),
            Operator::Mul => write!(f, "*"),
            Operator::Div => write!(f, "/"),
            Operator::Pow => write!(f, "^"),
            Operator::Function(function) => write!(f, "{}", function),
            Operator::Log => write!(f, "log"),
            Operator::Sum => write!(f, "sum"),
            Operator::Product => write!(f, "prod"),
            Operator::Integral => write!(f, "int"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token {
    Literal(Complex64),
    /// `x`, `n` or an index variable
    Variable(char),
    Operator(Operator),
    /// last operand of an aggregate
    Binder(char),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Literal(value) => write!(f, "({},{})", value.re, value.im),
            Token::Variable(name) => write!(f, "{}", name),
            Token::Operator(op) => write!(f, "{}", op),
            Token::Binder(name) => write!(f, "[{}]", name),
        }
    }
}

/// Prefix-ordered token sequence. Immutable once built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TokenList {
    tokens: Vec<Token>,
}

impl TokenList {
    pub fn from_expr(expr: &Expr) -> TokenList {
        let mut tokens = Vec::new();
        lower(expr, &mut tokens);
        TokenList { tokens }
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    /// Exclusive end of the operand span starting at `start`, or `None` if the list ends first.
    pub fn span_end(&self, start: usize) -> Option<usize> {
        span_end(&self.tokens, start)
    }
}

/// Exclusive end of the operand span starting at `start` in a prefix token slice.
pub fn span_end(tokens: &[Token], start: usize) -> Option<usize> {
    let mut pending = 1usize;
    let mut pos = start;
    while pending > 0 {
        let token = tokens.get(pos)?;
        pending -= 1;
        if let Token::Operator(op) = token {
            pending += op.arity();
        }
        pos += 1;
    }
    Some(pos)
}

impl Index<usize> for TokenList {
    type Output = Token;

    fn index(&self, index: usize) -> &Token {
        &self.tokens[index]
    }
}

impl From<Vec<Token>> for TokenList {
    fn from(tokens: Vec<Token>) -> Self {
        TokenList { tokens }
    }
}

impl fmt::Display for TokenList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let rendered: Vec<String> = self.tokens.iter().map(|t| t.to_string()).collect();
        write!(f, "{}", rendered.join(" "))
    }
}

fn lower(expr: &Expr, tokens: &mut Vec<Token>) {
    let binary = |op: Operator, lhs: &Expr, rhs: &Expr, tokens: &mut Vec<Token>| {
        tokens.push(Token::Operator(op));
        lower(lhs, tokens);
        lower(rhs, tokens);
    };
    match expr {
        Expr::Const(value) => tokens.push(Token::Literal(*value)),
        Expr::Constant(constant) => tokens.push(Token::Literal(constant.value())),
        Expr::Var(name) => tokens.push(Token::Variable(*name)),
        Expr::Add(lhs, rhs) => binary(Operator::Add, lhs, rhs, tokens),
        Expr::Sub(lhs, rhs) => binary(Operator::Sub, lhs, rhs, tokens),
        Expr::Mul(lhs, rhs) => binary(Operator::Mul, lhs, rhs, tokens),
        Expr::Div(lhs, rhs) => binary(Operator::Div, lhs, rhs, tokens),
        Expr::Pow(lhs, rhs) => binary(Operator::Pow, lhs, rhs, tokens),
        Expr::Log(value, base) => binary(Operator::Log, value, base, tokens),
        Expr::Func(function, arg) => {
            tokens.push(Token::Operator(Operator::Function(*function)));
            lower(arg, tokens);
        }
        Expr::Aggregate {
            kind,
            lower: lo,
            upper,
            body,
            var,
        } => {
            tokens.push(Token::Operator(Operator::aggregate(*kind)));
            lower(lo, tokens);
            lower(upper, tokens);
            lower(body, tokens);
            tokens.push(Token::Binder(*var));
        }
    }
}

/// Parses a bracketed expression and lowers it into prefix order.
pub fn tokenize(s: &str) -> Result<TokenList, ParseError> {
    let expr = parse_normalized(s, DEFAULT_MAX_DEPTH)?;
    Ok(TokenList::from_expr(&expr))
}
