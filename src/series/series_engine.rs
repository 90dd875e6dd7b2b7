//! # Series Engine Module
//!
//! Core expression types shared by every stage of the series pipeline.
//!
//! ## Main Structures
//!
//! ### `Keyword` and friends
//! The fixed alphabet of names a user may type: one-argument functions (`Function`), the
//! two-argument `log`, the four-argument aggregates `sum`/`prod`/`int` (`AggregateKind`) and the
//! constants `pi`/`e` (`Constant`). Names are derived with `strum` so that lexing, printing and
//! parsing all share one table.
//!
//! ### `Expr` Enum
//! The abstract syntax tree produced by the bracketer:
//! - **Leaves**: `Const(Complex64)`, `Constant(pi|e)`, `Var(char)` (`x`, `n` or a bound index)
//! - **Operations**: `Add`, `Sub`, `Mul`, `Div`, `Pow`
//! - **Calls**: `Func`, `Log`, `Aggregate`
//!
//! `Display` renders the tree fully bracketed, which is the string form handed between the
//! bracketer, the constant folder and the tokenizer.
#![allow(non_camel_case_types)]

use itertools::Itertools;
use num_complex::Complex64;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// One-argument functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Function {
    Sinh,
    Cosh,
    Asin,
    Sin,
    Acos,
    Cos,
    Atan,
    Tanh,
    Sqrt,
    Exp,
    Abs,
    Re,
    Im,
    Conj,
    Lg,
    Ln,
    Sign,
    Acot,
    Coth,
    Tan,
    Cot,
    Floor,
    Ceil,
    Asinh,
    Acosh,
    Atanh,
    Acoth,
}

/// Four-argument operators ranging over a bound index variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, IntoStaticStr)]
pub enum AggregateKind {
    #[strum(serialize = "sum")]
    Sum,
    #[strum(serialize = "prod")]
    Product,
    #[strum(serialize = "int")]
    Integral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Constant {
    Pi,
    E,
}

impl Constant {
    pub fn value(&self) -> Complex64 {
        match self {
            Constant::Pi => Complex64::new(std::f64::consts::PI, 0.0),
            Constant::E => Complex64::new(std::f64::consts::E, 0.0),
        }
    }
}

/// Every multi-character name the lexer knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Function(Function),
    Log,
    Aggregate(AggregateKind),
    Constant(Constant),
}

static KEYWORD_TABLE: LazyLock<Vec<(&'static str, Keyword)>> = LazyLock::new(|| {
    let functions = Function::iter().map(|f| (<&'static str>::from(f), Keyword::Function(f)));
    let aggregates =
        AggregateKind::iter().map(|a| (<&'static str>::from(a), Keyword::Aggregate(a)));
    let constants = Constant::iter().map(|c| (<&'static str>::from(c), Keyword::Constant(c)));
    functions
        .chain(std::iter::once(("log", Keyword::Log)))
        .chain(aggregates)
        .chain(constants)
        // longest first so that "sinh" wins over "sin" and "exp" over "e"
        .sorted_by_key(|(name, _)| std::cmp::Reverse(name.len()))
        .collect()
});

impl Keyword {
    pub fn name(&self) -> &'static str {
        match self {
            Keyword::Function(f) => (*f).into(),
            Keyword::Log => "log",
            Keyword::Aggregate(a) => (*a).into(),
            Keyword::Constant(c) => (*c).into(),
        }
    }

    /// Number of bracketed arguments the keyword takes (constants take none).
    pub fn arity(&self) -> usize {
        match self {
            Keyword::Function(_) => 1,
            Keyword::Log => 2,
            Keyword::Aggregate(_) => 4,
            Keyword::Constant(_) => 0,
        }
    }

    /// Longest keyword that starts `input`, together with its length in bytes.
    pub fn longest_prefix(input: &str) -> Option<(Keyword, usize)> {
        KEYWORD_TABLE
            .iter()
            .find(|(name, _)| input.starts_with(name))
            .map(|(name, keyword)| (*keyword, name.len()))
    }
}

/// Abstract syntax tree of one compiled expression.
///
/// # Examples
/// ```rust, ignore
/// let expr = Expr::Var('x') * Expr::real(2.0);
/// assert_eq!(expr.to_string(), "(x*(2))");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Complex literal
    Const(Complex64),
    /// `pi` or `e`
    Constant(Constant),
    /// `x`, `n` or an index variable bound by an enclosing aggregate
    Var(char),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Func(Function, Box<Expr>),
    /// `log(value; base)`
    Log(Box<Expr>, Box<Expr>),
    /// `sum|prod|int(lower; upper; body; var)`
    Aggregate {
        kind: AggregateKind,
        lower: Box<Expr>,
        upper: Box<Expr>,
        body: Box<Expr>,
        var: char,
    },
}

impl Expr {
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    pub fn real(value: f64) -> Expr {
        Expr::Const(Complex64::new(value, 0.0))
    }

    pub fn pow(self, exponent: Expr) -> Expr {
        Expr::Pow(self.boxed(), exponent.boxed())
    }

    pub fn func(function: Function, arg: Expr) -> Expr {
        Expr::Func(function, arg.boxed())
    }

    pub fn aggregate(kind: AggregateKind, lower: Expr, upper: Expr, body: Expr, var: char) -> Expr {
        Expr::Aggregate {
            kind,
            lower: lower.boxed(),
            upper: upper.boxed(),
            body: body.boxed(),
            var,
        }
    }

    /// Direct children in evaluation order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Const(_) | Expr::Constant(_) | Expr::Var(_) => Vec::new(),
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs)
            | Expr::Log(lhs, rhs) => vec![lhs, rhs],
            Expr::Func(_, arg) => vec![arg],
            Expr::Aggregate {
                lower, upper, body, ..
            } => vec![lower, upper, body],
        }
    }

    /// Variables referenced but not bound inside this subtree.
    pub fn free_variables(&self) -> BTreeSet<char> {
        match self {
            Expr::Const(_) | Expr::Constant(_) => BTreeSet::new(),
            Expr::Var(name) => BTreeSet::from([*name]),
            Expr::Aggregate {
                lower,
                upper,
                body,
                var,
                ..
            } => {
                let mut free = lower.free_variables();
                free.extend(upper.free_variables());
                free.extend(body.free_variables().into_iter().filter(|v| v != var));
                free
            }
            other => other
                .children()
                .into_iter()
                .flat_map(|child| child.free_variables())
                .collect(),
        }
    }

    /// true if the subtree can be evaluated without any variable binding
    pub fn is_closed(&self) -> bool {
        self.free_variables().is_empty()
    }

    /// Number of nodes on the longest root-to-leaf path. Iterative, so it is safe to call on
    /// trees that are too deep to evaluate.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((node, level)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(node.children().into_iter().map(|child| (child, level + 1)));
        }
        deepest
    }
}

/// Renders a complex value as a bracketed literal the parser reads back, choosing the shortest
/// form for each sign combination.
pub fn format_complex_literal(value: Complex64) -> String {
    let (re, im) = (value.re, value.im);
    let (abs_re, abs_im) = (re.abs(), im.abs());
    match (re, im) {
        (r, i) if r == 0.0 && i == 0.0 => "(0)".to_string(),
        (r, i) if i == 0.0 && r > 0.0 => format!("({})", abs_re),
        (_, i) if i == 0.0 => format!("(0-{})", abs_re),
        (r, i) if r == 0.0 && i > 0.0 => format!("({}*i)", abs_im),
        (r, _) if r == 0.0 => format!("(0-{}*i)", abs_im),
        (r, i) if r > 0.0 && i > 0.0 => format!("({}+{}*i)", abs_re, abs_im),
        (r, _) if r > 0.0 => format!("({}-{}*i)", abs_re, abs_im),
        (_, i) if i > 0.0 => format!("(0-{}+{}*i)", abs_re, abs_im),
        _ => format!("(0-{}-{}*i)", abs_re, abs_im),
    }
}

/// Fully bracketed rendering; every binary operation gets its own pair of parentheses.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Const(value) => write!(f, "{}", format_complex_literal(*value)),
            Expr::Constant(c) => write!(f, "{}", c),
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Add(lhs, rhs) => write!(f, "({}+{})", lhs, rhs),
            Expr::Sub(lhs, rhs) => write!(f, "({}-{})", lhs, rhs),
            Expr::Mul(lhs, rhs) => write!(f, "({}*{})", lhs, rhs),
            Expr::Div(lhs, rhs) => write!(f, "({}/{})", lhs, rhs),
            Expr::Pow(base, exp) => write!(f, "({}^{})", base, exp),
            Expr::Func(function, arg) => write!(f, "{}({})", function, arg),
            Expr::Log(value, base) => write!(f, "log({};{})", value, base),
            Expr::Aggregate {
                kind,
                lower,
                upper,
                body,
                var,
            } => write!(f, "{}({};{};{};{})", kind, lower, upper, body, var),
        }
    }
}

impl std::ops::Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::Add(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::Sub(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::Mul(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::Div(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Expr::Sub(Expr::real(0.0).boxed(), self.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_keyword_longest_prefix() {
        assert_eq!(
            Keyword::longest_prefix("sinh(x)"),
            Some((Keyword::Function(Function::Sinh), 4))
        );
        assert_eq!(
            Keyword::longest_prefix("sin(x)"),
            Some((Keyword::Function(Function::Sin), 3))
        );
        assert_eq!(
            Keyword::longest_prefix("exp(x)"),
            Some((Keyword::Function(Function::Exp), 3))
        );
        assert_eq!(
            Keyword::longest_prefix("e*x"),
            Some((Keyword::Constant(Constant::E), 1))
        );
        assert_eq!(
            Keyword::longest_prefix("sign(x)"),
            Some((Keyword::Function(Function::Sign), 4))
        );
        assert_eq!(Keyword::longest_prefix("xyz"), None);
    }

    #[test]
    fn test_strum_names_match_static_names() {
        for f in Function::iter() {
            assert_eq!(f.to_string(), <&'static str>::from(f));
            assert_eq!(Function::from_str(f.as_ref()).unwrap(), f);
        }
        assert_eq!(AggregateKind::Product.to_string(), "prod");
        assert_eq!(AggregateKind::from_str("int").unwrap(), AggregateKind::Integral);
        assert_eq!(Keyword::Log.arity(), 2);
        assert_eq!(Keyword::Aggregate(AggregateKind::Sum).arity(), 4);
    }

    #[test]
    fn test_display_is_fully_bracketed() {
        let expr = Expr::Var('x') * Expr::real(2.0) + Expr::func(Function::Sin, Expr::Var('n'));
        assert_eq!(expr.to_string(), "((x*(2))+sin(n))");
    }

    #[test]
    fn test_format_complex_literal() {
        assert_eq!(format_complex_literal(Complex64::new(0.0, 0.0)), "(0)");
        assert_eq!(format_complex_literal(Complex64::new(2.5, 0.0)), "(2.5)");
        assert_eq!(format_complex_literal(Complex64::new(-2.5, 0.0)), "(0-2.5)");
        assert_eq!(format_complex_literal(Complex64::new(0.0, 3.0)), "(3*i)");
        assert_eq!(format_complex_literal(Complex64::new(0.0, -3.0)), "(0-3*i)");
        assert_eq!(format_complex_literal(Complex64::new(1.0, 2.0)), "(1+2*i)");
        assert_eq!(format_complex_literal(Complex64::new(1.0, -2.0)), "(1-2*i)");
        assert_eq!(format_complex_literal(Complex64::new(-1.0, 2.0)), "(0-1+2*i)");
        assert_eq!(format_complex_literal(Complex64::new(-1.0, -2.0)), "(0-1-2*i)");
    }

    #[test]
    fn test_free_variables_respect_binders() {
        // sum(1; n; k*x; k)
        let expr = Expr::aggregate(
            AggregateKind::Sum,
            Expr::real(1.0),
            Expr::Var('n'),
            Expr::Var('k') * Expr::Var('x'),
            'k',
        );
        assert_eq!(expr.free_variables(), BTreeSet::from(['n', 'x']));
        let closed = Expr::aggregate(
            AggregateKind::Product,
            Expr::real(1.0),
            Expr::real(3.0),
            Expr::Var('k'),
            'k',
        );
        assert!(closed.is_closed());
    }

    #[test]
    fn test_depth() {
        assert_eq!(Expr::Var('x').depth(), 1);
        let expr = (Expr::Var('x') + Expr::real(1.0)) * Expr::real(2.0);
        assert_eq!(expr.depth(), 3);
    }
}
