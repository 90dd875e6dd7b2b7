//! # Bracketer
//!
//! Recursive-descent parser over the lexemes of a normalized expression. It builds the `Expr`
//! tree with the usual precedence (`+ -` < `* /` < `^`, the latter right associative), checks
//! argument counts of calls and resolves every letter against the index variables currently in
//! scope. `bracket` renders the result fully parenthesised.
use crate::series::normalizer::{Lexeme, lex, render};
use crate::series::series_engine::{AggregateKind, Expr, Keyword};
use crate::series::series_errors::ParseError;
use crate::series::series_settings::DEFAULT_MAX_DEPTH;
use crate::series::utils::find_pair_to_this_bracket;
use log::trace;
use num_complex::Complex64;

pub struct Parser<'a> {
    lexemes: &'a [Lexeme],
    pos: usize,
    /// index variables bound by the enclosing aggregates, innermost last
    scope: Vec<char>,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(lexemes: &'a [Lexeme], max_depth: usize) -> Self {
        Self {
            lexemes,
            pos: 0,
            scope: Vec::new(),
            depth: 0,
            max_depth,
        }
    }

    pub fn parse(mut self) -> Result<Expr, ParseError> {
        if self.lexemes.is_empty() {
            return Err(ParseError::EmptyInput);
        }
        let expr = self.parse_sum()?;
        if let Some(rest) = self.peek() {
            return Err(ParseError::UnexpectedToken(rest.to_string()));
        }
        // chains of sums and products nested in each other add up
        if expr.depth() > self.max_depth {
            return Err(ParseError::NestingTooDeep(self.max_depth));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&'a Lexeme> {
        self.lexemes.get(self.pos)
    }

    fn next(&mut self) -> Result<&'a Lexeme, ParseError> {
        let lexeme = self.lexemes.get(self.pos).ok_or(ParseError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(lexeme)
    }

    fn expect(&mut self, expected: Lexeme) -> Result<(), ParseError> {
        let lexeme = self.next()?;
        if *lexeme == expected {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken(lexeme.to_string()))
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParseError::NestingTooDeep(self.max_depth));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// A left-associative chain of `chain` operators adds as many levels to the tree; it is
    /// rejected while it is still shallow enough to be dropped.
    fn check_chain(&self, chain: usize) -> Result<(), ParseError> {
        if self.depth + chain > self.max_depth {
            return Err(ParseError::NestingTooDeep(self.max_depth));
        }
        Ok(())
    }

    fn parse_sum(&mut self) -> Result<Expr, ParseError> {
        self.enter()?;
        let mut lhs = self.parse_product()?;
        let mut chain = 0;
        while let Some(Lexeme::Operator(op @ ('+' | '-'))) = self.peek() {
            self.pos += 1;
            chain += 1;
            self.check_chain(chain)?;
            let rhs = self.parse_product()?;
            lhs = if *op == '+' { lhs + rhs } else { lhs - rhs };
        }
        self.leave();
        Ok(lhs)
    }

    fn parse_product(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_power()?;
        let mut chain = 0;
        while let Some(Lexeme::Operator(op @ ('*' | '/'))) = self.peek() {
            self.pos += 1;
            chain += 1;
            self.check_chain(chain)?;
            let rhs = self.parse_power()?;
            lhs = if *op == '*' { lhs * rhs } else { lhs / rhs };
        }
        Ok(lhs)
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_atom()?;
        if let Some(Lexeme::Operator('^')) = self.peek() {
            self.pos += 1;
            self.enter()?;
            let exponent = self.parse_power()?;
            self.leave();
            return Ok(base.pow(exponent));
        }
        Ok(base)
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        match self.next()? {
            Lexeme::Number(digits) => parse_number(digits),
            Lexeme::Letter(c) => self.resolve_letter(*c),
            Lexeme::Keyword(Keyword::Constant(constant)) => Ok(Expr::Constant(*constant)),
            Lexeme::Keyword(keyword) => self.parse_call(*keyword),
            Lexeme::Open => {
                let inner = self.parse_sum()?;
                self.expect(Lexeme::Close)?;
                Ok(inner)
            }
            other => Err(ParseError::UnexpectedToken(other.to_string())),
        }
    }

    fn resolve_letter(&self, c: char) -> Result<Expr, ParseError> {
        if self.scope.contains(&c) || c == 'x' || c == 'n' {
            Ok(Expr::Var(c))
        } else if c == 'i' {
            Ok(Expr::Const(Complex64::new(0.0, 1.0)))
        } else {
            Err(ParseError::UnboundVariable(c))
        }
    }

    /// Checks that `keyword` is followed by a bracketed list with the right number of arguments
    /// and returns the positions of its top-level separators.
    fn argument_list(&self, keyword: Keyword) -> Result<Vec<usize>, ParseError> {
        let open = self.pos;
        if self.lexemes.get(open) != Some(&Lexeme::Open) {
            return Err(ParseError::AmbiguousArity(keyword.name().to_string()));
        }
        let close = find_pair_to_this_bracket(
            self.lexemes,
            open,
            |l| *l == Lexeme::Open,
            |l| *l == Lexeme::Close,
        )
        .ok_or(ParseError::UnbalancedBrackets)?;
        let mut depth = 0i64;
        let mut separators = Vec::new();
        for (i, lexeme) in self.lexemes[..close].iter().enumerate().skip(open + 1) {
            match lexeme {
                Lexeme::Open => depth += 1,
                Lexeme::Close => depth -= 1,
                Lexeme::Separator if depth == 0 => separators.push(i),
                _ => {}
            }
        }
        separators.push(close);
        if separators.len() != keyword.arity() {
            return Err(ParseError::ArityMismatch {
                name: keyword.name().to_string(),
                expected: keyword.arity(),
                found: separators.len(),
            });
        }
        Ok(separators)
    }

    fn parse_call(&mut self, keyword: Keyword) -> Result<Expr, ParseError> {
        let boundaries = self.argument_list(keyword)?;
        self.expect(Lexeme::Open)?;
        let expr = match keyword {
            Keyword::Function(function) => {
                let arg = self.parse_sum()?;
                Expr::func(function, arg)
            }
            Keyword::Log => {
                let value = self.parse_sum()?;
                self.expect(Lexeme::Separator)?;
                let base = self.parse_sum()?;
                Expr::Log(value.boxed(), base.boxed())
            }
            Keyword::Aggregate(kind) => self.parse_aggregate(kind, &boundaries)?,
            Keyword::Constant(constant) => Expr::Constant(constant),
        };
        self.expect(Lexeme::Close)?;
        Ok(expr)
    }

    fn parse_aggregate(
        &mut self,
        kind: AggregateKind,
        boundaries: &[usize],
    ) -> Result<Expr, ParseError> {
        let lower = self.parse_sum()?;
        self.expect(Lexeme::Separator)?;
        let upper = self.parse_sum()?;
        self.expect(Lexeme::Separator)?;
        // the binder is known before the body is read
        let binder = &self.lexemes[boundaries[2] + 1..boundaries[3]];
        let var = match binder {
            [Lexeme::Letter(c)] => *c,
            other => return Err(ParseError::InvalidIndexVariable(render(other))),
        };
        if var == 'x' || var == 'n' || self.scope.contains(&var) {
            return Err(ParseError::CaptureConflict(var));
        }
        self.scope.push(var);
        let body = self.parse_sum();
        self.scope.pop();
        let body = body?;
        self.expect(Lexeme::Separator)?;
        self.expect(Lexeme::Letter(var))?;
        Ok(Expr::aggregate(kind, lower, upper, body, var))
    }
}

fn parse_number(digits: &str) -> Result<Expr, ParseError> {
    let value: f64 = digits
        .parse()
        .map_err(|_| ParseError::MalformedNumber(digits.to_string()))?;
    if !value.is_finite() {
        return Err(ParseError::NonFiniteLiteral(digits.to_string()));
    }
    Ok(Expr::real(value))
}

/// Parses a normalized (or already bracketed) expression into an `Expr`.
pub fn parse_normalized(s: &str, max_depth: usize) -> Result<Expr, ParseError> {
    let lexemes = lex(s)?;
    let expr = Parser::new(&lexemes, max_depth).parse()?;
    trace!("parsed '{}' into {:?}", s, expr);
    Ok(expr)
}

/// Fully parenthesised rendering of a normalized expression.
///
/// # Examples
/// ```rust, ignore
/// assert_eq!(bracket("1+2*x^2").unwrap(), "((1)+((2)*(x^(2))))");
/// ```
pub fn bracket(s: &str) -> Result<String, ParseError> {
    Ok(parse_normalized(s, DEFAULT_MAX_DEPTH)?.to_string())
}

/// Confirms that every variable is bound, that no aggregate rebinds a variable in scope and that
/// every literal is finite.
pub fn validate(expr: &Expr) -> Result<(), ParseError> {
    fn walk(expr: &Expr, scope: &mut Vec<char>) -> Result<(), ParseError> {
        match expr {
            Expr::Const(value) => {
                if value.re.is_finite() && value.im.is_finite() {
                    Ok(())
                } else {
                    Err(ParseError::NonFiniteLiteral(value.to_string()))
                }
            }
            Expr::Constant(_) => Ok(()),
            Expr::Var(c) => {
                if *c == 'x' || *c == 'n' || scope.contains(c) {
                    Ok(())
                } else {
                    Err(ParseError::UnboundVariable(*c))
                }
            }
            Expr::Aggregate {
                lower,
                upper,
                body,
                var,
                ..
            } => {
                walk(lower, scope)?;
                walk(upper, scope)?;
                if *var == 'x' || *var == 'n' || scope.contains(var) {
                    return Err(ParseError::CaptureConflict(*var));
                }
                scope.push(*var);
                let result = walk(body, scope);
                scope.pop();
                result
            }
            other => other
                .children()
                .into_iter()
                .try_for_each(|child| walk(child, scope)),
        }
    }
    walk(expr, &mut Vec::new())
}
