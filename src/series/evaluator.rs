//! # Evaluator
//!
//! Walks an immutable prefix `TokenList` for concrete values of `x` and `n`. Index variables of
//! sums, products and integrals are bound in a small environment instead of substituting them
//! into a copy of the list. Every operator returns the value of its span together with the
//! position right after it, so an operand is evaluated exactly where it sits.
//!
//! Integrals consult the slot's `IntegralCache`, which is why evaluation needs it mutably.
use crate::series::aggregate::{
    IntegralCache, IntegralCacheEntry, IntegralPlan, as_real, product, riemann_sum, sum,
};
use crate::series::complex_functions::{self as cf, NAN_SENTINEL};
use crate::series::series_errors::EvalError;
use crate::series::series_settings::SeriesSettings;
use crate::series::tokenizer::{Operator, Token, TokenList, span_end};
use itertools::Itertools;
use log::warn;
use num_complex::Complex64;

pub struct Evaluator<'a> {
    tokens: &'a [Token],
    /// bound variables, innermost last
    env: Vec<(char, Complex64)>,
    cache: &'a mut IntegralCache,
    settings: &'a SeriesSettings,
    depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        tokens: &'a TokenList,
        cache: &'a mut IntegralCache,
        settings: &'a SeriesSettings,
    ) -> Self {
        Self::from_slice(tokens.as_slice(), cache, settings)
    }

    pub fn from_slice(
        tokens: &'a [Token],
        cache: &'a mut IntegralCache,
        settings: &'a SeriesSettings,
    ) -> Self {
        Self {
            tokens,
            env: Vec::new(),
            cache,
            settings,
            depth: 0,
        }
    }

    /// Value of the whole list at `(x, n)`. Domain problems come back as the NaN sentinel;
    /// `Err` is reserved for a malformed list or runaway recursion.
    pub fn evaluate(&mut self, x: Complex64, n: Complex64) -> Result<Complex64, EvalError> {
        if self.tokens.is_empty() {
            return Err(EvalError::MalformedTokenList("empty token list".to_string()));
        }
        self.env.clear();
        self.env.push(('x', x));
        self.env.push(('n', n));
        let (value, end) = self.eval_at(0)?;
        if end != self.tokens.len() {
            return Err(EvalError::MalformedTokenList(format!(
                "{} trailing tokens",
                self.tokens.len() - end
            )));
        }
        Ok(value)
    }

    fn lookup(&self, name: char) -> Result<Complex64, EvalError> {
        self.env
            .iter()
            .rev()
            .find(|(bound, _)| *bound == name)
            .map(|(_, value)| *value)
            .ok_or_else(|| EvalError::MalformedTokenList(format!("unbound variable {}", name)))
    }

    fn token(&self, pos: usize) -> Result<Token, EvalError> {
        self.tokens
            .get(pos)
            .copied()
            .ok_or_else(|| EvalError::MalformedTokenList("list ends inside an operand".to_string()))
    }

    fn eval_at(&mut self, pos: usize) -> Result<(Complex64, usize), EvalError> {
        self.depth += 1;
        if self.depth > self.settings.max_depth {
            self.depth -= 1;
            return Err(EvalError::DepthExceeded(self.settings.max_depth));
        }
        let result = self.eval_token(pos);
        self.depth -= 1;
        result
    }

    fn eval_token(&mut self, pos: usize) -> Result<(Complex64, usize), EvalError> {
        match self.token(pos)? {
            Token::Literal(value) => Ok((value, pos + 1)),
            Token::Variable(name) => Ok((self.lookup(name)?, pos + 1)),
            Token::Binder(name) => Err(EvalError::MalformedTokenList(format!(
                "binder {} outside an aggregate",
                name
            ))),
            Token::Operator(op) => self.eval_operator(op, pos + 1),
        }
    }

    fn eval_operator(&mut self, op: Operator, start: usize) -> Result<(Complex64, usize), EvalError> {
        match op {
            Operator::Function(function) => {
                let (arg, end) = self.eval_at(start)?;
                Ok((cf::apply(function, arg), end))
            }
            Operator::Add
            | Operator::Sub
            | Operator::Mul
            | Operator::Div
            | Operator::Pow
            | Operator::Log => {
                let (lhs, middle) = self.eval_at(start)?;
                let (rhs, end) = self.eval_at(middle)?;
                let value = match op {
                    Operator::Add => lhs + rhs,
                    Operator::Sub => lhs - rhs,
                    Operator::Mul => lhs * rhs,
                    Operator::Div => cf::div(lhs, rhs),
                    Operator::Pow => cf::pow(lhs, rhs),
                    _ => cf::log(lhs, rhs),
                };
                Ok((value, end))
            }
            Operator::Sum | Operator::Product | Operator::Integral => {
                self.eval_aggregate(op, start)
            }
        }
    }

    /// Value of the body span starting at `body` with `name` bound to `value`.
    fn eval_bound(
        &mut self,
        body: usize,
        name: char,
        value: Complex64,
    ) -> Result<Complex64, EvalError> {
        self.env.push((name, value));
        let result = self.eval_at(body);
        self.env.pop();
        Ok(result?.0)
    }

    fn eval_aggregate(
        &mut self,
        op: Operator,
        start: usize,
    ) -> Result<(Complex64, usize), EvalError> {
        let (lower, after_lower) = self.eval_at(start)?;
        let (upper, body) = self.eval_at(after_lower)?;
        let body_end = span_end(self.tokens, body)
            .ok_or_else(|| EvalError::MalformedTokenList("aggregate body is cut off".to_string()))?;
        let name = match self.token(body_end)? {
            Token::Binder(name) => name,
            other => {
                return Err(EvalError::MalformedTokenList(format!(
                    "expected a binder, found {}",
                    other
                )));
            }
        };
        let value = match op {
            Operator::Sum => sum(lower, upper, |k| {
                self.eval_bound(body, name, Complex64::new(k as f64, 0.0))
            })?,
            Operator::Product => product(lower, upper, |k| {
                self.eval_bound(body, name, Complex64::new(k as f64, 0.0))
            })?,
            _ => self.integral(lower, upper, body, body_end, name)?,
        };
        Ok((value, body_end + 1))
    }

    fn integral(
        &mut self,
        lower: Complex64,
        upper: Complex64,
        body: usize,
        body_end: usize,
        name: char,
    ) -> Result<Complex64, EvalError> {
        let (Some(lower), Some(upper)) = (as_real(lower), as_real(upper)) else {
            return Ok(NAN_SENTINEL);
        };
        if lower == upper {
            return Ok(Complex64::new(0.0, 0.0));
        }
        if lower > upper {
            return Ok(-self.cached_integral(upper, lower, body, body_end, name)?);
        }
        self.cached_integral(lower, upper, body, body_end, name)
    }

    /// Current values of the variables `body` reads from outside, i.e. everything but its own
    /// index and the indices of aggregates nested in it (those are not bound yet).
    fn free_bindings(&self, body: &[Token], index: char) -> Vec<(char, Complex64)> {
        body.iter()
            .filter_map(|token| match token {
                Token::Variable(name) if *name != index => Some(*name),
                _ => None,
            })
            .unique()
            .sorted()
            .filter_map(|name| self.lookup(name).ok().map(|value| (name, value)))
            .collect()
    }

    fn cached_integral(
        &mut self,
        lower: f64,
        upper: f64,
        body: usize,
        body_end: usize,
        name: char,
    ) -> Result<Complex64, EvalError> {
        let tokens: &'a [Token] = self.tokens;
        let body_tokens = &tokens[body..body_end];
        let bindings = self.free_bindings(body_tokens, name);
        let plan = self
            .cache
            .plan(body_tokens, name, &bindings, lower, upper, self.settings);
        let mut integrate = |from: f64, to: f64, steps: usize| {
            riemann_sum(from, to, steps, |t| {
                self.eval_bound(body, name, Complex64::new(t, 0.0))
            })
        };
        let (value, store) = match plan {
            IntegralPlan::Cached(value) => return Ok(value),
            IntegralPlan::Cold { steps } => (integrate(lower, upper, steps)?, true),
            IntegralPlan::Extend {
                base,
                lower_segment,
                upper_segment,
                store,
            } => {
                let head = integrate(lower_segment.from, lower_segment.to, lower_segment.steps)?;
                let tail = integrate(upper_segment.from, upper_segment.to, upper_segment.steps)?;
                (base + head + tail, store)
            }
        };
        if store {
            self.cache.store(IntegralCacheEntry {
                lower_bound: lower,
                upper_bound: upper,
                body_tokens: TokenList::from(body_tokens.to_vec()),
                variable: name,
                bindings,
                value,
            });
        }
        Ok(value)
    }
}

/// Evaluates a token list with a throwaway integral cache and default settings. Any failure
/// comes back as the NaN sentinel.
pub fn evaluate(tokens: &TokenList, x: Complex64, n: Complex64) -> Complex64 {
    let mut cache = IntegralCache::new();
    let settings = SeriesSettings::default();
    match Evaluator::new(tokens, &mut cache, &settings).evaluate(x, n) {
        Ok(value) => value,
        Err(e) => {
            warn!("evaluation of {} failed: {}", tokens, e);
            NAN_SENTINEL
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::bracketer::parse_normalized;
    use crate::series::complex_functions::is_nan;
    use crate::series::normalizer::normalize;
    use approx::assert_abs_diff_eq;

    fn tokens(raw: &str) -> TokenList {
        let expr = parse_normalized(&normalize(raw).unwrap(), 512).unwrap();
        TokenList::from_expr(&expr)
    }

    fn real(v: f64) -> Complex64 {
        Complex64::new(v, 0.0)
    }

    fn at(raw: &str, x: f64, n: f64) -> Complex64 {
        evaluate(&tokens(raw), real(x), real(n))
    }

    #[test]
    fn test_arithmetic() {
        assert_abs_diff_eq!(at("x^2", 3.0, 0.0).re, 9.0, epsilon = 1e-12);
        assert_abs_diff_eq!(at("2x+3n", 1.5, 2.0).re, 9.0, epsilon = 1e-12);
        assert_abs_diff_eq!(at("-x^2", 3.0, 0.0).re, -9.0, epsilon = 1e-12);
        assert_abs_diff_eq!(at("2^3^2", 0.0, 0.0).re, 512.0, epsilon = 1e-9);
        assert_abs_diff_eq!(at("(x*n)/n", 4.25, 7.0).re, 4.25, epsilon = 1e-12);
        assert!(is_nan(at("1/(x-1)", 1.0, 0.0)));
    }

    #[test]
    fn test_functions() {
        assert_abs_diff_eq!(at("sin(x)", 0.0, 0.0).re, 0.0, epsilon = 1e-12);
        let value = at("sin(x)", std::f64::consts::PI, 0.0);
        assert_abs_diff_eq!(value.re, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(value.im, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(at("log(x;2)", 8.0, 0.0).re, 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(at("|x|", -2.5, 0.0).re, 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(at("sin(90°)", 0.0, 0.0).re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(at("50%x", 4.0, 0.0).re, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_complex_values() {
        let value = at("sqrt(x)", -4.0, 0.0);
        assert_abs_diff_eq!(value.re, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(value.im, 2.0, epsilon = 1e-12);
        let value = at("e^(i*pi)", 0.0, 0.0);
        assert_abs_diff_eq!(value.re, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(value.im, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sums_and_products() {
        assert_abs_diff_eq!(at("sum(1;n;k;k)", 0.0, 10.0).re, 55.0, epsilon = 1e-12);
        assert_abs_diff_eq!(at("prod(1;n;k;k)", 0.0, 5.0).re, 120.0, epsilon = 1e-12);
        assert_abs_diff_eq!(at("sum(5;3;k;k)", 0.0, 0.0).re, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(at("prod(5;3;k;k)", 0.0, 0.0).re, 1.0, epsilon = 1e-12);
        // i bound as an index variable
        assert_abs_diff_eq!(at("sum(1;n;x;i)", 2.0, 5.0).re, 10.0, epsilon = 1e-12);
        // nested, the inner bound uses the outer index
        assert_abs_diff_eq!(
            at("sum(1;3;prod(1;k;j;j);k)", 0.0, 0.0).re,
            9.0,
            epsilon = 1e-12
        );
        assert!(is_nan(at("sum(1;x;k;k)", 2.5, 0.0)));
    }

    #[test]
    fn test_integrals() {
        let value = at("int(0;x;t^2;t)", 3.0, 0.0);
        assert_abs_diff_eq!(value.re, 9.0, epsilon = 0.02);
        let swapped = at("int(x;0;t^2;t)", 3.0, 0.0);
        assert_abs_diff_eq!(swapped.re, -value.re, epsilon = 1e-9);
        assert_abs_diff_eq!(at("int(1;1;t;t)", 0.0, 0.0).re, 0.0, epsilon = 1e-12);
        assert!(is_nan(at("int(0;i;t;t)", 0.0, 0.0)));
    }

    #[test]
    fn test_integral_cache_is_used() {
        let list = tokens("int(0;x;t;t)");
        let settings = SeriesSettings::default();
        let mut cache = IntegralCache::new();
        let cold = Evaluator::new(&list, &mut cache, &settings)
            .evaluate(real(2.0), real(0.0))
            .unwrap();
        assert_eq!(cache.len(), 1);
        // close enough: the cached value comes back unchanged
        let reused = Evaluator::new(&list, &mut cache, &settings)
            .evaluate(real(2.1), real(0.0))
            .unwrap();
        assert_eq!(reused, cold);
        // far away: extended and stored
        let extended = Evaluator::new(&list, &mut cache, &settings)
            .evaluate(real(6.0), real(0.0))
            .unwrap();
        assert_abs_diff_eq!(extended.re, 18.0, epsilon = 0.1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_depth_limit() {
        let list = tokens("sin(sin(sin(sin(x))))");
        let settings = SeriesSettings {
            max_depth: 3,
            ..SeriesSettings::default()
        };
        let mut cache = IntegralCache::new();
        assert_eq!(
            Evaluator::new(&list, &mut cache, &settings).evaluate(real(1.0), real(0.0)),
            Err(EvalError::DepthExceeded(3))
        );
    }

    #[test]
    fn test_malformed_lists() {
        let truncated = TokenList::from(vec![Token::Operator(Operator::Add), Token::Literal(real(1.0))]);
        assert!(is_nan(evaluate(&truncated, real(0.0), real(0.0))));
        let trailing = TokenList::from(vec![Token::Literal(real(1.0)), Token::Literal(real(2.0))]);
        let settings = SeriesSettings::default();
        let mut cache = IntegralCache::new();
        assert!(matches!(
            Evaluator::new(&trailing, &mut cache, &settings).evaluate(real(0.0), real(0.0)),
            Err(EvalError::MalformedTokenList(_))
        ));
    }
}
