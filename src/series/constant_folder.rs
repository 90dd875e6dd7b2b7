//! # Constant Folder
//!
//! Pre-evaluates every subtree that does not depend on `x`, `n` or an index variable bound
//! outside of it, so that per-point evaluation only does the work that actually varies.
//! Folding is top-down: once a subtree is replaced by a literal, nothing inside it is visited.
use crate::series::aggregate::IntegralCache;
use crate::series::bracketer::parse_normalized;
use crate::series::evaluator::Evaluator;
use crate::series::series_engine::Expr;
use crate::series::series_errors::ParseError;
use crate::series::series_settings::SeriesSettings;
use crate::series::tokenizer::TokenList;
use log::trace;
use num_complex::Complex64;

fn fold_children(expr: &Expr, cache: &mut IntegralCache, settings: &SeriesSettings) -> Expr {
    let mut f = |child: &Box<Expr>| fold(child, cache, settings).boxed();
    match expr {
        Expr::Const(_) | Expr::Constant(_) | Expr::Var(_) => expr.clone(),
        Expr::Add(lhs, rhs) => Expr::Add(f(lhs), f(rhs)),
        Expr::Sub(lhs, rhs) => Expr::Sub(f(lhs), f(rhs)),
        Expr::Mul(lhs, rhs) => Expr::Mul(f(lhs), f(rhs)),
        Expr::Div(lhs, rhs) => Expr::Div(f(lhs), f(rhs)),
        Expr::Pow(lhs, rhs) => Expr::Pow(f(lhs), f(rhs)),
        Expr::Log(value, base) => Expr::Log(f(value), f(base)),
        Expr::Func(function, arg) => Expr::Func(*function, f(arg)),
        Expr::Aggregate {
            kind,
            lower,
            upper,
            body,
            var,
        } => Expr::Aggregate {
            kind: *kind,
            lower: f(lower),
            upper: f(upper),
            body: f(body),
            var: *var,
        },
    }
}

/// Replaces variable-free subtrees by their value. Subtrees whose value is not finite are kept
/// as they are.
pub fn fold(expr: &Expr, cache: &mut IntegralCache, settings: &SeriesSettings) -> Expr {
    if !matches!(expr, Expr::Const(_)) && expr.is_closed() {
        let tokens = TokenList::from_expr(expr);
        let one = Complex64::new(1.0, 0.0);
        match Evaluator::new(&tokens, cache, settings).evaluate(one, one) {
            Ok(value) if value.re.is_finite() && value.im.is_finite() => {
                trace!("folded {} into {}", expr, value);
                return Expr::Const(value);
            }
            _ => {}
        }
    }
    fold_children(expr, cache, settings)
}

/// String form of `fold`: parses a bracketed expression, folds it and renders it bracketed again.
///
/// # Examples
/// ```rust, ignore
/// let mut cache = IntegralCache::new();
/// let folded = fold_expression("((2)*(3))+x", &mut cache, &SeriesSettings::default()).unwrap();
/// assert_eq!(folded, "((6)+x)");
/// ```
pub fn fold_expression(
    s: &str,
    cache: &mut IntegralCache,
    settings: &SeriesSettings,
) -> Result<String, ParseError> {
    let expr = parse_normalized(s, settings.max_depth)?;
    Ok(fold(&expr, cache, settings).to_string())
}
