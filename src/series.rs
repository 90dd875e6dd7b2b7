#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// # Series engine
/// core expression types: the keyword alphabet (functions, `log`, `sum`/`prod`/`int`, `pi`/`e`)
/// and the `Expr` syntax tree with its fully bracketed rendering
///# Example
/// ```
/// use RustedSeries::series::series_engine::{Expr, Function};
/// let expr = Expr::Var('x') * Expr::real(2.0) + Expr::func(Function::Sin, Expr::Var('n'));
/// assert_eq!(expr.to_string(), "((x*(2))+sin(n))");
/// ```
/// ________________________________________________________________________________________________________________________________
pub mod series_engine;
/// error types of compilation, evaluation and settings
pub mod series_errors;
/// bracket helpers shared by the normalizer and the bracketer
pub mod utils;
/// ____________________________________________________________________________________________________________________________
/// # Normalizer
/// rewrites a raw user expression into canonical infix form: aliases, `|a|`, implicit
/// multiplication, unary signs, degrees and percents
///# Example
/// ```
/// use RustedSeries::series::normalizer::normalize;
/// assert_eq!(normalize("2x + |n|").unwrap(), "2*x+abs(n)");
/// assert_eq!(normalize("-sin30°").unwrap(), "0-sin(30*pi/180)");
/// ```
pub mod normalizer;
/// ____________________________________________________________________________________________________________________________
/// # Bracketer
/// precedence parser producing an `Expr`, fully bracketed rendering and scope validation
///# Example
/// ```
/// use RustedSeries::series::bracketer::bracket;
/// assert_eq!(bracket("1+2*x^2").unwrap(), "((1)+((2)*(x^(2))))");
/// ```
pub mod bracketer;
/// pre-evaluation of variable-free subtrees
pub mod constant_folder;
/// prefix token lists
pub mod tokenizer;
/// ____________________________________________________________________________________________________________________________
/// # Evaluator
/// walks a token list for concrete `x` and `n` over the complex numbers
///# Example
/// ```
/// use RustedSeries::series::evaluator::evaluate;
/// use RustedSeries::series::tokenizer::tokenize;
/// use num_complex::Complex64;
/// let tokens = tokenize("sum((1);n;(k*x);k)").unwrap();
/// let value = evaluate(&tokens, Complex64::new(2.0, 0.0), Complex64::new(4.0, 0.0));
/// assert_eq!(value, Complex64::new(20.0, 0.0));
/// ```
pub mod evaluator;
/// complex arithmetic and elementary functions
pub mod complex_functions;
/// sums, products, Riemann integrals and the integral cache
pub mod aggregate;
/// ____________________________________________________________________________________________________________________________
/// # Series cache
/// per-row compiled expressions keyed by their raw text
///# Example
/// ```
/// use RustedSeries::series::series_cache::{SeriesCache, SeriesValue};
/// let mut series = SeriesCache::new();
/// let results = series.recompile(&["sum(1;n;k;k)", "3++2"]);
/// assert!(results[0].is_ok());
/// assert!(results[1].is_err());
/// assert_eq!(series.value_at(0, 0.0, 4), Some(SeriesValue::Real(10.0)));
/// assert_eq!(series.value_at(1, 0.0, 4), None);
/// ```
pub mod series_cache;
/// compile and evaluation settings
pub mod series_settings;
