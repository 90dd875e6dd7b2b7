//! # Series Cache
//!
//! One `SeriesSlot` per input row. A slot remembers the raw string it was compiled from, the
//! compile result and the integral cache built up while evaluating it, so that rows whose text
//! did not change between two rounds are neither recompiled nor lose their cached integrals.
use crate::series::aggregate::IntegralCache;
use crate::series::bracketer::{parse_normalized, validate};
use crate::series::constant_folder::fold;
use crate::series::evaluator::Evaluator;
use crate::series::normalizer::normalize;
use crate::series::series_errors::ParseError;
use crate::series::series_settings::SeriesSettings;
use crate::series::tokenizer::TokenList;
use log::{debug, info, warn};
use num_complex::Complex64;

pub type CompileResult = Result<TokenList, ParseError>;

/// Runs the whole pipeline on one raw expression: normalize, parse, validate, fold, lower.
pub fn compile(raw: &str, cache: &mut IntegralCache, settings: &SeriesSettings) -> CompileResult {
    let normalized = normalize(raw)?;
    let expr = parse_normalized(&normalized, settings.max_depth)?;
    validate(&expr)?;
    let expr = if settings.fold_constants {
        fold(&expr, cache, settings)
    } else {
        expr
    };
    let tokens = TokenList::from_expr(&expr);
    debug!("compiled '{}' into {} tokens: {}", raw, tokens.len(), tokens);
    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSlot {
    pub raw_expression: String,
    pub compile_result: CompileResult,
    pub integral_cache: IntegralCache,
}

impl SeriesSlot {
    pub fn compile(raw: &str, settings: &SeriesSettings) -> Self {
        let mut integral_cache = IntegralCache::new();
        let compile_result = if raw.trim().is_empty() {
            Err(ParseError::EmptyInput)
        } else {
            compile(raw, &mut integral_cache, settings)
        };
        if let Err(e) = &compile_result {
            info!("expression '{}' rejected: {}", raw, e);
        }
        Self {
            raw_expression: raw.to_string(),
            compile_result,
            integral_cache,
        }
    }
}

/// Where to evaluate: a real abscissa asks for a real answer, a complex one for the full value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplePoint {
    Real(f64),
    Complex(Complex64),
}

impl From<f64> for SamplePoint {
    fn from(x: f64) -> Self {
        SamplePoint::Real(x)
    }
}

impl From<Complex64> for SamplePoint {
    fn from(z: Complex64) -> Self {
        SamplePoint::Complex(z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeriesValue {
    /// NaN when the value has a non-negligible imaginary part
    Real(f64),
    Complex(Complex64),
}

impl SeriesValue {
    pub fn re(&self) -> f64 {
        match self {
            SeriesValue::Real(v) => *v,
            SeriesValue::Complex(z) => z.re,
        }
    }

    pub fn is_nan(&self) -> bool {
        match self {
            SeriesValue::Real(v) => v.is_nan(),
            SeriesValue::Complex(z) => z.re.is_nan() || z.im.is_nan(),
        }
    }
}

/// Compiled series of all input rows.
///
/// # Examples
/// ```rust, ignore
/// let mut series = SeriesCache::new();
/// series.recompile(&["x^2", "sum(1;n;k;k)"]);
/// assert_eq!(series.value_at(1, 0.0, 4), Some(SeriesValue::Real(10.0)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SeriesCache {
    slots: Vec<SeriesSlot>,
    settings: SeriesSettings,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: SeriesSettings) -> Self {
        Self {
            slots: Vec::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &SeriesSettings {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: usize) -> Option<&SeriesSlot> {
        self.slots.get(index)
    }

    /// Replaces the slots by one per raw expression. A raw string identical to one of the
    /// previous round keeps its compile result and integral cache; everything else is compiled
    /// afresh.
    pub fn recompile<S: AsRef<str>>(&mut self, raw_expressions: &[S]) -> Vec<&CompileResult> {
        let previous = std::mem::take(&mut self.slots);
        let mut reused = 0;
        self.slots = raw_expressions
            .iter()
            .map(|raw| {
                let raw = raw.as_ref();
                match previous.iter().find(|slot| slot.raw_expression == raw) {
                    Some(slot) => {
                        reused += 1;
                        slot.clone()
                    }
                    None => SeriesSlot::compile(raw, &self.settings),
                }
            })
            .collect();
        debug!(
            "recompiled {} series, {} carried over",
            self.slots.len(),
            reused
        );
        self.slots.iter().map(|slot| &slot.compile_result).collect()
    }

    /// Value of series `index` at `(x, n)`. `None` if the slot is missing, did not compile, or
    /// its evaluation ran into a resource limit.
    pub fn value_at(
        &mut self,
        index: usize,
        x: impl Into<SamplePoint>,
        n: i64,
    ) -> Option<SeriesValue> {
        let settings = &self.settings;
        let slot = self.slots.get_mut(index)?;
        let tokens = slot.compile_result.as_ref().ok()?;
        let point = x.into();
        let x_value = match point {
            SamplePoint::Real(x) => Complex64::new(x, 0.0),
            SamplePoint::Complex(z) => z,
        };
        let n_value = Complex64::new(n as f64, 0.0);
        let value = match Evaluator::new(tokens, &mut slot.integral_cache, settings)
            .evaluate(x_value, n_value)
        {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    "series {} ('{}') failed at x = {}, n = {}: {}",
                    index, slot.raw_expression, x_value, n, e
                );
                return None;
            }
        };
        Some(match point {
            SamplePoint::Real(_) => {
                if value.im.abs() < settings.real_tolerance {
                    SeriesValue::Real(value.re)
                } else {
                    SeriesValue::Real(f64::NAN)
                }
            }
            SamplePoint::Complex(_) => SeriesValue::Complex(value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_compile() {
        let mut cache = IntegralCache::new();
        let settings = SeriesSettings::default();
        let tokens = compile("2*3 + x", &mut cache, &settings).unwrap();
        assert_eq!(tokens.to_string(), "+ (6,0) x");
        let unfolded = SeriesSettings {
            fold_constants: false,
            ..SeriesSettings::default()
        };
        let tokens = compile("2*3 + x", &mut cache, &unfolded).unwrap();
        assert_eq!(tokens.to_string(), "+ * (2,0) (3,0) x");
        assert_eq!(
            compile("3++2", &mut cache, &settings),
            Err(ParseError::ConsecutiveOperators(2))
        );
    }

    #[test]
    fn test_recompile_results() {
        let mut series = SeriesCache::new();
        let results = series.recompile(&["x^2", "", "int(0;1;x;x)"]);
        assert!(results[0].is_ok());
        assert_eq!(results[1], &Err(ParseError::EmptyInput));
        assert_eq!(results[2], &Err(ParseError::CaptureConflict('x')));
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_recompile_carries_over_integral_cache() {
        let mut series = SeriesCache::new();
        series.recompile(&["int(0;x;t;t)"]);
        series.value_at(0, 2.0, 0).unwrap();
        assert_eq!(series.slot(0).unwrap().integral_cache.len(), 1);
        // same text moved to another row keeps its cache
        series.recompile(&["x", "int(0;x;t;t)"]);
        assert_eq!(series.slot(1).unwrap().integral_cache.len(), 1);
        // edited text starts over
        series.recompile(&["x", "int(0;x;t;t) "]);
        assert_eq!(series.slot(1).unwrap().integral_cache.len(), 0);
    }

    #[test]
    fn test_value_at() {
        let mut series = SeriesCache::new();
        series.recompile(&["x^2", "sqrt(x)", "sum(1;n;k;k)", "1+"]);
        assert_abs_diff_eq!(series.value_at(0, 3.0, 0).unwrap().re(), 9.0, epsilon = 1e-12);
        // non-negligible imaginary part on a real request
        assert!(series.value_at(1, -4.0, 0).unwrap().is_nan());
        match series.value_at(1, Complex64::new(-4.0, 0.0), 0) {
            Some(SeriesValue::Complex(z)) => {
                assert_abs_diff_eq!(z.re, 0.0, epsilon = 1e-12);
                assert_abs_diff_eq!(z.im, 2.0, epsilon = 1e-12);
            }
            other => panic!("unexpected value {:?}", other),
        }
        assert_eq!(series.value_at(2, 0.0, 4), Some(SeriesValue::Real(10.0)));
        // failed compilation and missing slots
        assert_eq!(series.value_at(3, 1.0, 0), None);
        assert_eq!(series.value_at(9, 1.0, 0), None);
    }

    #[test]
    fn test_too_deep_expression_is_rejected() {
        let settings = SeriesSettings {
            max_depth: 8,
            ..SeriesSettings::default()
        };
        let mut series = SeriesCache::with_settings(settings);
        let deep = format!("{}x{}", "sin(".repeat(10), ")".repeat(10));
        let results = series.recompile(&[deep.as_str(), "sin(sin(x))"]);
        assert_eq!(results[0], &Err(ParseError::NestingTooDeep(8)));
        assert!(results[1].is_ok());
        assert_eq!(series.value_at(0, 1.0, 0), None);
        assert!(series.value_at(1, 1.0, 0).is_some());
    }
}
