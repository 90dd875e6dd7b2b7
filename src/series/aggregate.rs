//! # Aggregate Engine
//!
//! Discrete sums and products over an integer index, the left-endpoint Riemann sum used for
//! integrals, and the per-slot `IntegralCache` which reuses previously computed integrals of the
//! same body when the bounds move a little between frames.
//!
//! The summands are supplied as closures so that the evaluator can bind the index variable in
//! its own environment and propagate resource errors through `?`.
use crate::series::complex_functions::{NAN_SENTINEL, is_nan};
use crate::series::series_errors::EvalError;
use crate::series::series_settings::SeriesSettings;
use crate::series::tokenizer::{Token, TokenList};
use log::{debug, trace};
use num_complex::Complex64;
use num_traits::{One, Zero};

/// The value as an integer if it is a finite real whole number.
pub fn as_integer(z: Complex64) -> Option<i64> {
    if z.im != 0.0 || !z.re.is_finite() || z.re.fract() != 0.0 {
        return None;
    }
    if z.re < i64::MIN as f64 || z.re > i64::MAX as f64 {
        return None;
    }
    Some(z.re as i64)
}

/// The value as a real number if the imaginary part is exactly zero and the real part finite.
pub fn as_real(z: Complex64) -> Option<f64> {
    if z.im == 0.0 && z.re.is_finite() {
        Some(z.re)
    } else {
        None
    }
}

/// Index range of a sum or product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndexRange {
    /// complex or non-finite bounds, or whole-number bounds missing on a non-empty range
    Invalid,
    /// `lower > upper`
    Empty,
    Inclusive(i64, i64),
}

/// Complex bounds are rejected first, then an empty range is recognised, and only a non-empty
/// range needs whole-number bounds.
pub fn index_range(lower: Complex64, upper: Complex64) -> IndexRange {
    let (Some(lower_re), Some(upper_re)) = (as_real(lower), as_real(upper)) else {
        return IndexRange::Invalid;
    };
    if lower_re > upper_re {
        return IndexRange::Empty;
    }
    match (as_integer(lower), as_integer(upper)) {
        (Some(lower), Some(upper)) => IndexRange::Inclusive(lower, upper),
        _ => IndexRange::Invalid,
    }
}

/// Inclusive sum of `f(k)` for `k` in `lower..=upper`; an empty range gives zero.
pub fn sum<F>(lower: Complex64, upper: Complex64, mut f: F) -> Result<Complex64, EvalError>
where
    F: FnMut(i64) -> Result<Complex64, EvalError>,
{
    let mut total = Complex64::zero();
    match index_range(lower, upper) {
        IndexRange::Invalid => return Ok(NAN_SENTINEL),
        IndexRange::Empty => {}
        IndexRange::Inclusive(lower, upper) => {
            for k in lower..=upper {
                total += f(k)?;
            }
        }
    }
    Ok(total)
}

/// Inclusive product of `f(k)`; an empty range gives one.
pub fn product<F>(lower: Complex64, upper: Complex64, mut f: F) -> Result<Complex64, EvalError>
where
    F: FnMut(i64) -> Result<Complex64, EvalError>,
{
    let mut total = Complex64::one();
    match index_range(lower, upper) {
        IndexRange::Invalid => return Ok(NAN_SENTINEL),
        IndexRange::Empty => {}
        IndexRange::Inclusive(lower, upper) => {
            for k in lower..=upper {
                total *= f(k)?;
            }
        }
    }
    Ok(total)
}

/// Left-endpoint Riemann sum with `steps` samples. A NaN sample contributes nothing; swapped
/// bounds negate the result.
pub fn riemann_sum<F>(lower: f64, upper: f64, steps: usize, mut f: F) -> Result<Complex64, EvalError>
where
    F: FnMut(f64) -> Result<Complex64, EvalError>,
{
    if lower == upper {
        return Ok(Complex64::zero());
    }
    if lower > upper {
        return Ok(-riemann_sum(upper, lower, steps, f)?);
    }
    let steps = steps.max(1);
    let step_size = (upper - lower) / steps as f64;
    let mut total = Complex64::zero();
    for k in 0..steps {
        let sample = f(lower + k as f64 * step_size)?;
        if !is_nan(sample) {
            total += sample * step_size;
        }
    }
    Ok(total)
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegralCacheEntry {
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub body_tokens: TokenList,
    pub variable: char,
    /// values of `x`, `n` and outer index variables read by the body, sorted by name
    pub bindings: Vec<(char, Complex64)>,
    pub value: Complex64,
}

impl IntegralCacheEntry {
    pub fn width(&self) -> f64 {
        self.upper_bound - self.lower_bound
    }
}

/// Piece of an interval still to be integrated numerically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: f64,
    pub to: f64,
    pub steps: usize,
}

/// What the evaluator has to do to answer one integral request.
#[derive(Debug, Clone, PartialEq)]
pub enum IntegralPlan {
    /// nothing reusable: integrate the whole interval and store the result
    Cold { steps: usize },
    /// close enough to a cached interval: reuse its value as is
    Cached(Complex64),
    /// integrate the two boundary deltas and add them to a cached value
    Extend {
        base: Complex64,
        lower_segment: Segment,
        upper_segment: Segment,
        store: bool,
    },
}

/// Append-only store of integrals computed for one series slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegralCache {
    entries: Vec<IntegralCacheEntry>,
}

impl IntegralCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IntegralCacheEntry] {
        &self.entries
    }

    pub fn store(&mut self, entry: IntegralCacheEntry) {
        trace!(
            "caching integral over [{}, {}] = {}",
            entry.lower_bound, entry.upper_bound, entry.value
        );
        self.entries.push(entry);
    }

    /// Decides how to integrate `body` over `[lower, upper]` (`lower < upper`) given what is
    /// cached. Only entries of the same body, integration variable and free-variable values
    /// qualify.
    pub fn plan(
        &self,
        body: &[Token],
        variable: char,
        bindings: &[(char, Complex64)],
        lower: f64,
        upper: f64,
        settings: &SeriesSettings,
    ) -> IntegralPlan {
        let best = self
            .entries
            .iter()
            .filter(|entry| {
                entry.variable == variable
                    && entry.bindings.as_slice() == bindings
                    && entry.body_tokens.as_slice() == body
            })
            .map(|entry| {
                let lower_delta = (lower - entry.lower_bound).abs();
                let upper_delta = (upper - entry.upper_bound).abs();
                (entry, lower_delta, upper_delta, lower_delta + upper_delta)
            })
            .min_by(|a, b| a.3.total_cmp(&b.3));
        let Some((entry, lower_delta, upper_delta, distance)) = best else {
            return IntegralPlan::Cold {
                steps: settings.integral_steps,
            };
        };
        let width = entry.width();
        if distance < width {
            return IntegralPlan::Cached(entry.value);
        }
        let steps_for = |delta: f64| -> usize {
            let steps = (settings.integral_steps as f64 * delta / (width * distance)).ceil();
            if steps.is_finite() {
                (steps as usize).clamp(1, settings.max_delta_steps)
            } else {
                settings.max_delta_steps
            }
        };
        let plan = IntegralPlan::Extend {
            base: entry.value,
            lower_segment: Segment {
                from: lower,
                to: entry.lower_bound,
                steps: steps_for(lower_delta),
            },
            upper_segment: Segment {
                from: entry.upper_bound,
                to: upper,
                steps: steps_for(upper_delta),
            },
            store: distance > width,
        };
        debug!(
            "extending cached integral over [{}, {}] to [{}, {}]",
            entry.lower_bound, entry.upper_bound, lower, upper
        );
        plan
    }
}
