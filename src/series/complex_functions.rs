//! Complex arithmetic and elementary functions used by the evaluator.
//!
//! Every function is total: a domain problem (division by a zero modulus, `ln 0`, a base-1
//! logarithm, `0` raised to a power with non-positive real part) returns the NaN sentinel
//! instead of failing.
use crate::series::series_engine::Function;
use num_complex::Complex64;
use std::f64::consts::{FRAC_PI_2, LN_10, PI};

/// Value produced whenever an evaluation leaves the domain of a function.
pub const NAN_SENTINEL: Complex64 = Complex64::new(f64::NAN, f64::NAN);

pub fn is_nan(z: Complex64) -> bool {
    z.re.is_nan() || z.im.is_nan()
}

// sign with sgn(0) = +1
fn sgn_plus(v: f64) -> f64 {
    if v >= 0.0 { 1.0 } else { -1.0 }
}

fn real(v: f64) -> Complex64 {
    Complex64::new(v, 0.0)
}

pub fn div(lhs: Complex64, rhs: Complex64) -> Complex64 {
    let denominator = rhs.norm_sqr();
    if denominator == 0.0 {
        return NAN_SENTINEL;
    }
    Complex64::new(
        (lhs.re * rhs.re + lhs.im * rhs.im) / denominator,
        (lhs.im * rhs.re - lhs.re * rhs.im) / denominator,
    )
}

/// Principal power through the polar form of the base.
pub fn pow(base: Complex64, exponent: Complex64) -> Complex64 {
    if base.re == 0.0 && base.im == 0.0 {
        return if exponent.re == 0.0 && exponent.im == 0.0 {
            real(1.0)
        } else if exponent.re > 0.0 {
            real(0.0)
        } else {
            NAN_SENTINEL
        };
    }
    let log_base = ln(base);
    let (c, d) = (exponent.re, exponent.im);
    let modulus = (c * log_base.re - d * log_base.im).exp();
    let angle = d * log_base.re + c * log_base.im;
    Complex64::new(modulus * angle.cos(), modulus * angle.sin())
}

pub fn exp(z: Complex64) -> Complex64 {
    z.exp()
}

/// Principal logarithm; the argument lies in (-pi, pi] and the negative real axis maps to pi.
pub fn ln(z: Complex64) -> Complex64 {
    let modulus = z.norm();
    if modulus == 0.0 {
        return NAN_SENTINEL;
    }
    let argument = if z.im == 0.0 && z.re < 0.0 {
        PI
    } else {
        2.0 * (z.im / (z.re + modulus)).atan()
    };
    Complex64::new(modulus.ln(), argument)
}

pub fn lg(z: Complex64) -> Complex64 {
    let value = ln(z);
    Complex64::new(value.re / LN_10, value.im / LN_10)
}

/// `log(value; base) = ln(value) / ln(base)`
pub fn log(value: Complex64, base: Complex64) -> Complex64 {
    if base.re == 1.0 && base.im == 0.0 {
        return NAN_SENTINEL;
    }
    div(ln(value), ln(base))
}

pub fn sqrt(z: Complex64) -> Complex64 {
    let modulus = z.norm();
    let sign = if z.im < 0.0 { -1.0 } else { 1.0 };
    Complex64::new(
        ((modulus + z.re) / 2.0).sqrt(),
        sign * ((modulus - z.re) / 2.0).sqrt(),
    )
}

pub fn sin(z: Complex64) -> Complex64 {
    z.sin()
}

pub fn cos(z: Complex64) -> Complex64 {
    z.cos()
}

pub fn tan(z: Complex64) -> Complex64 {
    z.tan()
}

/// NaN where `sin z = 0`
pub fn cot(z: Complex64) -> Complex64 {
    div(z.cos(), z.sin())
}

pub fn sinh(z: Complex64) -> Complex64 {
    z.sinh()
}

pub fn cosh(z: Complex64) -> Complex64 {
    z.cosh()
}

pub fn tanh(z: Complex64) -> Complex64 {
    z.tanh()
}

pub fn coth(z: Complex64) -> Complex64 {
    div(z.cosh(), z.sinh())
}

/// Inverse sine from the real `acos`/`acosh` identity. Both arguments are clamped into the
/// real domain to absorb rounding.
pub fn asin(z: Complex64) -> Complex64 {
    let (a, b) = (z.re, z.im);
    let s = a * a + b * b;
    let t = ((s - 1.0).powi(2) + 4.0 * b * b).sqrt();
    let re = sgn_plus(a) / 2.0 * (t - s).clamp(-1.0, 1.0).acos();
    let im = sgn_plus(b) / 2.0 * (t + s).max(1.0).acosh();
    Complex64::new(re, im)
}

pub fn acos(z: Complex64) -> Complex64 {
    real(FRAC_PI_2) - asin(z)
}

/// `atan(z) = (i/2)(ln(1 - iz) - ln(1 + iz))`
pub fn atan(z: Complex64) -> Complex64 {
    let iz = Complex64::new(-z.im, z.re);
    let difference = ln(real(1.0) - iz) - ln(real(1.0) + iz);
    Complex64::new(0.0, 0.5) * difference
}

pub fn acot(z: Complex64) -> Complex64 {
    real(FRAC_PI_2) - atan(z)
}

pub fn asinh(z: Complex64) -> Complex64 {
    z.asinh()
}

pub fn acosh(z: Complex64) -> Complex64 {
    z.acosh()
}

pub fn atanh(z: Complex64) -> Complex64 {
    z.atanh()
}

pub fn acoth(z: Complex64) -> Complex64 {
    atanh(div(real(1.0), z))
}

/// `z / |z|`; NaN at the origin.
pub fn sign(z: Complex64) -> Complex64 {
    div(z, real(z.norm()))
}

pub fn apply(function: Function, z: Complex64) -> Complex64 {
    match function {
        Function::Sin => sin(z),
        Function::Cos => cos(z),
        Function::Tan => tan(z),
        Function::Cot => cot(z),
        Function::Sinh => sinh(z),
        Function::Cosh => cosh(z),
        Function::Tanh => tanh(z),
        Function::Coth => coth(z),
        Function::Asin => asin(z),
        Function::Acos => acos(z),
        Function::Atan => atan(z),
        Function::Acot => acot(z),
        Function::Asinh => asinh(z),
        Function::Acosh => acosh(z),
        Function::Atanh => atanh(z),
        Function::Acoth => acoth(z),
        Function::Sqrt => sqrt(z),
        Function::Exp => exp(z),
        Function::Ln => ln(z),
        Function::Lg => lg(z),
        Function::Abs => real(z.norm()),
        Function::Re => real(z.re),
        Function::Im => real(z.im),
        Function::Conj => z.conj(),
        Function::Sign => sign(z),
        Function::Floor => Complex64::new(z.re.floor(), z.im.floor()),
        Function::Ceil => Complex64::new(z.re.ceil(), z.im.ceil()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_complex(actual: Complex64, re: f64, im: f64) {
        assert_abs_diff_eq!(actual.re, re, epsilon = 1e-9);
        assert_abs_diff_eq!(actual.im, im, epsilon = 1e-9);
    }

    #[test]
    fn test_division() {
        let a = Complex64::new(3.0, -2.0);
        let b = Complex64::new(1.5, 4.0);
        let q = div(a * b, b);
        assert_complex(q, 3.0, -2.0);
        assert!(is_nan(div(a, Complex64::new(0.0, 0.0))));
    }

    #[test]
    fn test_power() {
        assert_complex(pow(real(3.0), real(2.0)), 9.0, 0.0);
        assert_complex(pow(real(-1.0), real(0.5)), 0.0, 1.0);
        // i^i = e^(-pi/2)
        let i = Complex64::new(0.0, 1.0);
        assert_complex(pow(i, i), (-FRAC_PI_2).exp(), 0.0);
        assert_complex(pow(real(0.0), real(0.0)), 1.0, 0.0);
        assert_complex(pow(real(0.0), real(2.0)), 0.0, 0.0);
        assert!(is_nan(pow(real(0.0), real(-1.0))));
    }

    #[test]
    fn test_logarithms() {
        assert_complex(ln(real(-1.0)), 0.0, PI);
        assert_complex(ln(Complex64::new(0.0, 1.0)), 0.0, FRAC_PI_2);
        assert!(is_nan(ln(real(0.0))));
        assert_complex(lg(real(1000.0)), 3.0, 0.0);
        assert_complex(log(real(8.0), real(2.0)), 3.0, 0.0);
        assert!(is_nan(log(real(8.0), real(1.0))));
    }

    #[test]
    fn test_sqrt_branches() {
        assert_complex(sqrt(real(4.0)), 2.0, 0.0);
        assert_complex(sqrt(real(-4.0)), 0.0, 2.0);
        assert_complex(sqrt(Complex64::new(-4.0, -0.0)), 0.0, 2.0);
        assert_complex(sqrt(Complex64::new(0.0, -2.0)), 1.0, -1.0);
    }

    #[test]
    fn test_trigonometry() {
        assert_complex(sin(real(0.0)), 0.0, 0.0);
        assert_complex(sin(real(PI)), 0.0, 0.0);
        assert_complex(cos(real(0.0)), 1.0, 0.0);
        let z = Complex64::new(0.7, -0.3);
        let identity = sin(z) * sin(z) + cos(z) * cos(z);
        assert_complex(identity, 1.0, 0.0);
        assert_complex(tan(z) * cos(z), sin(z).re, sin(z).im);
        assert_complex(cot(z) * tan(z), 1.0, 0.0);
        assert_complex(cosh(z) * cosh(z) - sinh(z) * sinh(z), 1.0, 0.0);
        assert_complex(coth(z) * tanh(z), 1.0, 0.0);
        assert!(is_nan(cot(real(0.0))));
        assert!(is_nan(coth(real(0.0))));
    }

    #[test]
    fn test_inverse_trigonometry() {
        assert_complex(asin(real(0.5)), PI / 6.0, 0.0);
        assert_complex(acos(real(0.5)), PI / 3.0, 0.0);
        assert_complex(atan(real(1.0)), PI / 4.0, 0.0);
        assert_complex(acot(real(1.0)), PI / 4.0, 0.0);
        let z = Complex64::new(0.4, 0.9);
        assert_complex(sin(asin(z)), 0.4, 0.9);
        assert_complex(tan(atan(z)), 0.4, 0.9);
        assert!(is_nan(atan(Complex64::new(0.0, 1.0))));
    }

    #[test]
    fn test_inverse_sine_off_the_real_interval() {
        for a in [2.0, -2.0, 3.0, -7.5] {
            let w = asin(real(a));
            assert_complex(sin(w), a, 0.0);
            assert!(w.im.abs() > 1.0);
            let v = acos(real(a));
            assert_complex(cos(v), a, 0.0);
            assert!(v.im.abs() > 1.0);
        }
        assert_complex(asin(real(1.0)), FRAC_PI_2, 0.0);
        assert_complex(asin(real(-1.0)), -FRAC_PI_2, 0.0);
        assert_complex(asin(real(0.0)), 0.0, 0.0);
    }

    #[test]
    fn test_inverse_hyperbolic() {
        let z = Complex64::new(0.4, 0.9);
        assert_complex(sinh(asinh(z)), 0.4, 0.9);
        assert_complex(cosh(acosh(z)), 0.4, 0.9);
        assert_complex(tanh(atanh(z)), 0.4, 0.9);
        assert_complex(coth(acoth(z)), 0.4, 0.9);
    }

    #[test]
    fn test_apply_misc() {
        let z = Complex64::new(-1.5, 2.5);
        assert_complex(apply(Function::Abs, Complex64::new(3.0, 4.0)), 5.0, 0.0);
        assert_complex(apply(Function::Re, z), -1.5, 0.0);
        assert_complex(apply(Function::Im, z), 2.5, 0.0);
        assert_complex(apply(Function::Conj, z), -1.5, -2.5);
        assert_complex(apply(Function::Floor, z), -2.0, 2.0);
        assert_complex(apply(Function::Ceil, z), -1.0, 3.0);
        assert_complex(apply(Function::Sign, Complex64::new(3.0, 4.0)), 0.6, 0.8);
        assert!(is_nan(apply(Function::Sign, real(0.0))));
        assert_complex(apply(Function::Exp, real(1.0)), std::f64::consts::E, 0.0);
    }
}
