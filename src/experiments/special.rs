//! Log-space special functions shared by every comparator.
//!
//! Conversion counts reach the tens of thousands, where Γ itself overflows
//! an `f64`; all callers stay in log space and exponentiate once per term.

use crate::error::{BayesError, Result};

/// Lanczos coefficients (g=7, n=9).
#[allow(clippy::excessive_precision)]
const LANCZOS: [f64; 9] = [
    0.99999999999980993,
    676.5203681218851,
    -1259.1392167224028,
    771.32342877765313,
    -176.61502916214059,
    12.507343278686905,
    -0.13857109526572012,
    9.9843695780195716e-6,
    1.5056327351493116e-7,
];

/// ln(Γ(x)) for x > 0.
///
/// # Errors
///
/// [`BayesError::Domain`] when `x` is not a positive finite number.
pub fn ln_gamma(x: f64) -> Result<f64> {
    if !x.is_finite() || x <= 0.0 {
        return Err(BayesError::domain("ln_gamma", x));
    }
    Ok(lanczos_ln_gamma(x))
}

/// ln(B(x, y)) = ln Γ(x) + ln Γ(y) − ln Γ(x+y).
///
/// # Errors
///
/// [`BayesError::Domain`] when either argument is not a positive finite number.
pub fn ln_beta(x: f64, y: f64) -> Result<f64> {
    if !x.is_finite() || x <= 0.0 {
        return Err(BayesError::domain("ln_beta", x));
    }
    if !y.is_finite() || y <= 0.0 {
        return Err(BayesError::domain("ln_beta", y));
    }
    Ok(lanczos_ln_gamma(x) + lanczos_ln_gamma(y) - lanczos_ln_gamma(x + y))
}

/// Positive finite input only; checked by the public wrappers.
fn lanczos_ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        // Reflection: Γ(x)Γ(1−x) = π / sin(πx), with sin(πx) > 0 on (0, 0.5).
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - lanczos_ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let mut acc = LANCZOS[0];
    let t = x + 7.5; // g + 0.5

    for (i, &coef) in LANCZOS.iter().enumerate().skip(1) {
        acc += coef / (x + i as f64);
    }

    0.5 * (2.0 * std::f64::consts::PI).ln() + (t.ln() * (x + 0.5)) - t + acc.ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol * expected.abs().max(1.0),
            "actual={} expected={}",
            actual,
            expected
        );
    }

    #[test]
    fn ln_gamma_of_one_and_two_is_zero() {
        assert_close(ln_gamma(1.0).unwrap(), 0.0, 1e-13);
        assert_close(ln_gamma(2.0).unwrap(), 0.0, 1e-13);
    }

    #[test]
    fn ln_gamma_matches_factorial() {
        // Γ(10) = 9! = 362880
        assert_close(ln_gamma(10.0).unwrap(), 362880f64.ln(), 1e-13);
    }

    #[test]
    fn ln_gamma_half_is_ln_sqrt_pi() {
        assert_close(
            ln_gamma(0.5).unwrap(),
            std::f64::consts::PI.sqrt().ln(),
            1e-13,
        );
    }

    #[test]
    fn ln_gamma_small_argument_uses_reflection() {
        // Γ(0.25) = 3.625609908221908...
        assert_close(ln_gamma(0.25).unwrap(), 3.625609908221908f64.ln(), 1e-12);
    }

    #[test]
    fn ln_gamma_large_argument_does_not_overflow() {
        let v = ln_gamma(50_000.5).unwrap();
        assert!(v.is_finite());
        // Stirling: (x − 0.5) ln x − x + 0.5 ln(2π)
        let x: f64 = 50_000.5;
        let stirling = (x - 0.5) * x.ln() - x + 0.5 * (2.0 * std::f64::consts::PI).ln();
        assert_close(v, stirling, 1e-9);
    }

    #[test]
    fn ln_gamma_rejects_non_positive() {
        assert!(matches!(
            ln_gamma(0.0),
            Err(BayesError::Domain {
                function: "ln_gamma",
                ..
            })
        ));
        assert!(ln_gamma(-3.0).is_err());
        assert!(ln_gamma(f64::NAN).is_err());
        assert!(ln_gamma(f64::INFINITY).is_err());
    }

    #[test]
    fn ln_beta_known_values() {
        assert_close(ln_beta(1.0, 1.0).unwrap(), 0.0, 1e-13);
        // B(2,3) = 1/12
        assert_close(ln_beta(2.0, 3.0).unwrap(), (1.0f64 / 12.0).ln(), 1e-13);
        assert_close(ln_beta(3.0, 2.0).unwrap(), ln_beta(2.0, 3.0).unwrap(), 1e-15);
    }

    #[test]
    fn ln_beta_rejects_non_positive() {
        assert!(ln_beta(0.0, 1.0).is_err());
        assert!(ln_beta(1.0, -0.5).is_err());
    }

    #[test]
    fn ln_gamma_agrees_with_statrs() {
        for &x in &[0.1, 0.5, 1.5, 3.0, 7.5, 42.0, 1_000.5, 25_000.0, 80_000.5] {
            let ours = ln_gamma(x).unwrap();
            let reference = statrs::function::gamma::ln_gamma(x);
            assert_close(ours, reference, 1e-10);
        }
    }

    #[test]
    fn ln_beta_agrees_with_statrs() {
        for &(a, b) in &[(1.0, 1.0), (2.0, 10.0), (6.0, 6.0), (120.0, 880.0), (20_001.0, 30_000.0)] {
            let ours = ln_beta(a, b).unwrap();
            let reference = statrs::function::beta::ln_beta(a, b);
            assert_close(ours, reference, 1e-9);
        }
    }
}
