//! Closed-form conversion-rate comparators for Beta posteriors.
//!
//! Formulas from Evan Miller, "Formulas for Bayesian A/B Testing"
//! (<https://www.evanmiller.org/bayesian-ab-testing.html>). Every term is
//! assembled in log space and exponentiated once; the naive product form
//! overflows at realistic traffic.

use super::special::ln_beta;
use crate::error::{BayesError, Result};

// ── Parameter checks ────────────────────────────────────────────────

fn check_params(function: &'static str, params: &[u64]) -> Result<()> {
    match params.iter().find(|&&p| p == 0) {
        Some(&p) => Err(BayesError::domain(function, p as f64)),
        None => Ok(()),
    }
}

/// Number of exponentiated terms `prob_b_beats_a` sums.
pub fn pairwise_terms(alpha_b: u64) -> u64 {
    alpha_b
}

/// Number of exponentiated terms `prob_c_beats_a_and_b` sums, including
/// its two pairwise calls.
pub fn triple_terms(alpha_a: u64, alpha_b: u64, alpha_c: u64) -> u64 {
    alpha_a
        .saturating_mul(alpha_b)
        .saturating_add(alpha_c.saturating_mul(2))
}

// ── Pairwise ────────────────────────────────────────────────────────

/// P(rate_B > rate_A) for rate_A ~ Beta(alpha_a, beta_a), rate_B ~ Beta(alpha_b, beta_b).
///
/// P = Σ_{i=0}^{alpha_b−1} B(alpha_a+i, beta_a+beta_b) / ((beta_b+i) · B(1+i, beta_b) · B(alpha_a, beta_a))
///
/// # Errors
///
/// [`BayesError::Domain`] if any parameter is zero.
pub fn prob_b_beats_a(alpha_a: u64, beta_a: u64, alpha_b: u64, beta_b: u64) -> Result<f64> {
    check_params("prob_b_beats_a", &[alpha_a, beta_a, alpha_b, beta_b])?;

    let alpha_a = alpha_a as f64;
    let beta_a = beta_a as f64;
    let beta_b_f = beta_b as f64;

    // Loop-invariant pieces.
    let ln_beta_aa_ba = ln_beta(alpha_a, beta_a)?;
    let beta_ba = beta_b_f + beta_a;

    let mut total = 0.0;
    for i in 0..alpha_b {
        let i = i as f64;
        total += (ln_beta(alpha_a + i, beta_ba)?
            - (beta_b_f + i).ln()
            - ln_beta(1.0 + i, beta_b_f)?
            - ln_beta_aa_ba)
            .exp();
    }

    Ok(total.clamp(0.0, 1.0))
}

// ── Triple ──────────────────────────────────────────────────────────

/// P(rate_C > rate_A and rate_C > rate_B) for three independent Beta posteriors.
///
/// Inclusion–exclusion: 1 − P(A > C) − P(B > C) + P(A > C and B > C), where
/// the last term is the double sum over `i < alpha_a`, `j < alpha_b`.
///
/// # Errors
///
/// [`BayesError::Domain`] if any parameter is zero.
pub fn prob_c_beats_a_and_b(
    alpha_a: u64,
    beta_a: u64,
    alpha_b: u64,
    beta_b: u64,
    alpha_c: u64,
    beta_c: u64,
) -> Result<f64> {
    check_params(
        "prob_c_beats_a_and_b",
        &[alpha_a, beta_a, alpha_b, beta_b, alpha_c, beta_c],
    )?;

    let beta_a_f = beta_a as f64;
    let beta_b_f = beta_b as f64;
    let alpha_c_f = alpha_c as f64;
    let beta_c_f = beta_c as f64;

    let ln_beta_ac_bc = ln_beta(alpha_c_f, beta_c_f)?;
    let abc = beta_a_f + beta_b_f + beta_c_f;

    // ln B(alpha_c + i + j, beta_a + beta_b + beta_c) depends on i + j only.
    let sum_len = (alpha_a + alpha_b - 1) as usize;
    let ln_beta_by_sum = (0..sum_len)
        .map(|k| ln_beta(alpha_c_f + k as f64, abc))
        .collect::<Result<Vec<f64>>>()?;

    let ln_bb_j: Vec<f64> = (0..alpha_b).map(|j| (beta_b_f + j as f64).ln()).collect();
    let ln_beta_j_bb = (0..alpha_b)
        .map(|j| ln_beta(1.0 + j as f64, beta_b_f))
        .collect::<Result<Vec<f64>>>()?;

    let mut total = 0.0;
    for i in 0..alpha_a as usize {
        let i_f = i as f64;
        let ln_i = (beta_a_f + i_f).ln() + ln_beta(1.0 + i_f, beta_a_f)? + ln_beta_ac_bc;
        for j in 0..alpha_b as usize {
            total += (ln_beta_by_sum[i + j] - ln_i - ln_bb_j[j] - ln_beta_j_bb[j]).exp();
        }
    }

    let a_beats_c = prob_b_beats_a(alpha_c, beta_c, alpha_a, beta_a)?;
    let b_beats_c = prob_b_beats_a(alpha_c, beta_c, alpha_b, beta_b)?;

    Ok((1.0 - a_beats_c - b_beats_c + total).clamp(0.0, 1.0))
}
