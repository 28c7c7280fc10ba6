//! Continuous-value ("level") comparators.
//!
//! Each variant's value intensity is modelled as λ ~ Gamma(alpha, rate = beta),
//! where `alpha` is the value aggregate and `beta` the variant's relative
//! exposure. The sums mirror the conversion-rate comparators in
//! [`super::stats`], with Poisson/Gamma terms in place of Beta terms.
//!
//! Every shape is truncated to its integer part before use, in every role,
//! so a variant is the same Gamma(⌊alpha⌋) whichever side of a comparison
//! it is on. A shape below 1 (including zero or a missing aggregate) gives
//! an empty sum, so these functions report the comparison as undefined
//! (`Ok(None)`) instead.

use super::special::{ln_beta, ln_gamma};
use crate::error::{BayesError, Result};

fn check_weight(function: &'static str, weight: f64) -> Result<f64> {
    if weight.is_finite() && weight > 0.0 {
        Ok(weight)
    } else {
        Err(BayesError::domain(function, weight))
    }
}

/// Number of summation terms for a value aggregate, or `None` when the
/// aggregate cannot support a comparison.
pub fn shape_terms(alpha: f64) -> Option<u64> {
    if alpha.is_finite() && alpha >= 1.0 {
        Some(alpha.floor() as u64)
    } else {
        None
    }
}

/// P(λ1 > λ2).
///
/// With a1 = ⌊alpha_1⌋ and a2 = ⌊alpha_2⌋:
/// P = Σ_{i=0}^{a1−1} β1^i β2^a2 / ((β1+β2)^(i+a2) · (i+a2) · B(i+1, a2))
///
/// # Errors
///
/// [`BayesError::Domain`] if a weight is not a positive finite number.
/// Degenerate aggregates return `Ok(None)`.
pub fn level_prob_1_beats_2(
    alpha_1: f64,
    beta_1: f64,
    alpha_2: f64,
    beta_2: f64,
) -> Result<Option<f64>> {
    let beta_1 = check_weight("level_prob_1_beats_2", beta_1)?;
    let beta_2 = check_weight("level_prob_1_beats_2", beta_2)?;
    let (Some(terms_1), Some(terms_2)) = (shape_terms(alpha_1), shape_terms(alpha_2)) else {
        return Ok(None);
    };
    let alpha_2 = terms_2 as f64;

    let ln_beta_1 = beta_1.ln();
    let alpha_2_ln_beta_2 = alpha_2 * beta_2.ln();
    let ln_beta_1_plus_beta_2 = (beta_1 + beta_2).ln();

    let mut total = 0.0;
    for i in 0..terms_1 {
        let i = i as f64;
        total += (i * ln_beta_1 + alpha_2_ln_beta_2
            - (i + alpha_2) * ln_beta_1_plus_beta_2
            - (i + alpha_2).ln()
            - ln_beta(i + 1.0, alpha_2)?)
        .exp();
    }

    Ok(Some(total.clamp(0.0, 1.0)))
}

/// P(λ1 > λ2 and λ1 > λ3).
///
/// 1 − P(λ2 > λ1) − P(λ3 > λ1) + P(λ2 > λ1 and λ3 > λ1), the last term a
/// double sum over `i < ⌊alpha_2⌋`, `j < ⌊alpha_3⌋`.
///
/// # Errors
///
/// [`BayesError::Domain`] if a weight is not a positive finite number.
/// Degenerate aggregates return `Ok(None)`.
pub fn level_prob_1_beats_2_and_3(
    alpha_1: f64,
    beta_1: f64,
    alpha_2: f64,
    beta_2: f64,
    alpha_3: f64,
    beta_3: f64,
) -> Result<Option<f64>> {
    let beta_1 = check_weight("level_prob_1_beats_2_and_3", beta_1)?;
    let beta_2 = check_weight("level_prob_1_beats_2_and_3", beta_2)?;
    let beta_3 = check_weight("level_prob_1_beats_2_and_3", beta_3)?;
    let (Some(terms_1), Some(terms_2), Some(terms_3)) = (
        shape_terms(alpha_1),
        shape_terms(alpha_2),
        shape_terms(alpha_3),
    ) else {
        return Ok(None);
    };
    let alpha_1 = terms_1 as f64;

    let ln_beta_2 = beta_2.ln();
    let ln_beta_3 = beta_3.ln();
    let ln_beta_sum = (beta_1 + beta_2 + beta_3).ln();
    // Constant part of every term: α1 ln β1 − ln Γ(α1).
    let head = alpha_1 * beta_1.ln() - ln_gamma(alpha_1)?;

    // (i + j + α1) enters only through i + j.
    let sum_len = (terms_2 + terms_3 - 1) as usize;
    let by_sum = (0..sum_len)
        .map(|k| {
            let shape = k as f64 + alpha_1;
            Ok(ln_gamma(shape)? - shape * ln_beta_sum)
        })
        .collect::<Result<Vec<f64>>>()?;

    let ln_j_part = (0..terms_3)
        .map(|j| {
            let j = j as f64;
            Ok(j * ln_beta_3 - ln_gamma(j + 1.0)?)
        })
        .collect::<Result<Vec<f64>>>()?;

    let mut total = 0.0;
    for i in 0..terms_2 as usize {
        let i_f = i as f64;
        let ln_i_part = head + i_f * ln_beta_2 - ln_gamma(i_f + 1.0)?;
        for (j, ln_j) in ln_j_part.iter().enumerate() {
            total += (ln_i_part + ln_j + by_sum[i + j]).exp();
        }
    }

    let (Some(two_beats_one), Some(three_beats_one)) = (
        level_prob_1_beats_2(terms_2 as f64, beta_2, alpha_1, beta_1)?,
        level_prob_1_beats_2(terms_3 as f64, beta_3, alpha_1, beta_1)?,
    ) else {
        return Ok(None);
    };

    Ok(Some(
        (1.0 - two_beats_one - three_beats_one + total).clamp(0.0, 1.0),
    ))
}
