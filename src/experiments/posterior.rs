//! Posterior parameters from raw per-variant counts.
//!
//! Conversion rate: Beta(1, 1) prior with a Binomial likelihood, so
//! `alpha = 1 + converted`, `beta = 1 + participated − converted`.
//!
//! Continuous value: the Gamma shape is the variant's summed value and the
//! rate is its exposure relative to the least-exposed variant
//! (`participated / min participated`). This is the only weighting the
//! engine uses; configured traffic allocations are reported separately and
//! never enter the comparison.

use crate::error::Result;
use crate::types::{BetaPosterior, VariantObservation, WeightedValue};

/// # Errors
///
/// [`crate::BayesError::InvalidObservation`] if `converted > participated`.
pub fn derive_beta_posterior(observation: &VariantObservation) -> Result<BetaPosterior> {
    observation.validate()?;
    Ok(BetaPosterior {
        alpha: 1 + observation.converted,
        beta: 1 + observation.participated - observation.converted,
    })
}

/// Relative exposure of each variant: participants divided by the smallest
/// participant count. `None` when any variant has no participants.
pub fn exposure_weights(observations: &[VariantObservation]) -> Option<Vec<f64>> {
    let min = observations.iter().map(|o| o.participated).min()?;
    if min == 0 {
        return None;
    }
    let min = min as f64;
    Some(
        observations
            .iter()
            .map(|o| o.participated as f64 / min)
            .collect(),
    )
}

/// Per-variant `(value, weight)` pairs for the level comparators.
///
/// A variant's entry is `None` when it has no conversions or no recorded
/// value, and every entry is `None` when some variant has no participants.
///
/// # Errors
///
/// Propagates observation validation failures.
pub fn derive_weighted_values(
    observations: &[VariantObservation],
) -> Result<Vec<Option<WeightedValue>>> {
    for observation in observations {
        observation.validate()?;
    }
    let Some(weights) = exposure_weights(observations) else {
        return Ok(vec![None; observations.len()]);
    };
    Ok(observations
        .iter()
        .zip(weights)
        .map(|(o, weight)| {
            (o.converted > 0 && o.total_value > 0.0).then_some(WeightedValue {
                value: o.total_value,
                weight,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BayesError;

    #[test]
    fn beta_posterior_uses_plus_one_smoothing() {
        let p = derive_beta_posterior(&VariantObservation::new("a", 100, 10)).unwrap();
        assert_eq!(p, BetaPosterior { alpha: 11, beta: 91 });
    }

    #[test]
    fn beta_posterior_for_empty_variant_is_uniform() {
        let p = derive_beta_posterior(&VariantObservation::empty("a")).unwrap();
        assert_eq!(p, BetaPosterior { alpha: 1, beta: 1 });
        assert_eq!(p.mean(), 0.5);
    }

    #[test]
    fn beta_posterior_all_converted() {
        let p = derive_beta_posterior(&VariantObservation::new("a", 7, 7)).unwrap();
        assert_eq!(p, BetaPosterior { alpha: 8, beta: 1 });
    }

    #[test]
    fn beta_posterior_rejects_invalid_counts() {
        let err = derive_beta_posterior(&VariantObservation::new("a", 3, 4)).unwrap_err();
        assert!(matches!(err, BayesError::InvalidObservation { .. }));
    }

    #[test]
    fn exposure_weights_relative_to_smallest_variant() {
        let obs = vec![
            VariantObservation::new("a", 200, 10),
            VariantObservation::new("b", 100, 10),
            VariantObservation::new("c", 150, 10),
        ];
        assert_eq!(exposure_weights(&obs), Some(vec![2.0, 1.0, 1.5]));
    }

    #[test]
    fn exposure_weights_none_when_a_variant_is_empty() {
        let obs = vec![
            VariantObservation::new("a", 200, 10),
            VariantObservation::empty("b"),
        ];
        assert_eq!(exposure_weights(&obs), None);
        assert_eq!(exposure_weights(&[]), None);
    }

    #[test]
    fn weighted_values_pair_value_with_exposure() {
        let obs = vec![
            VariantObservation::new("a", 200, 10).with_total_value(120.0),
            VariantObservation::new("b", 100, 8).with_total_value(95.5),
        ];
        let values = derive_weighted_values(&obs).unwrap();
        assert_eq!(
            values,
            vec![
                Some(WeightedValue {
                    value: 120.0,
                    weight: 2.0
                }),
                Some(WeightedValue {
                    value: 95.5,
                    weight: 1.0
                }),
            ]
        );
    }

    #[test]
    fn weighted_values_undefined_without_conversions_or_value() {
        let obs = vec![
            VariantObservation::new("a", 100, 0),
            VariantObservation::new("b", 100, 5),
            VariantObservation::new("c", 100, 5).with_total_value(40.0),
        ];
        let values = derive_weighted_values(&obs).unwrap();
        assert_eq!(values[0], None);
        assert_eq!(values[1], None);
        assert!(values[2].is_some());
    }

    #[test]
    fn weighted_values_all_undefined_when_a_variant_has_no_participants() {
        let obs = vec![
            VariantObservation::new("a", 100, 5).with_total_value(40.0),
            VariantObservation::empty("b"),
        ];
        assert_eq!(derive_weighted_values(&obs).unwrap(), vec![None, None]);
    }
}
