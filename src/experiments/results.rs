//! Winner probabilities for up to three variants, plus the per-variant
//! reporting rows built on top of them.
//!
//! Every variant but the last is tested against its rivals with a closed-form
//! comparator; the last variant receives `1 − Σ others`, so defined
//! probabilities always add up to exactly 1.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use super::cache::{CacheKey, Comparator, ProbabilityCache};
use super::config::{EngineConfig, ExperimentConfig, MAX_VARIANTS};
use super::level::{level_prob_1_beats_2, level_prob_1_beats_2_and_3, shape_terms};
use super::posterior::{derive_beta_posterior, derive_weighted_values};
use super::rotation::{rotations, Roles};
use super::stats::{pairwise_terms, prob_b_beats_a, prob_c_beats_a_and_b, triple_terms};
use crate::error::{BayesError, Result};
use crate::types::{
    BetaPosterior, ComparisonMode, VariantId, VariantObservation, WeightedValue, WinProbabilities,
};

/// Win probabilities with the default engine settings and no cache.
pub fn compute_win_probabilities(
    observations: &[VariantObservation],
    mode: ComparisonMode,
) -> Result<WinProbabilities> {
    WinProbabilityEngine::default().compute(observations, mode)
}

/// The aggregator, optionally backed by a memoization port.
#[derive(Clone, Default)]
pub struct WinProbabilityEngine {
    config: EngineConfig,
    cache: Option<Arc<dyn ProbabilityCache>>,
}

impl std::fmt::Debug for WinProbabilityEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WinProbabilityEngine")
            .field("config", &self.config)
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

impl WinProbabilityEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn ProbabilityCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Probability that each variant is the best, keyed by variant in input order.
    ///
    /// # Errors
    ///
    /// - [`BayesError::UnsupportedVariantCount`] for zero or more than three variants.
    /// - [`BayesError::DuplicateVariant`] when two observations share an id.
    /// - Observation validation errors.
    pub fn compute(
        &self,
        observations: &[VariantObservation],
        mode: ComparisonMode,
    ) -> Result<WinProbabilities> {
        check_observations(observations)?;

        let values = match mode {
            ComparisonMode::ConversionRate => self.conversion_probabilities(observations)?,
            ComparisonMode::ContinuousValue => self.value_probabilities(observations)?,
        };

        let probabilities: IndexMap<VariantId, Option<f64>> = observations
            .iter()
            .map(|o| o.variant.clone())
            .zip(values)
            .collect();
        Ok(WinProbabilities {
            mode,
            probabilities,
        })
    }

    fn conversion_probabilities(
        &self,
        observations: &[VariantObservation],
    ) -> Result<Vec<Option<f64>>> {
        let posteriors = observations
            .iter()
            .map(derive_beta_posterior)
            .collect::<Result<Vec<BetaPosterior>>>()?;

        let mut computed = Vec::with_capacity(posteriors.len());
        for roles in rotations(posteriors.len()) {
            let p = match roles {
                Roles::Pair { subject, rival } => {
                    let (a, b) = (posteriors[rival], posteriors[subject]);
                    self.warn_if_heavy(observations, roles, pairwise_terms(b.alpha));
                    let args = [a.alpha, a.beta, b.alpha, b.beta];
                    self.memoized(
                        || CacheKey::counts(Comparator::ProbBBeatsA, &args),
                        || prob_b_beats_a(a.alpha, a.beta, b.alpha, b.beta).map(Some),
                    )?
                }
                Roles::Triple {
                    subject,
                    first_rival,
                    second_rival,
                } => {
                    let a = posteriors[second_rival];
                    let b = posteriors[first_rival];
                    let c = posteriors[subject];
                    self.warn_if_heavy(observations, roles, triple_terms(a.alpha, b.alpha, c.alpha));
                    let args = [a.alpha, a.beta, b.alpha, b.beta, c.alpha, c.beta];
                    self.memoized(
                        || CacheKey::counts(Comparator::ProbCBeatsAAndB, &args),
                        || {
                            prob_c_beats_a_and_b(a.alpha, a.beta, b.alpha, b.beta, c.alpha, c.beta)
                                .map(Some)
                        },
                    )?
                }
            };
            tracing::debug!(
                variant = %observations[roles.subject()].variant,
                mode = "conversion_rate",
                probability = ?p,
                "win probability step"
            );
            computed.push(p);
        }
        Ok(with_complement(computed))
    }

    fn value_probabilities(&self, observations: &[VariantObservation]) -> Result<Vec<Option<f64>>> {
        let values = derive_weighted_values(observations)?;

        let mut computed = Vec::with_capacity(values.len());
        for roles in rotations(values.len()) {
            let p = match roles {
                Roles::Pair { subject, rival } => match (values[subject], values[rival]) {
                    (Some(one), Some(two)) => {
                        let work = shape_terms(one.value).unwrap_or(0);
                        self.warn_if_heavy(observations, roles, work);
                        let args = [one.value, one.weight, two.value, two.weight];
                        self.memoized(
                            || self.real_key(Comparator::LevelProb1Beats2, &args),
                            || level_prob_1_beats_2(one.value, one.weight, two.value, two.weight),
                        )?
                    }
                    _ => None,
                },
                Roles::Triple {
                    subject,
                    first_rival,
                    second_rival,
                } => match (values[subject], values[first_rival], values[second_rival]) {
                    (Some(one), Some(two), Some(three)) => {
                        self.warn_if_heavy(observations, roles, level_triple_work(one, two, three));
                        let args = [
                            one.value,
                            one.weight,
                            two.value,
                            two.weight,
                            three.value,
                            three.weight,
                        ];
                        self.memoized(
                            || self.real_key(Comparator::LevelProb1Beats2And3, &args),
                            || {
                                level_prob_1_beats_2_and_3(
                                    one.value,
                                    one.weight,
                                    two.value,
                                    two.weight,
                                    three.value,
                                    three.weight,
                                )
                            },
                        )?
                    }
                    _ => None,
                },
            };
            let variant = &observations[roles.subject()].variant;
            match p {
                Some(p) => tracing::debug!(
                    variant = %variant,
                    mode = "continuous_value",
                    probability = p,
                    "win probability step"
                ),
                None => tracing::debug!(
                    variant = %variant,
                    "value comparison undefined: degenerate aggregate"
                ),
            }
            computed.push(p);
        }
        Ok(with_complement(computed))
    }

    fn real_key(&self, comparator: Comparator, args: &[f64]) -> CacheKey {
        CacheKey::reals(comparator, args, self.config.cache_key_decimals)
    }

    /// Runs `compute` unless the cache already holds the value for `key`.
    /// Undefined results are never stored.
    fn memoized(
        &self,
        key: impl FnOnce() -> CacheKey,
        compute: impl FnOnce() -> Result<Option<f64>>,
    ) -> Result<Option<f64>> {
        let cache = match &self.cache {
            Some(cache) if self.config.cache_enabled => cache,
            _ => return compute(),
        };
        let key = key();
        if let Some(hit) = cache.get(&key) {
            tracing::trace!(key = %key, "win probability cache hit");
            return Ok(Some(hit));
        }
        let value = compute()?;
        if let Some(v) = value {
            cache.put(key, v);
        }
        Ok(value)
    }

    fn warn_if_heavy(&self, observations: &[VariantObservation], roles: Roles, terms: u64) {
        if terms > self.config.work_warn_terms {
            tracing::warn!(
                variant = %observations[roles.subject()].variant,
                terms,
                threshold = self.config.work_warn_terms,
                "win probability comparison is expensive; consider capping observation counts"
            );
        }
    }

    /// Per-variant reporting rows for an experiment, in configured order.
    ///
    /// Observations are aligned to the experiment's variants first; variants
    /// with no observation are reported with empty counts.
    pub fn experiment_results(
        &self,
        experiment: &ExperimentConfig,
        observations: &[VariantObservation],
    ) -> Result<ExperimentResults> {
        experiment.validate()?;
        let aligned = experiment.align(observations)?;

        let conversion = self.compute(&aligned, ComparisonMode::ConversionRate)?;
        let value = self.compute(&aligned, ComparisonMode::ContinuousValue)?;
        let exposure = exposure_shares(&aligned);
        let allocation = experiment.allocation_shares();

        let variants = aligned
            .iter()
            .enumerate()
            .map(|(i, o)| VariantSummary {
                variant: o.variant.clone(),
                participated: o.participated,
                converted: o.converted,
                conversion_rate: o.conversion_rate(),
                average_conversion_value: o.average_conversion_value(),
                average_participant_value: o.average_participant_value(),
                total_value: (o.converted > 0).then_some(o.total_value),
                prob_winning: conversion.get(&o.variant).unwrap_or(0.0),
                prob_winning_value: value.get(&o.variant),
                exposure_share: exposure.as_ref().map(|shares| shares[i]),
                allocation_share: allocation[i],
            })
            .collect();

        tracing::debug!(
            experiment = %experiment.id,
            active = experiment.is_active(),
            variants = aligned.len(),
            leader = ?conversion.leader(),
            "experiment results computed"
        );

        Ok(ExperimentResults {
            experiment_id: experiment.id.clone(),
            name: experiment.display_name(),
            active: experiment.is_active(),
            winner: experiment.winner.clone(),
            leader: conversion.leader().map(str::to_string),
            variants,
        })
    }
}

fn check_observations(observations: &[VariantObservation]) -> Result<()> {
    if observations.is_empty() || observations.len() > MAX_VARIANTS {
        return Err(BayesError::UnsupportedVariantCount(observations.len()));
    }
    let mut seen = HashSet::new();
    for o in observations {
        if !seen.insert(o.variant.as_str()) {
            return Err(BayesError::DuplicateVariant(o.variant.clone()));
        }
        o.validate()?;
    }
    Ok(())
}

/// Appends the last variant's probability: the complement of the computed
/// ones, or `None` when any of them is undefined. Accumulates in the same
/// order as [`WinProbabilities::total`], so that sum comes out at exactly 1.
fn with_complement(mut computed: Vec<Option<f64>>) -> Vec<Option<f64>> {
    let Some(mut values) = computed.iter().copied().collect::<Option<Vec<f64>>>() else {
        computed.push(None);
        return computed;
    };
    fit_to_unit(&mut values);
    let last = 1.0 - running_sum(&values);
    values.push(last);
    values.into_iter().map(Some).collect()
}

fn running_sum(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |acc, p| acc + p)
}

/// Scales the computed probabilities down when rounding in the comparators
/// pushed their sum above 1, so the complement is never negative.
fn fit_to_unit(values: &mut [f64]) {
    let sum = running_sum(values);
    if sum <= 1.0 {
        return;
    }
    tracing::debug!(sum, "rescaling win probabilities that sum above 1");
    for v in values.iter_mut() {
        *v /= sum;
    }
    // Division can still leave the sum an ulp or two above 1.
    while running_sum(values) > 1.0 {
        let Some(largest) = values.iter_mut().max_by(|a, b| a.total_cmp(b)) else {
            return;
        };
        *largest = f64::from_bits(largest.to_bits() - 1);
    }
}

fn level_triple_work(one: WeightedValue, two: WeightedValue, three: WeightedValue) -> u64 {
    let t1 = shape_terms(one.value).unwrap_or(0);
    let t2 = shape_terms(two.value).unwrap_or(0);
    let t3 = shape_terms(three.value).unwrap_or(0);
    t2.saturating_mul(t3)
        .saturating_add(t2)
        .saturating_add(t3)
        .saturating_add(t1)
}

/// Share of all participants seen by each variant; last is the complement.
fn exposure_shares(observations: &[VariantObservation]) -> Option<Vec<f64>> {
    let total: u64 = observations.iter().map(|o| o.participated).sum();
    if total == 0 {
        return None;
    }
    let total = total as f64;
    let shares = observations[..observations.len() - 1]
        .iter()
        .map(|o| Some(o.participated as f64 / total))
        .collect();
    with_complement(shares).into_iter().collect()
}

// ── Reporting rows ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSummary {
    pub variant: VariantId,
    pub participated: u64,
    pub converted: u64,
    pub conversion_rate: Option<f64>,
    pub average_conversion_value: Option<f64>,
    pub average_participant_value: Option<f64>,
    /// `None` until the variant has a conversion.
    pub total_value: Option<f64>,
    pub prob_winning: f64,
    pub prob_winning_value: Option<f64>,
    pub exposure_share: Option<f64>,
    /// Configured traffic allocation in percent.
    pub allocation_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentResults {
    pub experiment_id: String,
    pub name: String,
    /// False once a winner has been declared.
    pub active: bool,
    pub winner: Option<String>,
    /// Variant most likely to have the best conversion rate.
    pub leader: Option<String>,
    pub variants: Vec<VariantSummary>,
}

impl ExperimentResults {
    pub fn variant(&self, id: &str) -> Option<&VariantSummary> {
        self.variants.iter().find(|v| v.variant == id)
    }
}
