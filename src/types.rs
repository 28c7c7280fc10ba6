use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{BayesError, Result};

/// Variant identifier, a plain string like `"control"`.
pub type VariantId = String;

/// Aggregated outcome counts for one variant and one goal.
///
/// Produced by whatever stores assignments and conversions; the engine only
/// reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantObservation {
    pub variant: VariantId,
    pub participated: u64,
    pub converted: u64,
    /// Sum of the recorded continuous outcome over converted participants.
    /// Only read in [`ComparisonMode::ContinuousValue`].
    #[serde(default)]
    pub total_value: f64,
}

impl VariantObservation {
    pub fn new(variant: impl Into<String>, participated: u64, converted: u64) -> Self {
        Self {
            variant: variant.into(),
            participated,
            converted,
            total_value: 0.0,
        }
    }

    /// Observation for a variant nobody has been bucketed into yet.
    pub fn empty(variant: impl Into<String>) -> Self {
        Self::new(variant, 0, 0)
    }

    pub fn with_total_value(mut self, total_value: f64) -> Self {
        self.total_value = total_value;
        self
    }

    /// Checks `converted <= participated` and that `total_value` is a
    /// non-negative finite number.
    pub fn validate(&self) -> Result<()> {
        if self.converted > self.participated {
            return Err(BayesError::InvalidObservation {
                variant: self.variant.clone(),
                converted: self.converted,
                participated: self.participated,
            });
        }
        if !self.total_value.is_finite() || self.total_value < 0.0 {
            return Err(BayesError::InvalidValue {
                variant: self.variant.clone(),
                value: self.total_value,
            });
        }
        Ok(())
    }

    pub fn conversion_rate(&self) -> Option<f64> {
        (self.participated > 0).then(|| self.converted as f64 / self.participated as f64)
    }

    pub fn average_conversion_value(&self) -> Option<f64> {
        (self.converted > 0).then(|| self.total_value / self.converted as f64)
    }

    pub fn average_participant_value(&self) -> Option<f64> {
        (self.participated > 0).then(|| self.total_value / self.participated as f64)
    }
}

/// Beta posterior over a conversion rate under a Beta(1,1) prior.
///
/// Both parameters are at least 1 when built through
/// [`crate::experiments::posterior::derive_beta_posterior`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BetaPosterior {
    pub alpha: u64,
    pub beta: u64,
}

impl BetaPosterior {
    pub fn mean(&self) -> f64 {
        self.alpha as f64 / (self.alpha + self.beta) as f64
    }
}

/// Gamma-posterior parameters for the continuous-value comparison:
/// `value` is the shape (value aggregate), `weight` the rate (relative exposure).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedValue {
    pub value: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonMode {
    ConversionRate,
    ContinuousValue,
}

/// Probability that each variant is the best one, in variant order.
///
/// Defined probabilities sum to exactly 1: the last variant always holds
/// the complement of the others. A `None` entry means the comparison could
/// not be made yet (continuous-value mode with degenerate aggregates).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinProbabilities {
    pub mode: ComparisonMode,
    pub probabilities: IndexMap<VariantId, Option<f64>>,
}

impl WinProbabilities {
    pub fn get(&self, variant: &str) -> Option<f64> {
        self.probabilities.get(variant).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// True when every variant has a probability.
    pub fn is_defined(&self) -> bool {
        self.probabilities.values().all(Option::is_some)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> + '_ {
        self.probabilities.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Sum of the defined probabilities, accumulated in variant order.
    pub fn total(&self) -> f64 {
        self.probabilities.values().flatten().fold(0.0, |acc, p| acc + p)
    }

    /// Variant with the highest defined probability. Ties keep the earlier variant.
    pub fn leader(&self) -> Option<&str> {
        let mut best: Option<(&str, f64)> = None;
        for (variant, p) in self.iter() {
            let Some(p) = p else { continue };
            if best.is_none_or(|(_, b)| p > b) {
                best = Some((variant, p));
            }
        }
        best.map(|(v, _)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observation_rejects_more_conversions_than_participants() {
        let obs = VariantObservation::new("a", 10, 11);
        assert!(matches!(
            obs.validate(),
            Err(BayesError::InvalidObservation { converted: 11, .. })
        ));
    }

    #[test]
    fn observation_rejects_negative_or_nan_value() {
        let neg = VariantObservation::new("a", 10, 2).with_total_value(-1.0);
        assert!(matches!(neg.validate(), Err(BayesError::InvalidValue { .. })));
        let nan = VariantObservation::new("a", 10, 2).with_total_value(f64::NAN);
        assert!(nan.validate().is_err());
    }

    #[test]
    fn observation_rates_are_none_without_data() {
        let obs = VariantObservation::empty("a");
        assert!(obs.validate().is_ok());
        assert_eq!(obs.conversion_rate(), None);
        assert_eq!(obs.average_conversion_value(), None);
        assert_eq!(obs.average_participant_value(), None);
    }

    #[test]
    fn observation_rates_from_counts() {
        let obs = VariantObservation::new("a", 200, 50).with_total_value(500.0);
        assert_eq!(obs.conversion_rate(), Some(0.25));
        assert_eq!(obs.average_conversion_value(), Some(10.0));
        assert_eq!(obs.average_participant_value(), Some(2.5));
    }

    #[test]
    fn observation_deserializes_without_total_value() {
        let obs: VariantObservation =
            serde_json::from_str(r#"{"variant":"b","participated":5,"converted":1}"#).unwrap();
        assert_eq!(obs, VariantObservation::new("b", 5, 1));
    }

    #[test]
    fn win_probabilities_leader_and_total() {
        let mut probabilities = IndexMap::new();
        probabilities.insert("a".to_string(), Some(0.2));
        probabilities.insert("b".to_string(), Some(0.8));
        let wp = WinProbabilities {
            mode: ComparisonMode::ConversionRate,
            probabilities,
        };
        assert_eq!(wp.leader(), Some("b"));
        assert!((wp.total() - 1.0).abs() < 1e-12);
        assert!(wp.is_defined());
        assert_eq!(wp.get("a"), Some(0.2));
        assert_eq!(wp.get("missing"), None);
    }

    #[test]
    fn win_probabilities_undefined_entries() {
        let mut probabilities = IndexMap::new();
        probabilities.insert("a".to_string(), None);
        probabilities.insert("b".to_string(), None);
        let wp = WinProbabilities {
            mode: ComparisonMode::ContinuousValue,
            probabilities,
        };
        assert!(!wp.is_defined());
        assert_eq!(wp.leader(), None);
        assert_eq!(wp.total(), 0.0);
    }
}
