use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::Path;

use crate::error::{BayesError, Result};
use crate::types::VariantObservation;

/// Closed forms exist for at most this many variants.
pub const MAX_VARIANTS: usize = 3;

const DEFAULT_CACHE_KEY_DECIMALS: u32 = 9;
const MAX_CACHE_KEY_DECIMALS: u32 = 12;
const DEFAULT_WORK_WARN_TERMS: u64 = 5_000_000;

// ── Engine ──────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Consult the injected cache (if any). Results are identical either way.
    pub cache_enabled: bool,
    /// Decimal places kept for real-valued arguments in cache keys.
    pub cache_key_decimals: u32,
    /// Summation size above which a comparison is logged at `warn`.
    pub work_warn_terms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            cache_enabled: true,
            cache_key_decimals: DEFAULT_CACHE_KEY_DECIMALS,
            work_warn_terms: DEFAULT_WORK_WARN_TERMS,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = EngineConfig::default();
        EngineConfig {
            cache_enabled: env::var("FLAPJACK_BAYES_CACHE")
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(defaults.cache_enabled),
            cache_key_decimals: env::var("FLAPJACK_BAYES_CACHE_KEY_DECIMALS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&d| d <= MAX_CACHE_KEY_DECIMALS)
                .unwrap_or(defaults.cache_key_decimals),
            work_warn_terms: env::var("FLAPJACK_BAYES_WORK_WARN_TERMS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&t| t > 0)
                .unwrap_or(defaults.work_warn_terms),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_key_decimals > MAX_CACHE_KEY_DECIMALS {
            return Err(BayesError::InvalidConfig(format!(
                "cacheKeyDecimals must be at most {}",
                MAX_CACHE_KEY_DECIMALS
            )));
        }
        if self.work_warn_terms == 0 {
            return Err(BayesError::InvalidConfig(
                "workWarnTerms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ── Experiment ──────────────────────────────────────────────────────

/// An experiment definition as far as the win-probability engine needs it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub variants: Vec<String>,
    /// Relative traffic allocation per variant; missing entries count as 1.
    #[serde(default)]
    pub weights: Vec<f64>,
    /// Declared winner, if the experiment has been concluded.
    #[serde(default)]
    pub winner: Option<String>,
}

impl ExperimentConfig {
    pub fn new(id: impl Into<String>, variants: Vec<String>) -> Self {
        ExperimentConfig {
            id: id.into(),
            name: None,
            variants,
            weights: Vec::new(),
            winner: None,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ExperimentConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Configured name, or the id title-cased (`"button_color"` → `"Button Color"`).
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        self.id
            .split(['_', '-', ' '])
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn weight(&self, index: usize) -> f64 {
        self.weights.get(index).copied().unwrap_or(1.0)
    }

    pub fn is_active(&self) -> bool {
        self.winner.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(BayesError::InvalidConfig(
                "experiment id must not be empty".to_string(),
            ));
        }
        if self.variants.is_empty() || self.variants.len() > MAX_VARIANTS {
            return Err(BayesError::UnsupportedVariantCount(self.variants.len()));
        }
        let mut seen = HashSet::new();
        for v in &self.variants {
            if !seen.insert(v.as_str()) {
                return Err(BayesError::DuplicateVariant(v.clone()));
            }
        }
        if self.weights.len() > self.variants.len() {
            return Err(BayesError::InvalidConfig(format!(
                "{} weights given for {} variants",
                self.weights.len(),
                self.variants.len()
            )));
        }
        if let Some(w) = self.weights.iter().find(|w| !(w.is_finite() && **w > 0.0)) {
            return Err(BayesError::InvalidConfig(format!(
                "weights must be positive, got {}",
                w
            )));
        }
        if let Some(winner) = &self.winner {
            if !self.variants.contains(winner) {
                return Err(BayesError::InvalidConfig(format!(
                    "winner {} is not a variant of experiment {}",
                    winner, self.id
                )));
            }
        }
        Ok(())
    }

    /// Traffic allocation in percent. The last variant takes the complement
    /// so the shares add up to exactly 100.
    pub fn allocation_shares(&self) -> Vec<f64> {
        let n = self.variants.len();
        if n == 0 {
            return Vec::new();
        }
        let total: f64 = (0..n).map(|i| self.weight(i)).sum();
        let mut shares = Vec::with_capacity(n);
        let mut assigned = 0.0;
        for i in 0..n - 1 {
            let share = 100.0 * self.weight(i) / total;
            assigned += share;
            shares.push(share);
        }
        shares.push(100.0 - assigned);
        shares
    }

    /// Orders observations by the configured variants.
    ///
    /// Variants without an observation get empty counts; observations for
    /// variants the experiment does not define are rejected.
    pub fn align(&self, observations: &[VariantObservation]) -> Result<Vec<VariantObservation>> {
        for o in observations {
            if !self.variants.contains(&o.variant) {
                return Err(BayesError::UnknownVariant(o.variant.clone()));
            }
        }
        self.variants
            .iter()
            .map(|v| {
                let mut matching = observations.iter().filter(|o| &o.variant == v);
                match (matching.next(), matching.next()) {
                    (Some(_), Some(_)) => Err(BayesError::DuplicateVariant(v.clone())),
                    (Some(o), None) => Ok(o.clone()),
                    (None, _) => Ok(VariantObservation::empty(v.clone())),
                }
            })
            .collect()
    }
}
