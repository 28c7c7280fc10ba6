//! Bayesian win probabilities for experiments with up to three variants.
//!
//! Conversion rates are compared through closed-form Beta-posterior sums and
//! continuous outcomes through Gamma-posterior sums. All sums run in log
//! space. The entry point most callers want is [`compute_win_probabilities`];
//! [`WinProbabilityEngine`] adds configuration, memoization and per-variant
//! reporting rows.

pub mod error;
pub mod experiments;
pub mod types;

pub use error::{BayesError, Result};
pub use experiments::cache::{CacheKey, MemoryCache, ProbabilityCache};
pub use experiments::config::{EngineConfig, ExperimentConfig};
pub use experiments::level::{level_prob_1_beats_2, level_prob_1_beats_2_and_3};
pub use experiments::posterior::derive_beta_posterior;
pub use experiments::results::{
    compute_win_probabilities, ExperimentResults, VariantSummary, WinProbabilityEngine,
};
pub use experiments::stats::{prob_b_beats_a, prob_c_beats_a_and_b};
pub use types::{
    BetaPosterior, ComparisonMode, VariantId, VariantObservation, WeightedValue, WinProbabilities,
};
