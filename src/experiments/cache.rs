//! Optional memoization of comparator results.
//!
//! The engine consults a [`ProbabilityCache`] when one is injected and
//! caching is enabled. Comparators are pure, so a cached value is always
//! the value the comparator would have returned for the same key.

use std::fmt;

use dashmap::DashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    ProbBBeatsA,
    ProbCBeatsAAndB,
    LevelProb1Beats2,
    LevelProb1Beats2And3,
}

impl Comparator {
    pub fn name(&self) -> &'static str {
        match self {
            Comparator::ProbBBeatsA => "prob_b_beats_a",
            Comparator::ProbCBeatsAAndB => "prob_c_beats_a_and_b",
            Comparator::LevelProb1Beats2 => "level_prob_1_beats_2",
            Comparator::LevelProb1Beats2And3 => "level_prob_1_beats_2_and_3",
        }
    }
}

/// Comparator identity plus its arguments, in call order.
///
/// Count arguments are kept exactly. Real arguments are rounded to
/// `decimals` places and stored as scaled integers so that keys hash and
/// compare without floating-point equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    comparator: Comparator,
    args: Vec<i64>,
    decimals: u32,
}

impl CacheKey {
    pub fn counts(comparator: Comparator, args: &[u64]) -> Self {
        Self {
            comparator,
            args: args
                .iter()
                .map(|&a| i64::try_from(a).unwrap_or(i64::MAX))
                .collect(),
            decimals: 0,
        }
    }

    pub fn reals(comparator: Comparator, args: &[f64], decimals: u32) -> Self {
        let scale = 10f64.powi(decimals as i32);
        Self {
            comparator,
            // `as` saturates at the i64 bounds.
            args: args.iter().map(|&a| (a * scale).round() as i64).collect(),
            decimals,
        }
    }

    pub fn comparator(&self) -> Comparator {
        self.comparator
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flapjack_bayes/{}", self.comparator.name())?;
        if self.decimals == 0 {
            for a in &self.args {
                write!(f, "/{}", a)?;
            }
        } else {
            let scale = 10f64.powi(self.decimals as i32);
            let precision = self.decimals as usize;
            for a in &self.args {
                write!(f, "/{:.*}", precision, *a as f64 / scale)?;
            }
        }
        Ok(())
    }
}

/// Storage port for comparator results.
pub trait ProbabilityCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<f64>;
    fn put(&self, key: CacheKey, value: f64);
}

/// In-process cache backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<CacheKey, f64>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl ProbabilityCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<f64> {
        self.entries.get(key).map(|v| *v)
    }

    fn put(&self, key: CacheKey, value: f64) {
        self.entries.insert(key, value);
    }
}
