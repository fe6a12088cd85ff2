//! Exploration policies for bid selection.
//!
//! An exploration policy perturbs the greedy bid so agents keep sampling
//! prices they would not otherwise try.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// How an agent perturbs its greedy bid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExplorationPolicy {
    /// Always bid the greedy value.
    Greedy,
    /// Add uniform noise in `[-scale, scale] × price` every round.
    AdditiveNoise {
        /// Noise half-width relative to the price level.
        scale: f64,
    },
    /// With probability ε, scale the bid by a random factor.
    EpsilonGreedy {
        /// Initial exploration probability.
        epsilon: f64,
        /// Multiplicative decay applied per decision.
        decay: f64,
        /// Floor for the exploration probability.
        min_epsilon: f64,
        /// Exploratory bids are scaled by a factor in `[1 - spread, 1 + spread]`.
        spread: f64,
    },
}

impl Default for ExplorationPolicy {
    fn default() -> Self {
        Self::EpsilonGreedy {
            epsilon: 0.3,
            decay: 0.95,
            min_epsilon: 0.02,
            spread: 0.25,
        }
    }
}

impl ExplorationPolicy {
    /// Exploration probability after `step` decisions.
    ///
    /// Greedy is always 0 and additive noise always 1.
    #[must_use]
    pub fn epsilon_at(&self, step: u64) -> f64 {
        match self {
            Self::Greedy => 0.0,
            Self::AdditiveNoise { .. } => 1.0,
            Self::EpsilonGreedy {
                epsilon,
                decay,
                min_epsilon,
                ..
            } => {
                let exponent = i32::try_from(step).unwrap_or(i32::MAX);
                (epsilon * decay.powi(exponent)).max(*min_epsilon).clamp(0.0, 1.0)
            }
        }
    }

    /// Apply the policy to a greedy bid.
    ///
    /// # Arguments
    /// * `greedy` - The estimator-derived bid
    /// * `price` - Current price level, used to scale additive noise
    /// * `step` - Number of decisions the agent has made so far
    /// * `rng` - The agent's own random source
    pub fn perturb<R: Rng>(&self, greedy: f64, price: f64, step: u64, rng: &mut R) -> f64 {
        match self {
            Self::Greedy => greedy,
            Self::AdditiveNoise { scale } => {
                let width = (scale * price).abs();
                if width > 0.0 && width.is_finite() {
                    greedy + rng.gen_range(-width..=width)
                } else {
                    greedy
                }
            }
            Self::EpsilonGreedy { spread, .. } => {
                let epsilon = self.epsilon_at(step);
                if epsilon > 0.0 && rng.gen_bool(epsilon) && *spread > 0.0 {
                    greedy * rng.gen_range((1.0 - spread)..=(1.0 + spread))
                } else {
                    greedy
                }
            }
        }
    }

    /// Validate the policy parameters.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Greedy => Ok(()),
            Self::AdditiveNoise { scale } => {
                if scale.is_finite() && *scale >= 0.0 {
                    Ok(())
                } else {
                    Err("additive noise scale must be non-negative".to_string())
                }
            }
            Self::EpsilonGreedy {
                epsilon,
                decay,
                min_epsilon,
                spread,
            } => {
                let unit = |v: f64| (0.0..=1.0).contains(&v);
                if !unit(*epsilon) || !unit(*decay) || !unit(*min_epsilon) {
                    return Err("epsilon, decay and min_epsilon must be within [0, 1]".to_string());
                }
                if !(spread.is_finite() && (0.0..1.0).contains(spread)) {
                    return Err("exploration spread must be within [0, 1)".to_string());
                }
                Ok(())
            }
        }
    }
}
