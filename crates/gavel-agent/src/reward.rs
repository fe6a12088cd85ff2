//! Surplus-based reward shaping.

use serde::{Deserialize, Serialize};

/// Rewards handed to estimators are clamped to `[-REWARD_BOUND, REWARD_BOUND]`.
pub const REWARD_BOUND: f64 = 1000.0;

/// Reward assigned to a participant for one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardPolicy {
    /// Penalty for a valid bid that did not win. Zero means losing is neutral.
    pub loss_penalty: f64,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self { loss_penalty: 0.0 }
    }
}

impl RewardPolicy {
    /// Winner's reward: private valuation minus the clearing price.
    #[must_use]
    pub fn win(&self, valuation: f64, clearing_price: f64) -> f64 {
        bound_reward(valuation - clearing_price)
    }

    /// Reward for a valid bid that lost.
    #[must_use]
    pub fn loss(&self) -> f64 {
        bound_reward(-self.loss_penalty.abs())
    }

    /// Reward for a non-bid or a failed negotiation.
    #[must_use]
    pub const fn no_bid(&self) -> f64 {
        0.0
    }

    /// Validate the policy.
    pub fn validate(&self) -> Result<(), String> {
        if self.loss_penalty.is_finite() && self.loss_penalty >= 0.0 {
            Ok(())
        } else {
            Err("loss_penalty must be a non-negative number".to_string())
        }
    }
}

/// Clamp a reward into the range estimators are stable for.
///
/// Non-finite rewards collapse to zero.
#[must_use]
pub fn bound_reward(reward: f64) -> f64 {
    if reward.is_finite() {
        reward.clamp(-REWARD_BOUND, REWARD_BOUND)
    } else {
        0.0
    }
}
