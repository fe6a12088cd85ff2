//! The capability set every auction participant exposes, plus the learning
//! core shared by bidding and negotiating agents.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::advisory::AdvisoryConfig;
use crate::error::AgentError;
use crate::estimator::{BidEstimator, EstimatorConfig, EstimatorError};
use crate::market::{Bid, InvalidBid, MarketState, STATE_FEATURES};
use crate::negotiation::Negotiator;
use crate::outcome::RoundOutcome;
use crate::reward::bound_reward;
use crate::strategy::ExplorationPolicy;

/// Private valuation factors are drawn from this range when not configured.
pub const VALUATION_RANGE: (f64, f64) = (0.9, 1.4);

/// Kind of participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantKind {
    /// Single sealed bid per round.
    Bidder,
    /// Bounded counter-offer exchange per round.
    Negotiator,
}

/// Where an agent is in its per-round cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPhase {
    /// Waiting for the next round.
    Idle,
    /// Computing a bid.
    Bidding,
    /// Bid submitted, outcome not yet observed.
    AwaitingOutcome,
    /// Outcome observed and learned from.
    Learned,
}

/// Result of feeding a round outcome to an agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LearnStatus {
    /// The estimator took one gradient step.
    Learned {
        /// Clipped prediction error that drove the step.
        error: f64,
    },
    /// The estimator diverged and was reset to its initial weights.
    Reset,
    /// The update was rejected; statistics were still recorded.
    Skipped,
    /// This round was already learned from.
    Duplicate,
    /// The agent has no bid on record for this round.
    NotParticipating,
}

/// Cumulative per-agent statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    /// Rounds won.
    pub rounds_won: u32,
    /// Sum of clearing prices paid.
    pub total_spend: f64,
    /// Valid bids placed.
    pub bids_placed: u32,
    /// Rounds that ended in a non-bid.
    pub non_bids: u32,
    /// Bounded reward per learned round, in order.
    pub reward_history: Vec<f64>,
    /// Advisory calls attempted.
    pub advisory_calls: u32,
    /// Advisory calls that failed or timed out.
    pub advisory_failures: u32,
    /// Times the estimator was reset after diverging.
    pub estimator_resets: u32,
}

impl AgentStats {
    /// Sum of all recorded rewards.
    #[must_use]
    pub fn total_reward(&self) -> f64 {
        self.reward_history.iter().sum()
    }
}

/// Settings shared by every agent kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Estimator hyper-parameters.
    pub estimator: EstimatorConfig,
    /// Exploration policy.
    pub exploration: ExplorationPolicy,
    /// Advisory settings (used only when AI is enabled).
    pub advisory: AdvisoryConfig,
    /// Fixed private valuation factor; drawn from the seed when unset.
    pub valuation_factor: Option<f64>,
    /// Total spend allowed over the run; unlimited when unset.
    pub budget: Option<f64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            estimator: EstimatorConfig::default(),
            exploration: ExplorationPolicy::default(),
            advisory: AdvisoryConfig::default(),
            valuation_factor: None,
            budget: None,
        }
    }
}

impl AgentConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), AgentError> {
        self.estimator.validate().map_err(AgentError::Config)?;
        self.exploration.validate().map_err(AgentError::Config)?;
        self.advisory.validate().map_err(AgentError::Config)?;
        if let Some(factor) = self.valuation_factor {
            if !(factor.is_finite() && factor > 0.0) {
                return Err(AgentError::Config(
                    "valuation_factor must be a positive number".to_string(),
                ));
            }
        }
        if let Some(budget) = self.budget {
            if !(budget.is_finite() && budget >= 0.0) {
                return Err(AgentError::Config(
                    "budget must be a non-negative number".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Capability set the simulation drives every round.
#[async_trait]
pub trait Participant: Send {
    /// Unique name within a run.
    fn name(&self) -> &str;

    /// Participant kind.
    fn kind(&self) -> ParticipantKind;

    /// Whether the LLM advisory is enabled for this participant.
    fn ai_enabled(&self) -> bool {
        false
    }

    /// Private valuation of the item in the given state.
    fn valuation(&self, state: &MarketState) -> f64;

    /// Decide a sealed bid for the state.
    async fn decide_bid(&mut self, state: &MarketState) -> Bid;

    /// Learn from a resolved round. Safe to call more than once per round.
    fn observe_outcome(&mut self, outcome: &RoundOutcome) -> LearnStatus;

    /// Close the round once every participant has observed it.
    fn finish_round(&mut self) {}

    /// Current value estimate for a state.
    fn estimate(&self, state: &MarketState) -> Result<f64, EstimatorError>;

    /// Cumulative statistics.
    fn stats(&self) -> &AgentStats;

    /// Current phase.
    fn phase(&self) -> AgentPhase;

    /// Negotiation capability, if this participant has one.
    fn as_negotiator(&mut self) -> Option<&mut dyn Negotiator> {
        None
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingBid {
    state: MarketState,
    greedy_markup: f64,
    bid: Bid,
}

/// State and learning rule shared by all agent kinds.
///
/// The estimator predicts a markup `m` over the round price; the greedy bid
/// is `price × (1 + m)`. Updates are expressed in the same price-relative
/// units.
#[derive(Debug)]
pub(crate) struct AgentCore {
    pub(crate) name: String,
    pub(crate) estimator: BidEstimator,
    pub(crate) stats: AgentStats,
    pub(crate) phase: AgentPhase,
    pub(crate) rng: StdRng,
    pub(crate) decisions: u64,
    pub(crate) exploration: ExplorationPolicy,
    valuation_factor: f64,
    budget: Option<f64>,
    pending: Option<PendingBid>,
    last_learned: Option<u32>,
}

impl AgentCore {
    pub(crate) fn new(name: String, config: &AgentConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let estimator_seed = rng.gen_range(0..u64::MAX);
        let valuation_factor = config
            .valuation_factor
            .unwrap_or_else(|| rng.gen_range(VALUATION_RANGE.0..=VALUATION_RANGE.1));

        Self {
            name,
            estimator: BidEstimator::new(STATE_FEATURES, config.estimator.clone(), estimator_seed),
            stats: AgentStats::default(),
            phase: AgentPhase::Idle,
            rng,
            decisions: 0,
            exploration: config.exploration,
            valuation_factor,
            budget: config.budget,
            pending: None,
            last_learned: None,
        }
    }

    pub(crate) fn valuation(&self, state: &MarketState) -> f64 {
        state.price * self.valuation_factor
    }

    pub(crate) fn remaining_budget(&self) -> Option<f64> {
        self.budget.map(|b| (b - self.stats.total_spend).max(0.0))
    }

    /// Greedy markup for a state, resetting the estimator if it produced a
    /// non-finite value.
    pub(crate) fn greedy_markup(&mut self, state: &MarketState) -> f64 {
        match self.estimator.estimate(&state.features()) {
            Ok(m) if m.is_finite() => m,
            Ok(_) => {
                warn!(agent = %self.name, "estimator produced a non-finite value, resetting");
                self.reset_estimator();
                self.estimator.estimate(&state.features()).unwrap_or(0.0)
            }
            Err(e) => {
                warn!(agent = %self.name, error = %e, "estimate failed, using zero markup");
                0.0
            }
        }
    }

    /// Explore around the greedy bid for a state.
    pub(crate) fn explore(&mut self, greedy: f64, state: &MarketState) -> f64 {
        let step = self.decisions;
        self.exploration.perturb(greedy, state.price, step, &mut self.rng)
    }

    /// Validate, cap and record the bid for this round.
    pub(crate) fn finish_bid(&mut self, state: &MarketState, greedy_markup: f64, raw: f64) -> Bid {
        let bid = match self.remaining_budget() {
            Some(left) if left <= 0.0 => Bid::non_bid(InvalidBid::BudgetExhausted),
            Some(left) => Bid::checked(raw.min(left)),
            None => Bid::checked(raw),
        };
        self.record(state, greedy_markup, bid)
    }

    pub(crate) fn record(&mut self, state: &MarketState, greedy_markup: f64, bid: Bid) -> Bid {
        if let Some(reason) = bid.rejected {
            self.stats.non_bids += 1;
            debug!(agent = %self.name, %reason, "non-bid");
        } else {
            self.stats.bids_placed += 1;
        }
        self.decisions += 1;
        self.pending = Some(PendingBid {
            state: *state,
            greedy_markup,
            bid,
        });
        self.phase = AgentPhase::AwaitingOutcome;
        bid
    }

    /// `Learned` returns to `Idle`; any other phase is left alone.
    pub(crate) fn finish_round(&mut self) {
        if self.phase == AgentPhase::Learned {
            self.phase = AgentPhase::Idle;
        }
    }

    pub(crate) fn reset_estimator(&mut self) {
        self.estimator.reset();
        self.stats.estimator_resets += 1;
    }

    pub(crate) fn learn(&mut self, outcome: &RoundOutcome) -> LearnStatus {
        if self.last_learned.is_some_and(|r| r >= outcome.round) {
            debug!(agent = %self.name, round = outcome.round, "outcome already learned");
            return LearnStatus::Duplicate;
        }
        let Some(entry) = outcome.entry_for(&self.name) else {
            return LearnStatus::NotParticipating;
        };
        let Some(pending) = self.pending.take() else {
            return LearnStatus::NotParticipating;
        };

        let reward = bound_reward(entry.reward);
        self.stats.reward_history.push(reward);
        if outcome.is_winner(&self.name) {
            self.stats.rounds_won += 1;
            self.stats.total_spend += outcome.clearing_price;
        }
        self.last_learned = Some(outcome.round);
        self.phase = AgentPhase::Learned;

        let price = pending.state.price;
        let (actual, scaled_reward) = if pending.bid.is_valid() && price > 0.0 {
            (pending.bid.amount / price - 1.0, reward / price)
        } else {
            // Nothing to reinforce: a zero-error step on the greedy markup.
            (pending.greedy_markup, 0.0)
        };

        match self
            .estimator
            .update(&pending.state.features(), actual, scaled_reward)
        {
            Ok(error) => {
                debug!(
                    agent = %self.name,
                    round = outcome.round,
                    reward,
                    error,
                    "estimator updated"
                );
                LearnStatus::Learned { error }
            }
            Err(EstimatorError::Diverged) => {
                warn!(agent = %self.name, round = outcome.round, "estimator diverged, resetting");
                self.reset_estimator();
                LearnStatus::Reset
            }
            Err(e) => {
                warn!(agent = %self.name, round = outcome.round, error = %e, "estimator update rejected");
                LearnStatus::Skipped
            }
        }
    }
}
