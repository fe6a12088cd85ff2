//! The auction simulation loop.
//!
//! Rounds run strictly in sequence: build the market state, collect one bid
//! per participant in insertion order, resolve the round, then let every
//! participant learn from the outcome before the next round starts.

use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use gavel_agent::{
    Advisor, AgentError, BiddingAgent, MarketState, NegotiationAgent, Participant, RoundOutcome,
    SellerDesk, run_exchange,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::market::MarketGenerator;
use crate::round::{Submission, resolve_round};
use crate::summary::{RosterEntry, RunReport, SimulationSummary, summarize};
use crate::visualize::{TrendVisualizer, render_trends};

/// Fixed states used for estimator diagnostics after a run.
pub const SAMPLE_STATES: [MarketState; 3] = [
    MarketState::new(100.0, 10.0),
    MarketState::new(80.0, 5.0),
    MarketState::new(50.0, 1.0),
];

const MARKET_STREAM: u64 = u64::MAX;

/// Derive an independent seed for a stream (agent index or market).
#[must_use]
pub const fn derive_seed(seed: u64, stream: u64) -> u64 {
    // splitmix64 finaliser over the combined input.
    let mut z = seed ^ stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Estimator outputs of one participant for [`SAMPLE_STATES`] or any other
/// set of states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateSample {
    /// Participant name.
    pub agent: String,
    /// States that were sampled.
    pub states: Vec<MarketState>,
    /// Estimate per state, in the same order.
    pub estimates: Vec<f64>,
}

/// Orchestrates participants over a fixed number of rounds.
pub struct AuctionSimulation {
    participants: Vec<Box<dyn Participant>>,
    config: SimulationConfig,
    market: MarketGenerator,
    history: Vec<RoundOutcome>,
    run_id: Uuid,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for AuctionSimulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuctionSimulation")
            .field("run_id", &self.run_id)
            .field("participants", &self.participant_names())
            .field("rounds", &self.config.rounds)
            .field("completed", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl AuctionSimulation {
    /// Creates a simulation over the given participants.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty, names repeat, or the
    /// configuration is invalid.
    pub fn new(
        participants: Vec<Box<dyn Participant>>,
        config: SimulationConfig,
    ) -> Result<Self, SimulationError> {
        if participants.is_empty() {
            return Err(SimulationError::NoParticipants);
        }
        let mut seen = HashSet::new();
        for participant in &participants {
            if !seen.insert(participant.name()) {
                return Err(SimulationError::DuplicateName(participant.name().to_string()));
            }
        }
        if config.rounds == 0 {
            return Err(SimulationError::Config("rounds must be positive".to_string()));
        }
        config.market.validate()?;
        config.reward.validate().map_err(SimulationError::Config)?;

        let market = MarketGenerator::new(
            config.market.clone(),
            config.rounds,
            derive_seed(config.seed, MARKET_STREAM),
        );

        Ok(Self {
            participants,
            config,
            market,
            history: Vec::new(),
            run_id: Uuid::new_v4(),
            started_at: None,
            finished_at: None,
        })
    }

    /// Builds the roster described by the configuration.
    ///
    /// Bidding agents are named `Agent 1..=n`, negotiators `Negotiator 1..=k`
    /// and come after the bidders. The advisor is attached only when AI is
    /// enabled; without one every agent runs locally.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn from_config(
        config: SimulationConfig,
        advisor: Option<Arc<dyn Advisor>>,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        let ai_enabled = config.ai_enabled && advisor.is_some();

        let mut participants: Vec<Box<dyn Participant>> =
            Vec::with_capacity(config.agents + config.negotiators);
        for i in 0..config.agents {
            let seed = derive_seed(config.seed, i as u64);
            let mut agent = BiddingAgent::new(format!("Agent {}", i + 1), ai_enabled, &config.agent, seed);
            if let Some(advisor) = advisor.as_ref().filter(|_| ai_enabled) {
                agent = agent.with_advisor(Arc::clone(advisor));
            }
            participants.push(Box::new(agent));
        }
        for j in 0..config.negotiators {
            let seed = derive_seed(config.seed, (config.agents + j) as u64);
            participants.push(Box::new(NegotiationAgent::new(
                format!("Negotiator {}", j + 1),
                &config.agent,
                config.negotiation.buyer.clone(),
                seed,
            )));
        }

        Self::new(participants, config)
    }

    /// Run every remaining round.
    ///
    /// # Errors
    ///
    /// Never fails for an uncancelled run; see [`Self::run`].
    pub async fn run_simulation(&mut self) -> Result<&[RoundOutcome], SimulationError> {
        self.run(&CancellationToken::new()).await
    }

    /// Run every remaining round, stopping between rounds when `cancel`
    /// fires. A cancelled run keeps the rounds already completed and can be
    /// resumed by calling `run` again.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Cancelled`] if the token fired.
    pub async fn run(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<&[RoundOutcome], SimulationError> {
        let start = self.completed_rounds();
        if start == 0 {
            self.started_at = Some(Utc::now());
        }
        info!(
            run_id = %self.run_id,
            participants = self.participants.len(),
            rounds = self.config.rounds,
            seed = self.config.seed,
            "starting simulation"
        );

        for round in start..self.config.rounds {
            if cancel.is_cancelled() {
                info!(run_id = %self.run_id, completed_rounds = round, "simulation cancelled");
                return Err(SimulationError::Cancelled {
                    completed_rounds: round,
                });
            }
            let outcome = self.play_round(round).await;
            self.history.push(outcome);
            // Give signal handlers a chance to run on single-threaded runtimes.
            tokio::task::yield_now().await;
        }

        if self.finished_at.is_none() {
            self.finished_at = Some(Utc::now());
        }
        info!(run_id = %self.run_id, rounds = self.history.len(), "simulation finished");
        Ok(&self.history)
    }

    async fn play_round(&mut self, round: u32) -> RoundOutcome {
        let state = self.market.next_state(round);
        let max_responses = self.config.negotiation.max_responses;

        let mut submissions = Vec::with_capacity(self.participants.len());
        for participant in &mut self.participants {
            let valuation = participant.valuation(&state);
            let bid = if let Some(negotiator) = participant.as_negotiator() {
                let mut desk = SellerDesk::new(self.config.negotiation.seller.clone());
                let exchange = run_exchange(&mut *negotiator, &mut desk, &state, max_responses);
                negotiator.settle(&state, &exchange)
            } else {
                participant.decide_bid(&state).await
            };
            submissions.push(Submission {
                agent: participant.name().to_string(),
                bid,
                valuation,
            });
        }

        let outcome = resolve_round(round, state, submissions, &self.config.reward);
        debug!(
            round,
            price = state.price,
            winner = ?outcome.winner_entry().map(|e| e.agent.as_str()),
            clearing_price = outcome.clearing_price,
            status = ?outcome.status,
            "round resolved"
        );

        for participant in &mut self.participants {
            let status = participant.observe_outcome(&outcome);
            debug!(agent = %participant.name(), round, ?status, "outcome observed");
        }
        for participant in &mut self.participants {
            participant.finish_round();
        }

        outcome
    }

    /// Rounds fully resolved so far.
    #[must_use]
    pub fn completed_rounds(&self) -> u32 {
        self.history.len() as u32
    }

    /// Round history, in order.
    #[must_use]
    pub fn history(&self) -> &[RoundOutcome] {
        &self.history
    }

    /// Participants, in insertion order.
    #[must_use]
    pub fn participants(&self) -> &[Box<dyn Participant>] {
        &self.participants
    }

    /// Participant names, in insertion order.
    #[must_use]
    pub fn participant_names(&self) -> Vec<&str> {
        self.participants.iter().map(|p| p.name()).collect()
    }

    /// Configuration the simulation runs with.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Summarise the history so far.
    #[must_use]
    pub fn summarize_results(&self) -> SimulationSummary {
        summarize(&self.history, &self.roster())
    }

    /// Summary plus run metadata.
    #[must_use]
    pub fn report(&self) -> RunReport {
        RunReport {
            run_id: self.run_id,
            seed: self.config.seed,
            started_at: self.started_at,
            finished_at: self.finished_at,
            summary: self.summarize_results(),
        }
    }

    fn roster(&self) -> Vec<RosterEntry> {
        self.participants
            .iter()
            .map(|p| RosterEntry {
                name: p.name().to_string(),
                kind: p.kind(),
                ai_enabled: p.ai_enabled(),
            })
            .collect()
    }

    /// Estimator outputs of every participant for the given states.
    ///
    /// # Errors
    ///
    /// Returns an error if any estimate fails.
    pub fn sample_estimates(
        &self,
        states: &[MarketState],
    ) -> Result<Vec<EstimateSample>, SimulationError> {
        self.participants
            .iter()
            .map(|participant| -> Result<EstimateSample, SimulationError> {
                let estimates = states
                    .iter()
                    .map(|state| participant.estimate(state).map_err(AgentError::from))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(EstimateSample {
                    agent: participant.name().to_string(),
                    states: states.to_vec(),
                    estimates,
                })
            })
            .collect()
    }

    /// Trend visualiser, available only when visualisation is enabled.
    #[must_use]
    pub fn trend_visualizer(&self) -> Option<&dyn TrendVisualizer> {
        if self.config.visualize {
            Some(self)
        } else {
            None
        }
    }
}

impl TrendVisualizer for AuctionSimulation {
    fn visualize_bidding_trends(&self, out: &mut dyn Write) -> Result<(), SimulationError> {
        render_trends(&self.history, &self.participant_names(), out)
    }
}
