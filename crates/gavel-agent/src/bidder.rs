//! Sealed-bid agent with online bid estimation and optional LLM advice.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::advisory::{
    AdvisoryConfig, AdvisoryRequest, Advisor, CircuitBreaker, blend, consult,
};
use crate::estimator::EstimatorError;
use crate::market::{Bid, MarketState};
use crate::outcome::RoundOutcome;
use crate::participant::{
    AgentConfig, AgentCore, AgentPhase, AgentStats, LearnStatus, Participant, ParticipantKind,
};

/// A participant that submits one sealed bid per round.
pub struct BiddingAgent {
    core: AgentCore,
    ai_enabled: bool,
    advisor: Option<Arc<dyn Advisor>>,
    advisory: AdvisoryConfig,
    breaker: CircuitBreaker,
}

impl std::fmt::Debug for BiddingAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BiddingAgent")
            .field("name", &self.core.name)
            .field("ai_enabled", &self.ai_enabled)
            .field("has_advisor", &self.advisor.is_some())
            .field("phase", &self.core.phase)
            .finish_non_exhaustive()
    }
}

impl BiddingAgent {
    /// Creates a bidding agent.
    ///
    /// `seed` drives the estimator initialisation, the private valuation and
    /// exploration, so two agents built with the same arguments behave
    /// identically.
    #[must_use]
    pub fn new(name: impl Into<String>, ai_enabled: bool, config: &AgentConfig, seed: u64) -> Self {
        Self {
            core: AgentCore::new(name.into(), config, seed),
            ai_enabled,
            advisor: None,
            advisory: config.advisory.clone(),
            breaker: CircuitBreaker::from_config(&config.advisory),
        }
    }

    /// Attach the advisory service consulted when AI is enabled.
    #[must_use]
    pub fn with_advisor(mut self, advisor: Arc<dyn Advisor>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    /// Private valuation factor relative to the price level.
    #[must_use]
    pub fn valuation_factor(&self) -> f64 {
        self.core.valuation(&MarketState::new(1.0, 0.0))
    }

    async fn advise(&mut self, state: &MarketState, local: f64) -> f64 {
        let Some(advisor) = self.advisor.clone() else {
            return local;
        };
        if !local.is_finite() || local <= 0.0 {
            return local;
        }
        if !self.breaker.allow() {
            debug!(agent = %self.core.name, "advisory breaker open, skipping");
            return local;
        }

        let request = AdvisoryRequest::for_bid(&self.core.name, state, local, &self.advisory);
        self.core.stats.advisory_calls += 1;
        match consult(advisor.as_ref(), &request, &self.advisory).await {
            Ok(advice) => {
                self.breaker.record_success();
                let advised = blend(local, advice, self.advisory.weight);
                debug!(
                    agent = %self.core.name,
                    factor = advice.factor,
                    local,
                    advised,
                    "advisory applied"
                );
                advised
            }
            Err(e) => {
                self.breaker.record_failure();
                self.core.stats.advisory_failures += 1;
                warn!(agent = %self.core.name, error = %e, "advisory unavailable, using local bid");
                local
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }
}

#[async_trait]
impl Participant for BiddingAgent {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn kind(&self) -> ParticipantKind {
        ParticipantKind::Bidder
    }

    fn ai_enabled(&self) -> bool {
        self.ai_enabled
    }

    fn valuation(&self, state: &MarketState) -> f64 {
        self.core.valuation(state)
    }

    async fn decide_bid(&mut self, state: &MarketState) -> Bid {
        self.core.phase = AgentPhase::Bidding;
        let markup = self.core.greedy_markup(state);
        let greedy = state.price * (1.0 + markup);
        let explored = self.core.explore(greedy, state);
        let bid = if self.ai_enabled {
            self.advise(state, explored).await
        } else {
            explored
        };
        self.core.finish_bid(state, markup, bid)
    }

    fn observe_outcome(&mut self, outcome: &RoundOutcome) -> LearnStatus {
        self.core.learn(outcome)
    }

    fn finish_round(&mut self) {
        self.core.finish_round();
    }

    fn estimate(&self, state: &MarketState) -> Result<f64, EstimatorError> {
        self.core.estimator.estimate(&state.features())
    }

    fn stats(&self) -> &AgentStats {
        &self.core.stats
    }

    fn phase(&self) -> AgentPhase {
        self.core.phase
    }
}
