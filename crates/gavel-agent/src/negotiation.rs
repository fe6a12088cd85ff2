//! Bounded counter-offer negotiation.
//!
//! Instead of a single sealed bid, a negotiating participant haggles with the
//! auctioneer's [`SellerDesk`] for a price, and the agreed price becomes its
//! sealed bid for the round. [`run_exchange`] alternates offers between the
//! two parties and always stops after a fixed number of responses.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AgentError;
use crate::estimator::EstimatorError;
use crate::market::{Bid, InvalidBid, MarketState};
use crate::outcome::RoundOutcome;
use crate::participant::{
    AgentConfig, AgentCore, AgentPhase, AgentStats, LearnStatus, Participant, ParticipantKind,
};

/// Answer to an offer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "response", content = "amount", rename_all = "snake_case")]
pub enum Response {
    /// Take the offer as-is.
    Accept,
    /// Propose a different price.
    Counter(f64),
    /// Walk away.
    Reject,
}

/// Side of a negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    /// The participant buying the item.
    Buyer,
    /// The auctioneer's desk.
    Seller,
}

/// Phase of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationPhase {
    /// Opening positions are being posted.
    Proposing,
    /// Parties are trading counter-offers.
    Countering,
    /// A price was agreed.
    Agreed,
    /// A party walked away or the exchange limit was reached.
    Failed,
}

/// Either side of a negotiation.
pub trait NegotiationParty {
    /// Opening position for the round.
    fn propose(&mut self, state: &MarketState) -> f64;

    /// Answer the other side's latest offer.
    fn respond(&mut self, counter_offer: f64) -> Response;
}

/// A participant that negotiates instead of bidding blind.
pub trait Negotiator: NegotiationParty + Send {
    /// Turn a finished exchange into this round's bid.
    fn settle(&mut self, state: &MarketState, exchange: &Exchange) -> Bid;
}

/// One message in an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Who made the offer.
    pub party: Party,
    /// Offered price.
    pub amount: f64,
}

/// Record of one negotiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    /// Offers in the order they were made.
    pub offers: Vec<Offer>,
    /// Final phase.
    pub phase: NegotiationPhase,
    /// Number of `respond` calls made.
    pub responses: u32,
    /// Agreed price, if any.
    pub agreed_price: Option<f64>,
}

impl Exchange {
    fn new() -> Self {
        Self {
            offers: Vec::new(),
            phase: NegotiationPhase::Proposing,
            responses: 0,
            agreed_price: None,
        }
    }

    fn push(&mut self, party: Party, amount: f64) {
        self.offers.push(Offer { party, amount });
    }

    fn fail(mut self) -> Self {
        self.phase = NegotiationPhase::Failed;
        self
    }

    /// Returns true if a price was agreed.
    #[must_use]
    pub const fn is_agreed(&self) -> bool {
        matches!(self.phase, NegotiationPhase::Agreed)
    }
}

/// Run a bounded exchange between a buyer and a seller.
///
/// Both sides post opening positions, then the seller answers the buyer's
/// offer and they alternate. The exchange ends on acceptance, rejection, a
/// non-finite or non-positive counter, or after `max_responses` answers.
pub fn run_exchange<B, S>(
    buyer: &mut B,
    seller: &mut S,
    state: &MarketState,
    max_responses: u32,
) -> Exchange
where
    B: NegotiationParty + ?Sized,
    S: NegotiationParty + ?Sized,
{
    let mut exchange = Exchange::new();

    let ask = seller.propose(state);
    exchange.push(Party::Seller, ask);
    let mut current = buyer.propose(state);
    exchange.push(Party::Buyer, current);
    if !current.is_finite() || current <= 0.0 {
        return exchange.fail();
    }

    exchange.phase = NegotiationPhase::Countering;
    let mut seller_turn = true;
    while exchange.responses < max_responses {
        exchange.responses += 1;
        let (response, party) = if seller_turn {
            (seller.respond(current), Party::Seller)
        } else {
            (buyer.respond(current), Party::Buyer)
        };

        match response {
            Response::Accept => {
                exchange.phase = NegotiationPhase::Agreed;
                exchange.agreed_price = Some(current);
                return exchange;
            }
            Response::Reject => return exchange.fail(),
            Response::Counter(next) => {
                if !next.is_finite() || next <= 0.0 {
                    return exchange.fail();
                }
                exchange.push(party, next);
                current = next;
                seller_turn = !seller_turn;
            }
        }
    }

    exchange.fail()
}

/// Terms the auctioneer's desk negotiates with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SellerTerms {
    /// Opening ask relative to the price level.
    pub ask_markup: f64,
    /// Lowest acceptable price relative to the price level.
    pub reserve_ratio: f64,
    /// Fraction of the gap between ask and reserve conceded per counter.
    pub concession: f64,
    /// Offers below `reserve × walk_away_ratio` are rejected outright.
    pub walk_away_ratio: f64,
}

impl Default for SellerTerms {
    fn default() -> Self {
        Self {
            ask_markup: 1.15,
            reserve_ratio: 0.9,
            concession: 0.3,
            walk_away_ratio: 0.5,
        }
    }
}

impl SellerTerms {
    /// Validate the terms.
    pub fn validate(&self) -> Result<(), AgentError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.ask_markup) || !positive(self.reserve_ratio) {
            return Err(AgentError::Config(
                "seller ask_markup and reserve_ratio must be positive".to_string(),
            ));
        }
        if self.reserve_ratio > self.ask_markup {
            return Err(AgentError::Config(
                "seller reserve_ratio cannot exceed ask_markup".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.concession) || !(0.0..=1.0).contains(&self.walk_away_ratio) {
            return Err(AgentError::Config(
                "seller concession and walk_away_ratio must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

/// The auctioneer's side of a negotiation.
#[derive(Debug, Clone, PartialEq)]
pub struct SellerDesk {
    terms: SellerTerms,
    ask: f64,
    reserve: f64,
}

impl SellerDesk {
    /// Creates a desk; the ask is set when the desk proposes.
    #[must_use]
    pub const fn new(terms: SellerTerms) -> Self {
        Self {
            terms,
            ask: 0.0,
            reserve: 0.0,
        }
    }

    /// Current ask.
    #[must_use]
    pub const fn ask(&self) -> f64 {
        self.ask
    }
}

impl NegotiationParty for SellerDesk {
    fn propose(&mut self, state: &MarketState) -> f64 {
        self.ask = state.price * self.terms.ask_markup;
        self.reserve = state.price * self.terms.reserve_ratio;
        self.ask
    }

    fn respond(&mut self, offer: f64) -> Response {
        if !offer.is_finite() {
            return Response::Reject;
        }
        if offer >= self.ask {
            return Response::Accept;
        }
        if offer < self.reserve * self.terms.walk_away_ratio {
            return Response::Reject;
        }
        self.ask = (self.ask - self.terms.concession * (self.ask - self.reserve)).max(self.reserve);
        if offer >= self.ask {
            Response::Accept
        } else {
            Response::Counter(self.ask)
        }
    }
}

/// Negotiation behaviour of a [`NegotiationAgent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiatorConfig {
    /// Opening offer relative to the agent's limit price.
    pub opening_ratio: f64,
    /// Fraction of the gap to the limit conceded per counter.
    pub concession: f64,
}

impl Default for NegotiatorConfig {
    fn default() -> Self {
        Self {
            opening_ratio: 0.8,
            concession: 0.25,
        }
    }
}

impl NegotiatorConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), AgentError> {
        if !(self.opening_ratio > 0.0 && self.opening_ratio <= 1.0) {
            return Err(AgentError::Config(
                "negotiator opening_ratio must be within (0, 1]".to_string(),
            ));
        }
        if !(self.concession > 0.0 && self.concession <= 1.0) {
            return Err(AgentError::Config(
                "negotiator concession must be within (0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Position {
    markup: f64,
    limit: f64,
    offer: f64,
}

/// A participant that reaches its bid through a counter-offer exchange.
///
/// Its estimator sets the limit price exactly the way a bidding agent sets
/// its bid; learning is identical.
#[derive(Debug)]
pub struct NegotiationAgent {
    core: AgentCore,
    config: NegotiatorConfig,
    position: Option<Position>,
}

impl NegotiationAgent {
    /// Creates a negotiation agent.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        agent: &AgentConfig,
        config: NegotiatorConfig,
        seed: u64,
    ) -> Self {
        Self {
            core: AgentCore::new(name.into(), agent, seed),
            config,
            position: None,
        }
    }

    /// Limit price for the current round, if a negotiation is open.
    #[must_use]
    pub fn limit(&self) -> Option<f64> {
        self.position.map(|p| p.limit)
    }
}

impl NegotiationParty for NegotiationAgent {
    fn propose(&mut self, state: &MarketState) -> f64 {
        self.core.phase = AgentPhase::Bidding;
        let markup = self.core.greedy_markup(state);
        let greedy = state.price * (1.0 + markup);
        let limit = self.core.explore(greedy, state).max(0.0);
        let offer = limit * self.config.opening_ratio;
        self.position = Some(Position {
            markup,
            limit,
            offer,
        });
        offer
    }

    fn respond(&mut self, counter_offer: f64) -> Response {
        let Some(position) = self.position.as_mut() else {
            return Response::Reject;
        };
        if !counter_offer.is_finite() {
            return Response::Reject;
        }
        if counter_offer <= position.limit {
            return Response::Accept;
        }
        let gap = position.limit - position.offer;
        if gap <= f64::EPSILON * position.limit.max(1.0) {
            return Response::Reject;
        }
        position.offer += self.config.concession * gap;
        Response::Counter(position.offer)
    }
}

impl Negotiator for NegotiationAgent {
    fn settle(&mut self, state: &MarketState, exchange: &Exchange) -> Bid {
        let markup = match self.position.take() {
            Some(position) => position.markup,
            None => self.core.greedy_markup(state),
        };
        debug!(
            agent = %self.core.name,
            phase = ?exchange.phase,
            responses = exchange.responses,
            price = ?exchange.agreed_price,
            "negotiation settled"
        );
        match exchange.agreed_price {
            Some(price) if exchange.is_agreed() => self.core.finish_bid(state, markup, price),
            _ => self.core.record(state, markup, Bid::non_bid(InvalidBid::NoDeal)),
        }
    }
}

#[async_trait]
impl Participant for NegotiationAgent {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn kind(&self) -> ParticipantKind {
        ParticipantKind::Negotiator
    }

    fn valuation(&self, state: &MarketState) -> f64 {
        self.core.valuation(state)
    }

    /// Without a counterparty the agent bids its limit price.
    async fn decide_bid(&mut self, state: &MarketState) -> Bid {
        self.core.phase = AgentPhase::Bidding;
        let markup = self.core.greedy_markup(state);
        let greedy = state.price * (1.0 + markup);
        let limit = self.core.explore(greedy, state);
        self.core.finish_bid(state, markup, limit)
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

    fn as_negotiator(&mut self) -> Option<&mut dyn Negotiator> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{BidEntry, RoundStatus};
    use crate::strategy::ExplorationPolicy;

    /// Scripted party for protocol tests.
    struct Scripted {
        opening: f64,
        responses: Vec<Response>,
    }

    impl NegotiationParty for Scripted {
        fn propose(&mut self, _state: &MarketState) -> f64 {
            self.opening
        }

        fn respond(&mut self, _counter_offer: f64) -> Response {
            if self.responses.is_empty() {
                Response::Reject
            } else {
                self.responses.remove(0)
            }
        }
    }

    fn state() -> MarketState {
        MarketState::new(100.0, 5.0)
    }

    fn agent() -> NegotiationAgent {
        let config = AgentConfig {
            exploration: ExplorationPolicy::Greedy,
            valuation_factor: Some(1.2),
            ..AgentConfig::default()
        };
        NegotiationAgent::new("Negotiator", &config, NegotiatorConfig::default(), 17)
    }

    // ==========================================================================
    // run_exchange protocol tests
    // ==========================================================================

    #[test]
    fn seller_accepting_opening_offer_agrees_immediately() {
        let mut buyer = Scripted {
            opening: 120.0,
            responses: vec![],
        };
        let mut seller = SellerDesk::new(SellerTerms::default());
        let exchange = run_exchange(&mut buyer, &mut seller, &state(), 6);

        assert!(exchange.is_agreed());
        assert_eq!(exchange.agreed_price, Some(120.0));
        assert_eq!(exchange.responses, 1);
    }

    #[test]
    fn exchange_stops_at_response_limit() {
        let mut buyer = Scripted {
            opening: 95.0,
            responses: vec![Response::Counter(96.0); 10],
        };
        let mut seller = Scripted {
            opening: 120.0,
            responses: vec![Response::Counter(119.0); 10],
        };
        let exchange = run_exchange(&mut buyer, &mut seller, &state(), 4);

        assert_eq!(exchange.phase, NegotiationPhase::Failed);
        assert_eq!(exchange.responses, 4);
        assert!(exchange.agreed_price.is_none());
        // Two openings plus one offer per counter.
        assert_eq!(exchange.offers.len(), 6);
    }

    #[test]
    fn zero_limit_fails_without_responses() {
        let mut buyer = Scripted {
            opening: 100.0,
            responses: vec![],
        };
        let mut seller = SellerDesk::new(SellerTerms::default());
        let exchange = run_exchange(&mut buyer, &mut seller, &state(), 0);
        assert_eq!(exchange.phase, NegotiationPhase::Failed);
        assert_eq!(exchange.responses, 0);
    }

    #[test]
    fn non_finite_counter_fails() {
        let mut buyer = Scripted {
            opening: 95.0,
            responses: vec![],
        };
        let mut seller = Scripted {
            opening: 120.0,
            responses: vec![Response::Counter(f64::NAN)],
        };
        let exchange = run_exchange(&mut buyer, &mut seller, &state(), 6);
        assert_eq!(exchange.phase, NegotiationPhase::Failed);
    }

    #[test]
    fn buyer_accepting_counter_agrees_at_counter() {
        let mut buyer = Scripted {
            opening: 95.0,
            responses: vec![Response::Accept],
        };
        let mut seller = Scripted {
            opening: 120.0,
            responses: vec![Response::Counter(110.0)],
        };
        let exchange = run_exchange(&mut buyer, &mut seller, &state(), 6);
        assert_eq!(exchange.agreed_price, Some(110.0));
        assert_eq!(exchange.offers.last().unwrap().party, Party::Seller);
    }

    // ==========================================================================
    // SellerDesk tests
    // ==========================================================================

    #[test]
    fn seller_desk_concedes_toward_reserve() {
        let mut desk = SellerDesk::new(SellerTerms::default());
        let ask = desk.propose(&state());
        assert!((ask - 115.0).abs() < 1e-9);

        let mut last = ask;
        for _ in 0..20 {
            match desk.respond(60.0) {
                Response::Counter(next) => {
                    assert!(next <= last);
                    assert!(next >= 90.0 - 1e-9);
                    last = next;
                }
                other => panic!("unexpected response {other:?}"),
            }
        }
    }

    #[test]
    fn seller_desk_rejects_lowball() {
        let mut desk = SellerDesk::new(SellerTerms::default());
        desk.propose(&state());
        assert_eq!(desk.respond(10.0), Response::Reject);
    }

    #[test]
    fn seller_terms_validation() {
        assert!(SellerTerms::default().validate().is_ok());
        let bad = SellerTerms {
            reserve_ratio: 2.0,
            ..SellerTerms::default()
        };
        assert!(bad.validate().is_err());
    }

    // ==========================================================================
    // NegotiationAgent tests
    // ==========================================================================

    #[test]
    fn agent_opens_below_limit_and_concedes() {
        let mut agent = agent();
        let opening = agent.propose(&state());
        let limit = agent.limit().unwrap();
        assert!((opening - limit * 0.8).abs() < 1e-9);

        match agent.respond(limit + 50.0) {
            Response::Counter(next) => {
                assert!(next > opening);
                assert!(next < limit);
            }
            other => panic!("unexpected response {other:?}"),
        }
        assert_eq!(agent.respond(limit - 1.0), Response::Accept);
    }

    #[test]
    fn agent_negotiation_with_desk_terminates() {
        let mut agent = agent();
        let mut desk = SellerDesk::new(SellerTerms::default());
        let exchange = run_exchange(&mut agent, &mut desk, &state(), 8);
        assert!(exchange.responses <= 8);
        assert!(matches!(
            exchange.phase,
            NegotiationPhase::Agreed | NegotiationPhase::Failed
        ));

        let bid = agent.settle(&state(), &exchange);
        if exchange.is_agreed() {
            assert!(bid.is_valid());
            assert_eq!(Some(bid.amount), exchange.agreed_price);
        } else {
            assert_eq!(bid.rejected, Some(InvalidBid::NoDeal));
        }
        assert_eq!(agent.phase(), AgentPhase::AwaitingOutcome);
    }

    #[test]
    fn failed_negotiation_is_a_no_deal_with_zero_reward() {
        let mut agent = agent();
        let mut desk = Scripted {
            opening: 500.0,
            responses: vec![Response::Reject],
        };
        let exchange = run_exchange(&mut agent, &mut desk, &state(), 4);
        let bid = agent.settle(&state(), &exchange);
        assert_eq!(bid.rejected, Some(InvalidBid::NoDeal));

        let outcome = RoundOutcome {
            round: 0,
            state: state(),
            entries: vec![BidEntry {
                index: 0,
                agent: "Negotiator".into(),
                bid,
                reward: 0.0,
            }],
            winner: None,
            clearing_price: 0.0,
            status: RoundStatus::NoValidBidders,
        };
        assert!(matches!(agent.observe_outcome(&outcome), LearnStatus::Learned { .. }));
        assert_eq!(agent.stats().reward_history, vec![0.0]);
        assert_eq!(agent.stats().non_bids, 1);
    }

    #[test]
    fn agent_exposes_negotiation_capability() {
        let mut agent = agent();
        assert_eq!(agent.kind(), ParticipantKind::Negotiator);
        assert!(agent.as_negotiator().is_some());
    }

    #[tokio::test]
    async fn sealed_fallback_bids_limit_price() {
        let mut agent = agent();
        let expected = state().price * (1.0 + agent.estimate(&state()).unwrap());
        let bid = agent.decide_bid(&state()).await;
        assert!((bid.amount - expected).abs() < 1e-9);
    }

    #[test]
    fn response_serialization() {
        let json = serde_json::to_string(&Response::Counter(10.5)).unwrap();
        assert_eq!(json, r#"{"response":"counter","amount":10.5}"#);
        let json = serde_json::to_string(&Response::Accept).unwrap();
        assert_eq!(json, r#"{"response":"accept"}"#);
    }
}
